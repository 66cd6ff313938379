//! Brazilian Portuguese numbers written out in full ("por extenso").
//!
//! Two modes: plain numbers ("cento e cinquenta vírgula cinco") and
//! currency ("mil duzentos e trinta e quatro reais e cinquenta centavos").

const UNITS: [&str; 20] = [
    "zero", "um", "dois", "três", "quatro", "cinco", "seis", "sete", "oito", "nove", "dez",
    "onze", "doze", "treze", "quatorze", "quinze", "dezesseis", "dezessete", "dezoito",
    "dezenove",
];

const TENS: [&str; 10] = [
    "", "", "vinte", "trinta", "quarenta", "cinquenta", "sessenta", "setenta", "oitenta",
    "noventa",
];

const HUNDREDS: [&str; 10] = [
    "", "cento", "duzentos", "trezentos", "quatrocentos", "quinhentos", "seiscentos",
    "setecentos", "oitocentos", "novecentos",
];

/// (singular, plural) names for each power of one thousand above the units.
const SCALES: [(&str, &str); 4] = [
    ("mil", "mil"),
    ("milhão", "milhões"),
    ("bilhão", "bilhões"),
    ("trilhão", "trilhões"),
];

/// 1..=999.
fn below_thousand(n: u64) -> String {
    if n == 100 {
        return "cem".to_string();
    }
    let mut parts = Vec::with_capacity(3);
    let (h, rest) = (n / 100, n % 100);
    if h > 0 {
        parts.push(HUNDREDS[h as usize]);
    }
    if rest >= 20 {
        parts.push(TENS[(rest / 10) as usize]);
        if rest % 10 > 0 {
            parts.push(UNITS[(rest % 10) as usize]);
        }
    } else if rest > 0 {
        parts.push(UNITS[rest as usize]);
    }
    parts.join(" e ")
}

/// Whole number in words.
pub fn integer_words(n: u64) -> String {
    if n == 0 {
        return UNITS[0].to_string();
    }

    let mut groups = Vec::new();
    let mut rest = n;
    while rest > 0 {
        groups.push(rest % 1000);
        rest /= 1000;
    }

    // (words, group value), highest scale first
    let mut parts: Vec<(String, u64)> = Vec::new();
    for (scale, &group) in groups.iter().enumerate().rev() {
        if group == 0 {
            continue;
        }
        let words = match scale {
            0 => below_thousand(group),
            1 if group == 1 => "mil".to_string(),
            s => {
                let (singular, plural) = SCALES[(s - 1).min(SCALES.len() - 1)];
                let name = if group == 1 { singular } else { plural };
                format!("{} {name}", below_thousand(group))
            }
        };
        parts.push((words, group));
    }

    let last = parts.len() - 1;
    let mut out = String::new();
    for (i, (words, group)) in parts.iter().enumerate() {
        if i > 0 {
            let connector = if i < last {
                ", "
            } else if *group < 100 || group % 100 == 0 {
                " e "
            } else {
                " "
            };
            out.push_str(connector);
        }
        out.push_str(words);
    }
    out
}

/// Plain number, decimals read after "vírgula" (up to three places).
pub fn number_words(value: f64) -> String {
    let rendered = format!("{:.3}", value.abs());
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered, ""));

    let mut out = String::new();
    if value < 0.0 && rendered != "0" {
        out.push_str("menos ");
    }
    out.push_str(&integer_words(int_part.parse().unwrap_or(0)));

    if !frac_part.is_empty() {
        out.push_str(" vírgula");
        let leading_zeros = frac_part.chars().take_while(|c| *c == '0').count();
        for _ in 0..leading_zeros {
            out.push_str(" zero");
        }
        let significant = &frac_part[leading_zeros..];
        if let Ok(n) = significant.parse::<u64>() {
            out.push(' ');
            out.push_str(&integer_words(n));
        }
    }
    out
}

/// Amount in reais and centavos.
pub fn currency_words(value: f64) -> String {
    let total_cents = (value.abs() * 100.0).round() as u64;
    let (reais, cents) = (total_cents / 100, total_cents % 100);

    let mut parts = Vec::with_capacity(2);
    if reais > 0 {
        let unit = if reais == 1 {
            "real"
        } else if reais % 1_000_000 == 0 {
            "de reais"
        } else {
            "reais"
        };
        parts.push(format!("{} {unit}", integer_words(reais)));
    }
    if cents > 0 {
        let unit = if cents == 1 { "centavo" } else { "centavos" };
        parts.push(format!("{} {unit}", integer_words(cents)));
    }
    if parts.is_empty() {
        return "zero reais".to_string();
    }

    let words = parts.join(" e ");
    if value < 0.0 {
        format!("menos {words}")
    } else {
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_numbers() {
        assert_eq!(integer_words(0), "zero");
        assert_eq!(integer_words(1), "um");
        assert_eq!(integer_words(12), "doze");
        assert_eq!(integer_words(21), "vinte e um");
        assert_eq!(integer_words(100), "cem");
        assert_eq!(integer_words(101), "cento e um");
        assert_eq!(integer_words(150), "cento e cinquenta");
        assert_eq!(integer_words(999), "novecentos e noventa e nove");
    }

    #[test]
    fn thousands_connectors() {
        assert_eq!(integer_words(1000), "mil");
        assert_eq!(integer_words(1001), "mil e um");
        assert_eq!(integer_words(1100), "mil e cem");
        assert_eq!(integer_words(1234), "mil duzentos e trinta e quatro");
        assert_eq!(integer_words(22500), "vinte e dois mil e quinhentos");
    }

    #[test]
    fn millions() {
        assert_eq!(integer_words(1_000_000), "um milhão");
        assert_eq!(integer_words(2_000_000), "dois milhões");
        assert_eq!(integer_words(1_000_001), "um milhão e um");
        assert_eq!(
            integer_words(1_234_567),
            "um milhão, duzentos e trinta e quatro mil quinhentos e sessenta e sete"
        );
    }

    #[test]
    fn decimals_read_after_virgula() {
        assert_eq!(number_words(12.0), "doze");
        assert_eq!(number_words(150.5), "cento e cinquenta vírgula cinco");
        assert_eq!(number_words(10.25), "dez vírgula vinte e cinco");
        assert_eq!(number_words(0.05), "zero vírgula zero cinco");
    }

    #[test]
    fn currency_mode() {
        assert_eq!(currency_words(0.0), "zero reais");
        assert_eq!(currency_words(1.0), "um real");
        assert_eq!(currency_words(0.01), "um centavo");
        assert_eq!(currency_words(150.0), "cento e cinquenta reais");
        assert_eq!(
            currency_words(1234.56),
            "mil duzentos e trinta e quatro reais e cinquenta e seis centavos"
        );
        assert_eq!(currency_words(1_000_000.0), "um milhão de reais");
        assert_eq!(currency_words(1_500_000.0), "um milhão e quinhentos mil reais");
    }
}
