//! pt-BR display formatting for the contract template.

use chrono::NaiveDate;

use crate::pipeline::extraction::normalize::digits_only;

/// Group the integer part with `.` and write `decimals` places after `,`.
fn group_number(value: f64, decimals: usize) -> String {
    let rendered = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if let Some(frac) = frac_part {
        grouped.push(',');
        grouped.push_str(frac);
    }
    grouped
}

/// "R$ 1.234,56"; negatives as "-R$ 10,00".
pub fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 && (value * 100.0).round() != 0.0 {
        "-"
    } else {
        ""
    };
    format!("{sign}R$ {}", group_number(value, 2))
}

/// "1.234,50 ha": at least two decimals, at most three.
pub fn format_area(hectares: f64) -> String {
    let mut number = group_number(hectares, 3);
    if number.ends_with('0') {
        number.pop();
    }
    format!("{number} ha")
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// "000.000.000-00" for 11 digits; anything else unchanged.
pub fn format_cpf(raw: &str) -> String {
    let d = digits_only(raw);
    if d.len() != 11 {
        return raw.to_string();
    }
    format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
}

/// "00.000.000/0000-00" for 14 digits; anything else unchanged.
pub fn format_cnpj(raw: &str) -> String {
    let d = digits_only(raw);
    if d.len() != 14 {
        return raw.to_string();
    }
    format!(
        "{}.{}.{}/{}-{}",
        &d[0..2],
        &d[2..5],
        &d[5..8],
        &d[8..12],
        &d[12..14]
    )
}

/// CPF or CNPJ mask picked by digit count.
pub fn format_document(raw: &str) -> String {
    match digits_only(raw).len() {
        11 => format_cpf(raw),
        14 => format_cnpj(raw),
        _ => raw.to_string(),
    }
}

pub fn format_cep(raw: &str) -> String {
    let d = digits_only(raw);
    if d.len() != 8 {
        return raw.to_string();
    }
    format!("{}-{}", &d[0..5], &d[5..8])
}

/// "(00) 00000-0000" for mobiles, "(00) 0000-0000" for landlines.
pub fn format_phone(raw: &str) -> String {
    let d = digits_only(raw);
    match d.len() {
        11 => format!("({}) {}-{}", &d[0..2], &d[2..7], &d[7..11]),
        10 => format!("({}) {}-{}", &d[0..2], &d[2..6], &d[6..10]),
        _ => raw.to_string(),
    }
}

/// Layer table cell: "(80)% Macro", or "( )% Macro" when blank.
pub fn format_layer_cell(value: Option<&str>, suffix: &str) -> String {
    let number: String = value
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if number.is_empty() {
        format!("( )%{suffix}")
    } else {
        format!("({number})%{suffix}")
    }
}
