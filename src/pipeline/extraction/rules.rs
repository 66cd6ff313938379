//! Declarative field rules for unstructured proposal text.
//!
//! Each canonical field owns an ordered list of patterns. Current proposal
//! layouts come first, legacy layouts after; the first pattern that both
//! matches and yields a usable value wins. A layout change is a table edit.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::normalize::{collapse_whitespace, digits_only, parse_br_date, parse_decimal, parse_money};
use crate::models::{ContractRecord, DocumentType};

/// Canonical fields recovered from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    ContractNumber,
    FullName,
    Document,
    Email,
    Phone,
    FarmName,
    TotalArea,
    PricePerHectare,
    TotalValue,
    StartDate,
    DurationMonths,
    Street,
    Neighborhood,
    City,
    State,
    ZipCode,
}

impl TextField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ContractNumber => "contract number",
            Self::FullName => "client name",
            Self::Document => "CPF/CNPJ",
            Self::Email => "e-mail",
            Self::Phone => "phone",
            Self::FarmName => "farm name",
            Self::TotalArea => "total area",
            Self::PricePerHectare => "price per hectare",
            Self::TotalValue => "total value",
            Self::StartDate => "start date",
            Self::DurationMonths => "duration",
            Self::Street => "street",
            Self::Neighborhood => "neighborhood",
            Self::City => "city",
            Self::State => "state",
            Self::ZipCode => "CEP",
        }
    }
}

/// Writes a match into the record. Returns false when the captured value is unusable.
type Apply = fn(&Captures<'_>, &mut ContractRecord) -> bool;

pub struct Matcher {
    regex: Regex,
    apply: Apply,
    description: &'static str,
}

pub struct FieldRule {
    pub field: TextField,
    pub matchers: Vec<Matcher>,
}

impl FieldRule {
    /// Try each matcher in priority order; stop at the first that applies.
    pub fn apply(&self, text: &str, record: &mut ContractRecord) -> bool {
        self.matchers.iter().any(|m| {
            let applied = m
                .regex
                .captures(text)
                .is_some_and(|caps| (m.apply)(&caps, record));
            if applied {
                tracing::debug!(field = self.field.label(), rule = m.description, "Field rule applied");
            }
            applied
        })
    }
}

fn matcher(regex: &str, apply: Apply, description: &'static str) -> Matcher {
    Matcher {
        regex: Regex::new(regex).expect("invalid field rule regex"),
        apply,
        description,
    }
}

fn rule(field: TextField, matchers: Vec<Matcher>) -> FieldRule {
    FieldRule { field, matchers }
}

fn group(caps: &Captures<'_>, i: usize) -> Option<String> {
    caps.get(i)
        .map(|m| collapse_whitespace(m.as_str()))
        .filter(|s| !s.is_empty())
}

fn positive(value: f64) -> Option<f64> {
    (value > 0.0).then_some(value)
}

// ═══════════════════════════════════════════
// Apply functions
// ═══════════════════════════════════════════

fn set_contract_number(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    let number: String = caps[1].chars().filter(|c| !c.is_whitespace()).collect();
    r.contract_number = Some(number);
    true
}

/// Assign only a usable value; an unusable capture leaves the field as it was.
fn assign<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

fn set_full_name(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    assign(&mut r.full_name, group(caps, 1))
}

fn set_cpf(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    set_document(&caps[1], DocumentType::Cpf, r)
}

fn set_cnpj(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    set_document(&caps[1], DocumentType::Cnpj, r)
}

fn set_document(raw: &str, kind: DocumentType, r: &mut ContractRecord) -> bool {
    let digits = digits_only(raw);
    let expected = match kind {
        DocumentType::Cpf => 11,
        DocumentType::Cnpj => 14,
    };
    if digits.len() != expected {
        return false;
    }
    r.document_type = Some(kind);
    r.document_number = Some(digits);
    true
}

fn set_email(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    r.email = Some(caps[1].to_lowercase());
    true
}

fn set_phone(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    let digits = digits_only(&caps[1]);
    if !(10..=11).contains(&digits.len()) {
        return false;
    }
    r.phone = Some(digits);
    true
}

/// The FAZENDAS table row carries farm name, sampling grid and area together.
fn set_farm_row(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    let Some(name) = group(caps, 1) else {
        return false;
    };
    r.farm_name = Some(name);
    if let Some(grid) = group(caps, 2) {
        r.services_mut().sampling_grid_size = Some(grid);
    }
    if r.total_area_hectares.is_none() {
        let area = caps.get(3).and_then(|m| parse_decimal(m.as_str())).and_then(positive);
        assign(&mut r.total_area_hectares, area);
    }
    true
}

fn set_farm_name(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    assign(&mut r.farm_name, group(caps, 1))
}

fn set_area(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    assign(&mut r.total_area_hectares, parse_decimal(&caps[1]).and_then(positive))
}

fn set_price(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    assign(&mut r.price_per_hectare, positive(parse_money(&caps[1])))
}

fn set_total(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    assign(&mut r.total_value, positive(parse_money(&caps[1])))
}

fn set_start_date(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    assign(&mut r.start_date, parse_br_date(&caps[1]))
}

fn set_duration(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    assign(&mut r.duration_months, caps[1].parse().ok().filter(|m: &u32| *m > 0))
}

fn set_street(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    let Some(street) = group(caps, 1) else {
        return false;
    };
    r.address_mut().street = Some(street);
    true
}

fn set_neighborhood(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    let Some(value) = group(caps, 1) else {
        return false;
    };
    r.address_mut().neighborhood = Some(value);
    true
}

fn set_city(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    let Some(value) = group(caps, 1) else {
        return false;
    };
    r.address_mut().city = Some(value);
    true
}

fn set_state(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    let uf = caps[1].to_uppercase();
    if !crate::validation::is_valid_uf(&uf) {
        return false;
    }
    r.address_mut().state = Some(uf);
    true
}

fn set_zip(caps: &Captures<'_>, r: &mut ContractRecord) -> bool {
    let digits = digits_only(&caps[1]);
    if digits.len() != 8 {
        return false;
    }
    r.address_mut().zip_code = Some(digits);
    true
}

// ═══════════════════════════════════════════
// Rule table
// ═══════════════════════════════════════════

/// Field rules in evaluation order.
pub static TEXT_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        rule(TextField::ContractNumber, vec![
            matcher(r"(?i)PROPOSTA\s*(?:N[º°o]\.?|N\.|N[uú]mero)?\s*:?\s*(\d+\s*/\s*\d{4})", set_contract_number, "proposal header"),
            matcher(r"(?i)CONTRATO\s*(?:N[º°o]\.?|N\.|N[uú]mero)?\s*:?\s*(\d+\s*/\s*\d{4})", set_contract_number, "legacy contract header"),
        ]),
        rule(TextField::FullName, vec![
            matcher(r"(?i)Cliente\s*:?[ \t]*\n?[ \t]*([^\n\r]{5,})", set_full_name, "client label"),
            matcher(r"(?i)SEU\s+NEG[OÓ]CIO\s+([^\n]+?)\s+Consultor", set_full_name, "legacy header block"),
        ]),
        rule(TextField::Document, vec![
            matcher(r"(?i)\bCPF\s*:?\s*(\d{3}\.?\d{3}\.?\d{3}-?\d{2})", set_cpf, "CPF label"),
            matcher(r"(?i)\bCNPJ\s*:?\s*(\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2})", set_cnpj, "CNPJ label"),
        ]),
        rule(TextField::Email, vec![
            matcher(r"([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})", set_email, "address shape"),
        ]),
        rule(TextField::Phone, vec![
            matcher(r"(?i)\b(?:Tel|Telefone|Celular|Fone)\s*:?\s*([\d \t().-]{10,})", set_phone, "phone label"),
            matcher(r"(\(\d{2}\)\s*9?\d{4}-?\d{4})", set_phone, "bare (DD) number"),
        ]),
        rule(TextField::FarmName, vec![
            matcher(r"(?is)FAZENDAS\s+Fazenda\s+Grade\s+[ÁA]rea\s+(.*?)\s+(\d+(?:[.,]\d+)?)\s+([\d.,]+)\s*HA\b", set_farm_row, "FAZENDAS table"),
            matcher(r"(?i)Fazenda\s*:\s*([^\n\r]+)", set_farm_name, "farm label"),
        ]),
        rule(TextField::TotalArea, vec![
            matcher(r"(?i)[ÁA]rea\s*(?:Total|Contratada)?\s*:?\s*([\d.,]+)\s*(?:ha|hectares?)\b", set_area, "area label"),
            matcher(r"(?is)FAZENDAS.*?\s(\d{1,3}(?:\.\d{3})*,\d{2})\s*HA\b", set_area, "legacy FAZENDAS total"),
        ]),
        rule(TextField::PricePerHectare, vec![
            matcher(r"(?i)(?:Custo|Valor|Pre[cç]o)\s*(?:por)?\s*/?\s*(?:ha|hectare)\b\s*:?\s*R\$\s*([\d.,]+)", set_price, "price label"),
            matcher(r"(?i)R\$\s*([\d.,]+)\s*(?:/|por)\s*(?:ha|hectare)\b", set_price, "R$ per ha"),
        ]),
        rule(TextField::TotalValue, vec![
            matcher(r"(?i)Valor\s+Total(?:\s+Anual)?(?:\s*-\s*Fertile)?\s*:?\s*R\$\s*([\d.,]+)", set_total, "total label"),
            matcher(r"(?i)(?:Valor|Investimento)(?:\s*-\s*Fertile)?\s*:\s*R\$\s*([\d.,]+)", set_total, "legacy value label"),
        ]),
        rule(TextField::StartDate, vec![
            matcher(r"(?i)(?:Data\s+de\s+in[ií]cio|In[ií]cio|Data)\s*:?\s*(\d{2}[/.\-]\d{2}[/.\-]\d{4})", set_start_date, "start date label"),
            matcher(r"(?is)Consultor\s*:.*?(\d{2}/\d{2}/\d{4})", set_start_date, "date after consultant"),
        ]),
        rule(TextField::DurationMonths, vec![
            matcher(r"(?i)(?:Vig[eê]ncia|Dura[cç][aã]o)(?:\s+do\s+(?:projeto|contrato))?\s*:?\s*(\d+)\s*(?:meses|m[eê]s)\b", set_duration, "duration label"),
        ]),
        rule(TextField::Street, vec![
            matcher(r"(?i)Endere[cç]o\s*:\s*([^\n,]{5,})", set_street, "address label"),
            matcher(r"(?i)\b((?:Rua|Av\.|Avenida|Rodovia|Estrada)\s+[^\n,]+)", set_street, "street prefix"),
        ]),
        rule(TextField::Neighborhood, vec![
            matcher(r"(?i)\bBairro\s*:?\s*([^\n,]+)", set_neighborhood, "neighborhood label"),
        ]),
        rule(TextField::City, vec![
            matcher(r"(?i)\bCidade\s*:?\s*([^\n,/]+)", set_city, "city label"),
            matcher(r"(?i)\bMunic[ií]pio\s*:?\s*([^\n,/]+)", set_city, "municipality label"),
        ]),
        rule(TextField::State, vec![
            matcher(r"(?i)\b(?:Estado|UF)\s*:?\s*([A-Za-z]{2})\b", set_state, "state label"),
        ]),
        rule(TextField::ZipCode, vec![
            matcher(r"(?i)\bCEP\s*:?\s*(\d{2}\.?\d{3}-?\d{3})", set_zip, "CEP label"),
        ]),
    ]
});

/// Expected field count for confidence: every rule plus the payment schedule.
pub fn expected_text_fields() -> usize {
    TEXT_RULES.len() + 1
}
