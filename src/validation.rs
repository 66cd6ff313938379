//! Finalization checks for a reviewed contract record.
//!
//! Extraction is best-effort and never validates. Before a record may be
//! rendered it passes through [`finalize`], which collects every issue
//! (required fields, national ID checksums, postal code, contact formats,
//! installment consistency) instead of stopping at the first.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::{ContractRecord, DocumentType, ServiceFlag};
use crate::pipeline::extraction::normalize::digits_only;

/// Tolerance when comparing installment sums with the contract total.
pub const CENT_TOLERANCE: f64 = 0.01;

pub const BRAZILIAN_STATES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email regex"));

// ---------------------------------------------------------------------------
// Field validators
// ---------------------------------------------------------------------------

fn all_same_digit(digits: &str) -> bool {
    digits.chars().all(|c| Some(c) == digits.chars().next())
}

fn digit_values(digits: &str) -> Vec<u32> {
    digits.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// CPF: 11 digits, two mod-11 check digits, not all identical.
pub fn is_valid_cpf(raw: &str) -> bool {
    let digits = digits_only(raw);
    if digits.len() != 11 || all_same_digit(&digits) {
        return false;
    }
    let d = digit_values(&digits);

    let check = |len: usize| -> u32 {
        let sum: u32 = d[..len]
            .iter()
            .enumerate()
            .map(|(i, v)| v * (len as u32 + 1 - i as u32))
            .sum();
        let rest = (sum * 10) % 11;
        if rest == 10 {
            0
        } else {
            rest
        }
    };

    check(9) == d[9] && check(10) == d[10]
}

/// CNPJ: 14 digits, two weighted mod-11 check digits, not all identical.
pub fn is_valid_cnpj(raw: &str) -> bool {
    let digits = digits_only(raw);
    if digits.len() != 14 || all_same_digit(&digits) {
        return false;
    }
    let d = digit_values(&digits);

    let check = |len: usize| -> u32 {
        // Weights cycle 2..=9 from the rightmost digit
        let sum: u32 = d[..len]
            .iter()
            .rev()
            .enumerate()
            .map(|(i, v)| v * (2 + (i as u32 % 8)))
            .sum();
        let rest = sum % 11;
        if rest < 2 {
            0
        } else {
            11 - rest
        }
    };

    check(12) == d[12] && check(13) == d[13]
}

pub fn is_valid_document(kind: DocumentType, raw: &str) -> bool {
    match kind {
        DocumentType::Cpf => is_valid_cpf(raw),
        DocumentType::Cnpj => is_valid_cnpj(raw),
    }
}

pub fn is_valid_cep(raw: &str) -> bool {
    digits_only(raw).len() == 8
}

/// Landline (10 digits) or mobile (11 digits), with area code.
pub fn is_valid_phone(raw: &str) -> bool {
    matches!(digits_only(raw).len(), 10 | 11)
}

pub fn is_valid_email(raw: &str) -> bool {
    EMAIL.is_match(raw.trim())
}

pub fn is_valid_uf(raw: &str) -> bool {
    BRAZILIAN_STATES.contains(&raw.trim().to_uppercase().as_str())
}

// ---------------------------------------------------------------------------
// Finalization
// ---------------------------------------------------------------------------

/// One failed check, keyed by the camelCase field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A record that passed every finalization check. Read-only from here on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FinalizedContract(ContractRecord);

impl FinalizedContract {
    pub fn record(&self) -> &ContractRecord {
        &self.0
    }

    pub fn into_record(self) -> ContractRecord {
        self.0
    }
}

fn min_len(value: &Option<String>, min: usize) -> bool {
    value
        .as_deref()
        .is_some_and(|v| v.trim().chars().count() >= min)
}

fn positive(value: Option<f64>) -> bool {
    value.is_some_and(|v| v > 0.0)
}

/// Check a reviewed record. Returns every issue found.
pub fn validate(record: &ContractRecord) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if !min_len(&record.full_name, 5) {
        issues.push(ValidationIssue::new("fullName", "Nome deve ter pelo menos 5 caracteres"));
    }

    match (record.document_type, record.document_number.as_deref()) {
        (Some(kind), Some(number)) if is_valid_document(kind, number) => {}
        (Some(kind), Some(_)) => {
            issues.push(ValidationIssue::new("documentNumber", format!("{kind} inválido")));
        }
        (None, _) => issues.push(ValidationIssue::new("documentType", "Tipo de documento obrigatório")),
        (_, None) => issues.push(ValidationIssue::new("documentNumber", "Documento obrigatório")),
    }

    if !record.email.as_deref().is_some_and(is_valid_email) {
        issues.push(ValidationIssue::new("email", "Email inválido"));
    }
    if !record.phone.as_deref().is_some_and(is_valid_phone) {
        issues.push(ValidationIssue::new("phone", "Telefone inválido"));
    }

    let address = record.address.clone().unwrap_or_default();
    if !min_len(&address.street, 5) {
        issues.push(ValidationIssue::new("address.street", "Endereço deve ter pelo menos 5 caracteres"));
    }
    if !min_len(&address.neighborhood, 3) {
        issues.push(ValidationIssue::new("address.neighborhood", "Bairro deve ter pelo menos 3 caracteres"));
    }
    if !min_len(&address.city, 3) {
        issues.push(ValidationIssue::new("address.city", "Cidade deve ter pelo menos 3 caracteres"));
    }
    if !address.state.as_deref().is_some_and(is_valid_uf) {
        issues.push(ValidationIssue::new("address.state", "UF inválida"));
    }
    if !address.zip_code.as_deref().is_some_and(is_valid_cep) {
        issues.push(ValidationIssue::new("address.zipCode", "CEP deve ter 8 dígitos"));
    }

    if !min_len(&record.contract_number, 1) {
        issues.push(ValidationIssue::new("contractNumber", "Número do contrato obrigatório"));
    }
    if record.start_date.is_none() {
        issues.push(ValidationIssue::new("startDate", "Data de início obrigatória"));
    }
    if !record.duration_months.is_some_and(|m| m > 0) {
        issues.push(ValidationIssue::new("durationMonths", "Vigência deve ser positiva"));
    }
    if !positive(record.total_area_hectares) {
        issues.push(ValidationIssue::new("totalAreaHectares", "Área deve ser positiva"));
    }
    if !positive(record.price_per_hectare) {
        issues.push(ValidationIssue::new("pricePerHectare", "Valor por hectare deve ser positivo"));
    }
    if !positive(record.total_value) {
        issues.push(ValidationIssue::new("totalValue", "Valor total deve ser positivo"));
    }

    let payments = record.payments.as_deref().unwrap_or(&[]);
    if payments.is_empty() {
        issues.push(ValidationIssue::new("payments", "Pelo menos uma parcela é obrigatória"));
    } else {
        if payments.iter().any(|p| p.value <= 0.0) {
            issues.push(ValidationIssue::new("payments", "Parcelas devem ter valor positivo"));
        }
        if let Some(total) = record.total_value {
            if (record.payments_total() - total).abs() > CENT_TOLERANCE {
                issues.push(ValidationIssue::new(
                    "payments",
                    "A soma das parcelas deve ser igual ao valor total",
                ));
            }
        }
    }

    if let Some(services) = &record.services {
        let described = services
            .other_services_description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty());
        if services.has(ServiceFlag::OtherServices) && !described {
            issues.push(ValidationIssue::new(
                "services.otherServicesDescription",
                "Descreva os outros serviços",
            ));
        }
    }

    issues
}

/// Promote a reviewed record to a finalized contract, or return every issue.
pub fn finalize(record: &ContractRecord) -> Result<FinalizedContract, Vec<ValidationIssue>> {
    let issues = validate(record);
    if issues.is_empty() {
        Ok(FinalizedContract(record.clone()))
    } else {
        tracing::debug!(issues = issues.len(), "Record failed finalization");
        Err(issues)
    }
}
