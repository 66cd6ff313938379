//! Canonical contract record.
//!
//! Every field is optional. A record starts empty, accumulates values from
//! extractor passes and operator edits, and is only checked for completeness
//! when it is finalized (see `crate::validation::finalize`). Serialized keys
//! are camelCase and absent fields are omitted, so a partial extraction
//! round-trips as a small JSON object.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════
// Party identity
// ═══════════════════════════════════════════

/// Brazilian taxpayer document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    /// Individual (11 digits).
    Cpf,
    /// Company (14 digits).
    Cnpj,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpf => "CPF",
            Self::Cnpj => "CNPJ",
        }
    }

    /// Classify a digit-only document number: 11 digits is a CPF, anything else a CNPJ.
    pub fn from_digits(digits: &str) -> Self {
        if digits.len() == 11 {
            Self::Cpf
        } else {
            Self::Cnpj
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Two-letter UF code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// CEP, digits only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Witness {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

// ═══════════════════════════════════════════
// Payments
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
}

/// One installment. `number` is 1-based and contiguous within a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub number: u32,
    pub due_date: NaiveDate,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
}

// ═══════════════════════════════════════════
// Contracted services
// ═══════════════════════════════════════════

/// The closed set of contractable service flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceFlag {
    FertilityConsultancy,
    SoilSampling,
    DigitalAgriculture,
    TsiPremium,
    TsiAbertura,
    NemaScan,
    SoilAnalysis,
    CompactionSamples,
    Calibration,
    OtherServices,
}

impl ServiceFlag {
    pub const ALL: [ServiceFlag; 10] = [
        Self::FertilityConsultancy,
        Self::SoilSampling,
        Self::DigitalAgriculture,
        Self::TsiPremium,
        Self::TsiAbertura,
        Self::NemaScan,
        Self::SoilAnalysis,
        Self::CompactionSamples,
        Self::Calibration,
        Self::OtherServices,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FertilityConsultancy => "hasFertilityConsultancy",
            Self::SoilSampling => "hasSoilSampling",
            Self::DigitalAgriculture => "hasDigitalAgriculture",
            Self::TsiPremium => "hasTsiPremium",
            Self::TsiAbertura => "hasTsiAbertura",
            Self::NemaScan => "hasNemaScan",
            Self::SoilAnalysis => "hasSoilAnalysis",
            Self::CompactionSamples => "hasCompactionSamples",
            Self::Calibration => "hasCalibration",
            Self::OtherServices => "hasOtherServices",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContractedServices {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_fertility_consultancy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_soil_sampling: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_digital_agriculture: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_tsi_premium: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_tsi_abertura: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_nema_scan: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_soil_analysis: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_compaction_samples: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_calibration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_other_services: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_services_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling_grid_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_visits_amount: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compaction_grid_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration_total: Option<String>,
}

impl ContractedServices {
    /// Every flag explicitly false, no details.
    pub fn none_contracted() -> Self {
        let mut services = Self::default();
        for flag in ServiceFlag::ALL {
            services.set(flag, false);
        }
        services
    }

    fn slot(&mut self, flag: ServiceFlag) -> &mut Option<bool> {
        match flag {
            ServiceFlag::FertilityConsultancy => &mut self.has_fertility_consultancy,
            ServiceFlag::SoilSampling => &mut self.has_soil_sampling,
            ServiceFlag::DigitalAgriculture => &mut self.has_digital_agriculture,
            ServiceFlag::TsiPremium => &mut self.has_tsi_premium,
            ServiceFlag::TsiAbertura => &mut self.has_tsi_abertura,
            ServiceFlag::NemaScan => &mut self.has_nema_scan,
            ServiceFlag::SoilAnalysis => &mut self.has_soil_analysis,
            ServiceFlag::CompactionSamples => &mut self.has_compaction_samples,
            ServiceFlag::Calibration => &mut self.has_calibration,
            ServiceFlag::OtherServices => &mut self.has_other_services,
        }
    }

    pub fn set(&mut self, flag: ServiceFlag, value: bool) {
        *self.slot(flag) = Some(value);
    }

    /// True only when the flag is explicitly set.
    pub fn has(&self, flag: ServiceFlag) -> bool {
        let value = match flag {
            ServiceFlag::FertilityConsultancy => self.has_fertility_consultancy,
            ServiceFlag::SoilSampling => self.has_soil_sampling,
            ServiceFlag::DigitalAgriculture => self.has_digital_agriculture,
            ServiceFlag::TsiPremium => self.has_tsi_premium,
            ServiceFlag::TsiAbertura => self.has_tsi_abertura,
            ServiceFlag::NemaScan => self.has_nema_scan,
            ServiceFlag::SoilAnalysis => self.has_soil_analysis,
            ServiceFlag::CompactionSamples => self.has_compaction_samples,
            ServiceFlag::Calibration => self.has_calibration,
            ServiceFlag::OtherServices => self.has_other_services,
        };
        value.unwrap_or(false)
    }

    pub fn any_contracted(&self) -> bool {
        ServiceFlag::ALL.iter().any(|f| self.has(*f))
    }
}

// ═══════════════════════════════════════════
// Soil analysis layers
// ═══════════════════════════════════════════

/// Which field area a layer table describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoilZone {
    /// Established cropland.
    Lavoura,
    /// Newly opened land.
    Abertura,
}

impl SoilZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lavoura => "lavoura",
            Self::Abertura => "abertura",
        }
    }
}

/// One sampling depth and its percentage breakdown.
///
/// Percentages are stored as bare numeric strings ("80", "12.5") without the
/// `%` sign. `depth` is normalized to the `"0-20 cm"` shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SoilAnalysisLayer {
    pub depth: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples_pct: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macro_pct: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub micro_pct: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_pct: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sulfur_pct: Option<String>,
    /// Spare column of the template's analysis table. Extraction never fills
    /// it; it is entered by hand during review and renders blank otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_pct: Option<String>,
}

impl SoilAnalysisLayer {
    pub fn new(depth: impl Into<String>) -> Self {
        Self {
            depth: depth.into(),
            ..Default::default()
        }
    }
}

// ═══════════════════════════════════════════
// Contract record
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContractRecord {
    // Party
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    /// Digits only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rg_issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ie: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Digits only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    // Contract terms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_months: Option<u32>,

    // Property
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_area_hectares: Option<f64>,

    // Financials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_hectare: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payments: Option<Vec<Payment>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<ContractedServices>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_analysis_lavoura: Option<Vec<SoilAnalysisLayer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_analysis_abertura: Option<Vec<SoilAnalysisLayer>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness1: Option<Witness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness2: Option<Witness>,
}

impl ContractRecord {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn address_mut(&mut self) -> &mut Address {
        self.address.get_or_insert_with(Address::default)
    }

    pub fn services_mut(&mut self) -> &mut ContractedServices {
        self.services.get_or_insert_with(ContractedServices::default)
    }

    pub fn layers(&self, zone: SoilZone) -> &[SoilAnalysisLayer] {
        let layers = match zone {
            SoilZone::Lavoura => &self.soil_analysis_lavoura,
            SoilZone::Abertura => &self.soil_analysis_abertura,
        };
        layers.as_deref().unwrap_or(&[])
    }

    pub fn set_layers(&mut self, zone: SoilZone, rows: Vec<SoilAnalysisLayer>) {
        match zone {
            SoilZone::Lavoura => self.soil_analysis_lavoura = Some(rows),
            SoilZone::Abertura => self.soil_analysis_abertura = Some(rows),
        }
    }

    /// Sum of installment values, zero when there is no schedule.
    pub fn payments_total(&self) -> f64 {
        self.payments
            .as_deref()
            .map(|p| p.iter().map(|x| x.value).sum())
            .unwrap_or(0.0)
    }
}
