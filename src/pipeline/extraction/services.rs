//! Keyword inference of contracted services.
//!
//! Service flags are never labelled fields in a proposal; they are implied by
//! product names and descriptions. The ordered rule table below maps keyword
//! patterns to flags, with optional detail patterns (grid sizes, visit and
//! calibration counts) that only run on blocks where their flag fired.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{ContractedServices, ServiceFlag};

/// Where a detail capture is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detail {
    TechnicalVisits,
    SamplingGrid,
    CompactionGrid,
    CalibrationTotal,
}

struct ServiceRule {
    flag: ServiceFlag,
    keyword: Regex,
    detail: Option<(Detail, Regex)>,
}

fn service(flag: ServiceFlag, keyword: &str, detail: Option<(Detail, &str)>) -> ServiceRule {
    ServiceRule {
        flag,
        keyword: Regex::new(keyword).expect("invalid service keyword regex"),
        detail: detail.map(|(d, re)| (d, Regex::new(re).expect("invalid service detail regex"))),
    }
}

static SERVICE_RULES: LazyLock<Vec<ServiceRule>> = LazyLock::new(|| {
    vec![
        service(
            ServiceFlag::FertilityConsultancy,
            r"(?i)\bfertile\b|consultoria|fertilidade",
            Some((Detail::TechnicalVisits, r"(?i)(\d+)\s*visitas?")),
        ),
        service(
            ServiceFlag::SoilSampling,
            r"(?i)amostra(?:s|gem)?\b",
            Some((Detail::SamplingGrid, r"(?i)grade\s*(?:amostral)?\s*(?:de\s*)?(\d+(?:[.,]\d+)?)\s*(?:ha|hectares?)\b")),
        ),
        service(ServiceFlag::SoilAnalysis, r"(?i)an[aá]lises?\b", None),
        service(
            ServiceFlag::Calibration,
            r"(?i)calibra",
            Some((Detail::CalibrationTotal, r"(?i)(\d+)\s*calibra")),
        ),
        service(
            ServiceFlag::CompactionSamples,
            r"(?i)compacta[cç][aã]o",
            Some((Detail::CompactionGrid, r"(?i)compacta[cç][aã]o[^\n]*?grade\s*(?:de\s*)?(\d+(?:[.,]\d+)?)")),
        ),
        service(ServiceFlag::NemaScan, r"(?i)\bnema", None),
        service(
            ServiceFlag::DigitalAgriculture,
            r"(?i)variaseed|agricultura\s+digital|\bdigital\b",
            None,
        ),
        service(
            ServiceFlag::TsiPremium,
            r"(?is)\btsi\b.*\bpremium\b|\bpremium\b.*\btsi\b",
            None,
        ),
        service(
            ServiceFlag::TsiAbertura,
            r"(?is)\btsi\b.*\babertura\b|\babertura\b.*\btsi\b",
            None,
        ),
    ]
});

/// Infer service flags from text blocks (product names, descriptions).
///
/// Every flag comes back explicitly set. For each detail, the first block
/// where its flag fired and its pattern matched supplies the value.
pub fn infer_services(blocks: &[&str]) -> ContractedServices {
    let mut services = ContractedServices::none_contracted();

    for rule in SERVICE_RULES.iter() {
        for block in blocks {
            if !rule.keyword.is_match(block) {
                continue;
            }
            services.set(rule.flag, true);

            if let Some((detail, pattern)) = &rule.detail {
                if detail_is_set(&services, *detail) {
                    continue;
                }
                if let Some(caps) = pattern.captures(block) {
                    store_detail(&mut services, *detail, &caps[1]);
                }
            }
        }
    }

    services
}

/// Append free-text service names to the "other services" description.
///
/// Names are joined with ", " after any existing description, and the flag
/// is set. No-op for an empty list.
pub fn append_other_services(services: &mut ContractedServices, names: &[String]) {
    let names: Vec<&str> = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return;
    }

    let joined = names.join(", ");
    services.other_services_description = Some(match services.other_services_description.take() {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}, {joined}"),
        _ => joined,
    });
    services.set(ServiceFlag::OtherServices, true);
}

fn detail_is_set(services: &ContractedServices, detail: Detail) -> bool {
    match detail {
        Detail::TechnicalVisits => services.technical_visits_amount.is_some(),
        Detail::SamplingGrid => services.sampling_grid_size.is_some(),
        Detail::CompactionGrid => services.compaction_grid_size.is_some(),
        Detail::CalibrationTotal => services.calibration_total.is_some(),
    }
}

fn store_detail(services: &mut ContractedServices, detail: Detail, raw: &str) {
    match detail {
        Detail::TechnicalVisits => services.technical_visits_amount = raw.parse().ok(),
        Detail::SamplingGrid => services.sampling_grid_size = Some(raw.to_string()),
        Detail::CompactionGrid => services.compaction_grid_size = Some(raw.to_string()),
        Detail::CalibrationTotal => services.calibration_total = Some(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_rules_compile() {
        assert_eq!(SERVICE_RULES.len(), 9);
    }

    #[test]
    fn nothing_matched_gives_all_false() {
        let services = infer_services(&["Frete e seguro"]);
        assert!(!services.any_contracted());
        assert_eq!(services.has_nema_scan, Some(false));
    }

    #[test]
    fn fertile_product_block() {
        let services = infer_services(&["FERTILE Consultoria com 6 visitas técnicas"]);
        assert!(services.has(ServiceFlag::FertilityConsultancy));
        assert_eq!(services.technical_visits_amount, Some(6));
    }

    #[test]
    fn sampling_with_grid() {
        let services = infer_services(&["AMOSTRAGEM de solo grade amostral de 5 ha"]);
        assert!(services.has(ServiceFlag::SoilSampling));
        assert_eq!(services.sampling_grid_size.as_deref(), Some("5"));
    }

    #[test]
    fn calibration_count() {
        let services = infer_services(&["Pacote com 3 calibrações de máquinas"]);
        assert!(services.has(ServiceFlag::Calibration));
        assert_eq!(services.calibration_total.as_deref(), Some("3"));
    }

    #[test]
    fn tsi_variants_need_both_words() {
        let services = infer_services(&["TSI PREMIUM"]);
        assert!(services.has(ServiceFlag::TsiPremium));
        assert!(!services.has(ServiceFlag::TsiAbertura));

        let services = infer_services(&["Área de abertura"]);
        assert!(!services.has(ServiceFlag::TsiAbertura));

        let services = infer_services(&["TSI - ABERTURA"]);
        assert!(services.has(ServiceFlag::TsiAbertura));
    }

    #[test]
    fn nema_and_digital() {
        let services = infer_services(&["NEMA SCAN", "VARIASEED"]);
        assert!(services.has(ServiceFlag::NemaScan));
        assert!(services.has(ServiceFlag::DigitalAgriculture));
    }

    #[test]
    fn first_detail_wins_across_blocks() {
        let services = infer_services(&["2 calibrações", "5 calibrações"]);
        assert_eq!(services.calibration_total.as_deref(), Some("2"));
    }

    #[test]
    fn detail_only_from_flagged_block() {
        // The grid lives in a block without sampling keywords
        let services = infer_services(&["Amostras de solo", "grade de 10 ha"]);
        assert!(services.has(ServiceFlag::SoilSampling));
        assert_eq!(services.sampling_grid_size, None);
    }

    #[test]
    fn other_services_appended() {
        let mut services = ContractedServices::none_contracted();
        append_other_services(&mut services, &["Frete".into(), "Treinamento".into()]);
        assert!(services.has(ServiceFlag::OtherServices));
        assert_eq!(services.other_services_description.as_deref(), Some("Frete, Treinamento"));

        append_other_services(&mut services, &["Drone".into()]);
        assert_eq!(
            services.other_services_description.as_deref(),
            Some("Frete, Treinamento, Drone")
        );
    }

    #[test]
    fn empty_other_services_is_noop() {
        let mut services = ContractedServices::none_contracted();
        append_other_services(&mut services, &["  ".into()]);
        assert!(!services.has(ServiceFlag::OtherServices));
        assert_eq!(services.other_services_description, None);
    }
}
