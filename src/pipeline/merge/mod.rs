//! Multi-source merge of partial contract records.
//!
//! Records are folded left to right in upload order. Each field has one
//! policy from [`FIELD_POLICIES`]:
//!
//! - scalars: a later defined value replaces the current one, an absent
//!   value never erases it
//! - address and services: key-wise union, same rule per key
//! - payments: a later non-empty schedule replaces the whole list
//! - layer tables and witnesses: replaced whole by any later value
//!
//! The per-field functions destructure the record exhaustively, so adding a
//! field to the model without a merge decision is a compile error.

pub mod batch;
pub mod runner;

pub use batch::*;
pub use runner::*;

use crate::models::{Address, ContractRecord, ContractedServices};
use crate::pipeline::extraction::ExtractionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    LaterWins,
    NestedUnion,
    ReplaceIfNonEmpty,
    Overwrite,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LaterWins => "later_wins",
            Self::NestedUnion => "nested_union",
            Self::ReplaceIfNonEmpty => "replace_if_non_empty",
            Self::Overwrite => "overwrite",
        }
    }
}

/// Policy per serialized top-level field.
pub const FIELD_POLICIES: &[(&str, MergePolicy)] = &[
    ("fullName", MergePolicy::LaterWins),
    ("documentType", MergePolicy::LaterWins),
    ("documentNumber", MergePolicy::LaterWins),
    ("rg", MergePolicy::LaterWins),
    ("rgIssuer", MergePolicy::LaterWins),
    ("ie", MergePolicy::LaterWins),
    ("email", MergePolicy::LaterWins),
    ("phone", MergePolicy::LaterWins),
    ("address", MergePolicy::NestedUnion),
    ("contractNumber", MergePolicy::LaterWins),
    ("startDate", MergePolicy::LaterWins),
    ("durationMonths", MergePolicy::LaterWins),
    ("farmName", MergePolicy::LaterWins),
    ("totalAreaHectares", MergePolicy::LaterWins),
    ("pricePerHectare", MergePolicy::LaterWins),
    ("totalValue", MergePolicy::LaterWins),
    ("payments", MergePolicy::ReplaceIfNonEmpty),
    ("services", MergePolicy::NestedUnion),
    ("soilAnalysisLavoura", MergePolicy::Overwrite),
    ("soilAnalysisAbertura", MergePolicy::Overwrite),
    ("witness1", MergePolicy::Overwrite),
    ("witness2", MergePolicy::Overwrite),
];

pub fn policy_for(field: &str) -> Option<MergePolicy> {
    FIELD_POLICIES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, policy)| *policy)
}

/// Key-wise union for nested groups.
pub trait NestedMerge {
    fn merge_from(&mut self, next: Self);
}

fn later_wins<T>(current: &mut Option<T>, next: Option<T>) {
    if next.is_some() {
        *current = next;
    }
}

fn nested_union<T: NestedMerge>(current: &mut Option<T>, next: Option<T>) {
    match (current.as_mut(), next) {
        (Some(existing), Some(incoming)) => existing.merge_from(incoming),
        (None, Some(incoming)) => *current = Some(incoming),
        (_, None) => {}
    }
}

fn replace_if_non_empty<T>(current: &mut Option<Vec<T>>, next: Option<Vec<T>>) {
    if let Some(list) = next {
        if !list.is_empty() {
            *current = Some(list);
        }
    }
}

impl NestedMerge for Address {
    fn merge_from(&mut self, next: Self) {
        let Address {
            street,
            complement,
            neighborhood,
            city,
            state,
            zip_code,
        } = next;
        later_wins(&mut self.street, street);
        later_wins(&mut self.complement, complement);
        later_wins(&mut self.neighborhood, neighborhood);
        later_wins(&mut self.city, city);
        later_wins(&mut self.state, state);
        later_wins(&mut self.zip_code, zip_code);
    }
}

impl NestedMerge for ContractedServices {
    fn merge_from(&mut self, next: Self) {
        let ContractedServices {
            has_fertility_consultancy,
            has_soil_sampling,
            has_digital_agriculture,
            has_tsi_premium,
            has_tsi_abertura,
            has_nema_scan,
            has_soil_analysis,
            has_compaction_samples,
            has_calibration,
            has_other_services,
            other_services_description,
            sampling_grid_size,
            technical_visits_amount,
            compaction_grid_size,
            calibration_total,
        } = next;
        later_wins(&mut self.has_fertility_consultancy, has_fertility_consultancy);
        later_wins(&mut self.has_soil_sampling, has_soil_sampling);
        later_wins(&mut self.has_digital_agriculture, has_digital_agriculture);
        later_wins(&mut self.has_tsi_premium, has_tsi_premium);
        later_wins(&mut self.has_tsi_abertura, has_tsi_abertura);
        later_wins(&mut self.has_nema_scan, has_nema_scan);
        later_wins(&mut self.has_soil_analysis, has_soil_analysis);
        later_wins(&mut self.has_compaction_samples, has_compaction_samples);
        later_wins(&mut self.has_calibration, has_calibration);
        later_wins(&mut self.has_other_services, has_other_services);
        later_wins(&mut self.other_services_description, other_services_description);
        later_wins(&mut self.sampling_grid_size, sampling_grid_size);
        later_wins(&mut self.technical_visits_amount, technical_visits_amount);
        later_wins(&mut self.compaction_grid_size, compaction_grid_size);
        later_wins(&mut self.calibration_total, calibration_total);
    }
}

/// Fold `next` into `current` field by field.
pub fn merge_into(current: &mut ContractRecord, next: ContractRecord) {
    let ContractRecord {
        full_name,
        document_type,
        document_number,
        rg,
        rg_issuer,
        ie,
        email,
        phone,
        address,
        contract_number,
        start_date,
        duration_months,
        farm_name,
        total_area_hectares,
        price_per_hectare,
        total_value,
        payments,
        services,
        soil_analysis_lavoura,
        soil_analysis_abertura,
        witness1,
        witness2,
    } = next;

    later_wins(&mut current.full_name, full_name);
    later_wins(&mut current.document_type, document_type);
    later_wins(&mut current.document_number, document_number);
    later_wins(&mut current.rg, rg);
    later_wins(&mut current.rg_issuer, rg_issuer);
    later_wins(&mut current.ie, ie);
    later_wins(&mut current.email, email);
    later_wins(&mut current.phone, phone);
    nested_union(&mut current.address, address);
    later_wins(&mut current.contract_number, contract_number);
    later_wins(&mut current.start_date, start_date);
    later_wins(&mut current.duration_months, duration_months);
    later_wins(&mut current.farm_name, farm_name);
    later_wins(&mut current.total_area_hectares, total_area_hectares);
    later_wins(&mut current.price_per_hectare, price_per_hectare);
    later_wins(&mut current.total_value, total_value);
    replace_if_non_empty(&mut current.payments, payments);
    nested_union(&mut current.services, services);
    // Layer tables and witnesses are replaced whole
    later_wins(&mut current.soil_analysis_lavoura, soil_analysis_lavoura);
    later_wins(&mut current.soil_analysis_abertura, soil_analysis_abertura);
    later_wins(&mut current.witness1, witness1);
    later_wins(&mut current.witness2, witness2);
}

/// Merge two records into a new one; `next` takes precedence.
pub fn merge(current: &ContractRecord, next: &ContractRecord) -> ContractRecord {
    let mut merged = current.clone();
    merge_into(&mut merged, next.clone());
    merged
}

/// Fold the data of every successful result, in order. Failed results are skipped.
pub fn merge_all(results: &[ExtractionResult]) -> ContractRecord {
    results
        .iter()
        .filter(|r| r.success)
        .filter_map(|r| r.data.as_ref())
        .fold(ContractRecord::default(), |mut acc, data| {
            merge_into(&mut acc, data.clone());
            acc
        })
}
