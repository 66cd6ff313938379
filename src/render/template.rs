//! Flat dictionary consumed by the contract document template.
//!
//! Keys are the template's fixed Portuguese placeholders. The dictionary is
//! a pure function of the finalized record and the signing date.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::extenso::{currency_words, integer_words, number_words};
use super::format::{
    format_area, format_currency, format_date, format_document, format_layer_cell, format_phone,
};
use crate::models::{ServiceFlag, SoilAnalysisLayer, SoilZone};
use crate::validation::FinalizedContract;

const MONTHS: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto", "setembro",
    "outubro", "novembro", "dezembro",
];

const DETAIL_PLACEHOLDER: &str = "_____";
const CALIBRATION_PLACEHOLDER: &str = "______";
const NO_FARM: &str = "Não informado";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentRow {
    pub numero: u32,
    pub valor: String,
    pub valor_extenso: String,
    pub vencimento: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRow {
    #[serde(flatten)]
    pub layer: SoilAnalysisLayer,
    pub samples_formatted: String,
    pub macro_formatted: String,
    pub micro_formatted: String,
    pub physical_formatted: String,
    pub sulfur_formatted: String,
    pub extra_formatted: String,
    /// All analysis cells on one line, for single-column templates.
    pub analises_formatted: String,
}

impl LayerRow {
    fn from_layer(layer: &SoilAnalysisLayer) -> Self {
        let macro_formatted = format_layer_cell(layer.macro_pct.as_deref(), " Macro");
        let micro_formatted = format_layer_cell(layer.micro_pct.as_deref(), " Micro");
        let physical_formatted = format_layer_cell(layer.physical_pct.as_deref(), " Física");
        let sulfur_formatted = format_layer_cell(layer.sulfur_pct.as_deref(), " Enxofre");
        let extra_formatted = format_layer_cell(layer.extra_pct.as_deref(), " ______");
        let analises_formatted = [
            macro_formatted.as_str(),
            &micro_formatted,
            &physical_formatted,
            &sulfur_formatted,
            &extra_formatted,
        ]
        .join("  ");

        Self {
            layer: layer.clone(),
            samples_formatted: format_layer_cell(layer.samples_pct.as_deref(), ""),
            macro_formatted,
            micro_formatted,
            physical_formatted,
            sulfur_formatted,
            extra_formatted,
            analises_formatted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateData {
    // Party
    pub nome_contratante: String,
    pub cpf_cnpj: String,
    pub rg: String,
    pub rg_issuer: String,
    pub rg_ie: String,
    pub ie: String,
    pub endereco_completo: String,
    pub endereco_rua: String,
    pub endereco_numero: String,
    pub endereco_complemento: String,
    pub endereco_bairro: String,
    pub endereco_cidade: String,
    pub endereco_estado: String,
    pub endereco_cep: String,
    pub email: String,
    pub telefone: String,

    // Contract
    pub numero_contrato: String,
    pub data_inicio: String,
    pub vigencia_meses: u32,
    pub vigencia_por_extenso: String,

    // Farm
    pub nome_fazenda: String,
    pub area_total: String,
    pub area_por_extenso: String,

    // Values
    pub valor_por_ha: String,
    pub valor_por_ha_extenso: String,
    pub valor_total: String,
    pub valor_total_extenso: String,

    // Services
    pub tem_consultoria_fertilidade: bool,
    pub tem_amostragem_solo: bool,
    pub tem_agricultura_digital: bool,
    pub tem_tsi_premium: bool,
    pub tem_tsi_abertura: bool,
    pub tem_nema_scan: bool,
    pub tem_outros_servicos: bool,
    pub tem_analise_solo: bool,
    pub tem_amostras_compactacao: bool,
    pub tem_calibracoes: bool,
    pub descricao_outros_servicos: String,
    pub txt_tem_consultoria_fertilidade: &'static str,
    pub txt_tem_amostragem_solo: &'static str,
    pub txt_tem_visitas_tecnicas: &'static str,
    pub txt_tem_analise_solo: &'static str,
    pub txt_tem_amostras_compactacao: &'static str,
    pub txt_tem_calibracoes: &'static str,
    pub grade_amostral: String,
    pub qtde_visitas: String,
    pub grade_compactacao: String,
    pub total_calibracoes: String,

    // Installments
    pub qtde_parcelas: usize,
    pub qtde_parcelas_extenso: String,
    pub parcelas: Vec<InstallmentRow>,

    // Witnesses
    pub testemunha1_nome: String,
    pub testemunha1_documento: String,
    pub testemunha2_nome: String,
    pub testemunha2_documento: String,

    // Signature
    pub dia_assinatura: String,
    pub mes_assinatura: String,
    pub ano_assinatura: String,

    pub lavoura_layers: Vec<LayerRow>,
    pub abertura_layers: Vec<LayerRow>,
}

fn is_text(flag: bool) -> &'static str {
    if flag {
        "é"
    } else {
        "não é"
    }
}

fn or_placeholder(value: Option<&str>, placeholder: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => placeholder.to_string(),
    }
}

/// Build the template dictionary for a finalized contract signed on `signed_on`.
pub fn contract_to_template_data(contract: &FinalizedContract, signed_on: NaiveDate) -> TemplateData {
    let record = contract.record();
    let address = record.address.clone().unwrap_or_default();
    let services = record.services.clone().unwrap_or_default();
    let witness1 = record.witness1.clone().unwrap_or_default();
    let witness2 = record.witness2.clone().unwrap_or_default();
    let payments = record.payments.as_deref().unwrap_or(&[]);

    let street = address.street.unwrap_or_default();
    let complement = address.complement.unwrap_or_default();
    let neighborhood = address.neighborhood.unwrap_or_default();
    let city = address.city.unwrap_or_default();
    let state = address.state.unwrap_or_default();
    let zip_code = address.zip_code.unwrap_or_default();

    let mut endereco_completo = street.clone();
    if !complement.is_empty() {
        endereco_completo.push_str(", ");
        endereco_completo.push_str(&complement);
    }
    endereco_completo.push_str(&format!(", {neighborhood}, {city} - {state}, CEP: {zip_code}"));

    let rg = record.rg.clone().unwrap_or_default();
    let ie = record.ie.clone().unwrap_or_default();
    let rg_ie = if rg.is_empty() { ie.clone() } else { rg.clone() };

    let months = record.duration_months.unwrap_or_default();
    let area = record.total_area_hectares.unwrap_or_default();
    let price = record.price_per_hectare.unwrap_or_default();
    let total = record.total_value.unwrap_or_default();
    let visits = services.technical_visits_amount.filter(|v| *v > 0);

    TemplateData {
        nome_contratante: record.full_name.clone().unwrap_or_default(),
        cpf_cnpj: format_document(record.document_number.as_deref().unwrap_or_default()),
        rg,
        rg_issuer: record.rg_issuer.clone().unwrap_or_default(),
        rg_ie,
        ie,
        endereco_completo,
        endereco_rua: street,
        endereco_numero: "N/A".to_string(),
        endereco_complemento: complement,
        endereco_bairro: neighborhood,
        endereco_cidade: city,
        endereco_estado: state,
        endereco_cep: zip_code,
        email: record.email.clone().unwrap_or_default(),
        telefone: format_phone(record.phone.as_deref().unwrap_or_default()),

        numero_contrato: record.contract_number.clone().unwrap_or_default(),
        data_inicio: record.start_date.map(format_date).unwrap_or_default(),
        vigencia_meses: months,
        vigencia_por_extenso: integer_words(months.into()),

        nome_fazenda: or_placeholder(record.farm_name.as_deref(), NO_FARM),
        area_total: format_area(area),
        area_por_extenso: number_words(area),

        valor_por_ha: format_currency(price),
        valor_por_ha_extenso: currency_words(price),
        valor_total: format_currency(total),
        valor_total_extenso: currency_words(total),

        tem_consultoria_fertilidade: services.has(ServiceFlag::FertilityConsultancy),
        tem_amostragem_solo: services.has(ServiceFlag::SoilSampling),
        tem_agricultura_digital: services.has(ServiceFlag::DigitalAgriculture),
        tem_tsi_premium: services.has(ServiceFlag::TsiPremium),
        tem_tsi_abertura: services.has(ServiceFlag::TsiAbertura),
        tem_nema_scan: services.has(ServiceFlag::NemaScan),
        tem_outros_servicos: services.has(ServiceFlag::OtherServices),
        tem_analise_solo: services.has(ServiceFlag::SoilAnalysis),
        tem_amostras_compactacao: services.has(ServiceFlag::CompactionSamples),
        tem_calibracoes: services.has(ServiceFlag::Calibration),
        descricao_outros_servicos: services.other_services_description.clone().unwrap_or_default(),
        txt_tem_consultoria_fertilidade: is_text(services.has(ServiceFlag::FertilityConsultancy)),
        txt_tem_amostragem_solo: is_text(services.has(ServiceFlag::SoilSampling)),
        txt_tem_visitas_tecnicas: if visits.is_some() { "são" } else { "não são" },
        txt_tem_analise_solo: is_text(services.has(ServiceFlag::SoilAnalysis)),
        txt_tem_amostras_compactacao: is_text(services.has(ServiceFlag::CompactionSamples)),
        txt_tem_calibracoes: is_text(services.has(ServiceFlag::Calibration)),
        grade_amostral: or_placeholder(services.sampling_grid_size.as_deref(), DETAIL_PLACEHOLDER),
        qtde_visitas: visits
            .map(|v| v.to_string())
            .unwrap_or_else(|| DETAIL_PLACEHOLDER.to_string()),
        grade_compactacao: or_placeholder(services.compaction_grid_size.as_deref(), DETAIL_PLACEHOLDER),
        total_calibracoes: or_placeholder(services.calibration_total.as_deref(), CALIBRATION_PLACEHOLDER),

        qtde_parcelas: payments.len(),
        qtde_parcelas_extenso: integer_words(payments.len() as u64),
        parcelas: payments
            .iter()
            .map(|p| InstallmentRow {
                numero: p.number,
                valor: format_currency(p.value),
                valor_extenso: currency_words(p.value),
                vencimento: format_date(p.due_date),
            })
            .collect(),

        testemunha1_nome: witness1.name.unwrap_or_default(),
        testemunha1_documento: witness1.document.unwrap_or_default(),
        testemunha2_nome: witness2.name.unwrap_or_default(),
        testemunha2_documento: witness2.document.unwrap_or_default(),

        dia_assinatura: format!("{:02}", signed_on.day()),
        mes_assinatura: MONTHS[signed_on.month0() as usize].to_string(),
        ano_assinatura: signed_on.year().to_string(),

        lavoura_layers: record.layers(SoilZone::Lavoura).iter().map(LayerRow::from_layer).collect(),
        abertura_layers: record.layers(SoilZone::Abertura).iter().map(LayerRow::from_layer).collect(),
    }
}
