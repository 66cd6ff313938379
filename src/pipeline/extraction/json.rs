//! Extractor for pre-structured proposal JSON.
//!
//! The document is already typed, so a successful parse is trusted at full
//! confidence. Field types are loose in the wild (numbers as strings, money
//! with currency symbols), so scalars deserialize through [`Scalar`].

use serde::Deserialize;

use super::layers::{apply_components, extract_layers, LayerTable};
use super::normalize::{clean_client_name, parse_date_or_today, parse_decimal, parse_money};
use super::services::{append_other_services, infer_services};
use super::types::{DocumentExtractor, ExtractionResult};
use super::ExtractionError;
use crate::models::{ContractRecord, Payment, SoilAnalysisLayer, SoilZone};
use crate::pipeline::import::SourceFormat;

/// A string or number, as found in hand-made exports.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    fn as_text(&self) -> String {
        match self {
            Self::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }

    fn as_money(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Text(s) => parse_money(s),
        }
    }

    fn as_decimal(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => parse_decimal(s),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProposalDocument {
    cliente: Option<Scalar>,
    dados_gerais: Option<GeneralData>,
    investimento: Option<Vec<InvestmentEntry>>,
    parcelas: Option<Vec<InstallmentEntry>>,
    analises: Option<Vec<AnalysisEntry>>,
    outros_servicos: Option<Vec<OtherServiceEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeneralData {
    fazenda: Option<String>,
    #[serde(rename = "área", alias = "area")]
    area: Option<Scalar>,
    grade: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InvestmentEntry {
    tipo: Option<String>,
    valor: Option<Scalar>,
    nome: Option<String>,
    produto: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstallmentEntry {
    numero: Option<Scalar>,
    valor: Option<Scalar>,
    data: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalysisEntry {
    nome_produto: Option<String>,
    descricao_bruta: Option<String>,
    componentes: Option<Vec<AnalysisComponent>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalysisComponent {
    profundidade: Option<String>,
    estratificacao: Option<Scalar>,
    analises: Option<ComponentAnalyses>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComponentAnalyses {
    #[serde(rename = "macro")]
    macro_pct: Option<Scalar>,
    #[serde(rename = "micro")]
    micro_pct: Option<Scalar>,
    #[serde(rename = "enxofre")]
    sulfur_pct: Option<Scalar>,
    #[serde(rename = "fisica", alias = "física")]
    physical_pct: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OtherServiceEntry {
    nome: Option<String>,
}

/// Investment row kinds that carry the price per hectare or the total.
const PRICE_PER_HECTARE_KIND: &str = "CUSTO_HECTARE";
const TOTAL_KINDS: [&str; 2] = ["VALOR_TOTAL", "VALOR TOTAL ANUAL"];

pub struct JsonProposalExtractor;

impl JsonProposalExtractor {
    fn try_extract(&self, bytes: &[u8]) -> Result<ExtractionResult, ExtractionError> {
        let document: ProposalDocument = serde_json::from_slice(bytes)?;
        let mut warnings = Vec::new();
        let record = map_document(document, &mut warnings);
        tracing::info!(warnings = warnings.len(), "JSON extraction complete");
        Ok(ExtractionResult::succeeded(record, warnings, 100))
    }
}

impl DocumentExtractor for JsonProposalExtractor {
    fn format(&self) -> SourceFormat {
        SourceFormat::Json
    }

    fn extract(&self, bytes: &[u8]) -> ExtractionResult {
        self.try_extract(bytes).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "JSON extraction failed");
            ExtractionResult::from_error(&e)
        })
    }
}

fn map_document(doc: ProposalDocument, warnings: &mut Vec<String>) -> ContractRecord {
    let mut record = ContractRecord::default();

    match doc.cliente.map(|c| clean_client_name(&c.as_text())) {
        Some(name) if !name.is_empty() => record.full_name = Some(name),
        _ => warnings.push("Field not found: client name".to_string()),
    }

    let mut grid = None;
    if let Some(general) = doc.dados_gerais {
        record.farm_name = general.fazenda.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
        record.total_area_hectares = general.area.and_then(|a| a.as_decimal()).filter(|a| *a > 0.0);
        grid = general.grade.map(|g| g.as_text()).filter(|g| !g.is_empty());
    }

    // Text blocks that imply services
    let mut blocks: Vec<String> = Vec::new();

    for entry in doc.investimento.unwrap_or_default() {
        let kind = entry.tipo.as_deref().map(str::trim).unwrap_or_default().to_uppercase();
        let value = entry.valor.as_ref().map(Scalar::as_money).filter(|v| *v > 0.0);
        if kind == PRICE_PER_HECTARE_KIND {
            record.price_per_hectare = value.or(record.price_per_hectare);
        } else if TOTAL_KINDS.contains(&kind.as_str()) {
            record.total_value = value.or(record.total_value);
        }
        blocks.extend(entry.nome.into_iter().chain(entry.produto));
    }

    let payments = map_installments(doc.parcelas.unwrap_or_default());
    if payments.is_empty() {
        warnings.push("Field not found: payment schedule".to_string());
    } else {
        record.payments = Some(payments);
    }

    let mut lavoura = LayerTable::new();
    let mut abertura = LayerTable::new();
    for entry in doc.analises.unwrap_or_default() {
        let name = entry.nome_produto.unwrap_or_default();
        let description = entry.descricao_bruta.unwrap_or_default();
        let zone = zone_of(&name, &description);
        let table = match zone {
            SoilZone::Lavoura => &mut lavoura,
            SoilZone::Abertura => &mut abertura,
        };

        let components = entry.componentes.unwrap_or_default();
        if components.is_empty() {
            for row in extract_layers(&description) {
                merge_row(table, row);
            }
        } else {
            for component in components {
                apply_component(table, component);
            }
        }
        blocks.push(name);
        blocks.push(description);
    }
    for (zone, table) in [(SoilZone::Lavoura, lavoura), (SoilZone::Abertura, abertura)] {
        if !table.is_empty() {
            record.set_layers(zone, table.into_rows());
        }
    }

    let other_names: Vec<String> = doc
        .outros_servicos
        .unwrap_or_default()
        .into_iter()
        .filter_map(|s| s.nome)
        .collect();
    blocks.extend(other_names.iter().cloned());

    let block_refs: Vec<&str> = blocks.iter().map(String::as_str).filter(|b| !b.trim().is_empty()).collect();
    let mut services = infer_services(&block_refs);
    if grid.is_some() {
        services.sampling_grid_size = grid;
    }
    append_other_services(&mut services, &other_names);
    record.services = Some(services);

    record
}

fn map_installments(entries: Vec<InstallmentEntry>) -> Vec<Payment> {
    let mut payments: Vec<Payment> = entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| Payment {
            number: entry
                .numero
                .and_then(|n| n.as_text().parse().ok())
                .unwrap_or(i as u32 + 1),
            due_date: parse_date_or_today(entry.data.as_deref().unwrap_or_default()),
            value: entry.valor.as_ref().map(Scalar::as_money).unwrap_or(0.0),
            status: None,
        })
        .collect();
    payments.sort_by_key(|p| p.number);
    for (i, payment) in payments.iter_mut().enumerate() {
        payment.number = i as u32 + 1;
    }
    payments
}

/// Products named for newly opened land go to the abertura table.
fn zone_of(name: &str, description: &str) -> SoilZone {
    let mentions = |s: &str| s.to_lowercase().contains("abertura");
    if mentions(name) || (name.trim().is_empty() && mentions(description)) {
        SoilZone::Abertura
    } else {
        SoilZone::Lavoura
    }
}

fn apply_component(table: &mut LayerTable, component: AnalysisComponent) {
    let Some(depth) = component.profundidade.filter(|d| !d.trim().is_empty()) else {
        return;
    };
    let row = table.row(&depth);
    if let Some(samples) = component.estratificacao {
        row.samples_pct = super::normalize::percent_value(&samples.as_text());
    }
    if let Some(analyses) = component.analises {
        let pct = |s: Option<Scalar>| s.and_then(|v| super::normalize::percent_value(&v.as_text()));
        if let Some(v) = pct(analyses.macro_pct) {
            row.macro_pct = Some(v);
        }
        if let Some(v) = pct(analyses.micro_pct) {
            row.micro_pct = Some(v);
        }
        if let Some(v) = pct(analyses.sulfur_pct) {
            row.sulfur_pct = Some(v);
        }
        if let Some(v) = pct(analyses.physical_pct) {
            row.physical_pct = Some(v);
        }
    }
}

fn merge_row(table: &mut LayerTable, incoming: SoilAnalysisLayer) {
    let row = table.row(&incoming.depth);
    row.samples_pct = incoming.samples_pct.or(row.samples_pct.take());
    let description = [
        incoming.macro_pct.map(|v| format!("{v}% Macro")),
        incoming.micro_pct.map(|v| format!("{v}% Micro")),
        incoming.sulfur_pct.map(|v| format!("{v}% Enxofre")),
        incoming.physical_pct.map(|v| format!("{v}% Física")),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ");
    apply_components(row, &description);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceFlag;
    use chrono::NaiveDate;

    fn extract(json: &str) -> ExtractionResult {
        JsonProposalExtractor.extract(json.as_bytes())
    }

    const PROPOSAL: &str = r#"{
        "cliente": "0042 - JOÃO DA SILVA",
        "dados_gerais": { "fazenda": "Fazenda Boa Vista", "área": "150,5", "grade": 5 },
        "investimento": [
            { "tipo": "CUSTO_HECTARE", "valor": "R$ 150,00", "nome": "FERTILE Consultoria" },
            { "tipo": "VALOR TOTAL ANUAL", "valor": 22575.0, "produto": "NEMA SCAN" }
        ],
        "parcelas": [
            { "numero": 2, "valor": "11.287,50", "data": "15/04/2025" },
            { "numero": 1, "valor": 11287.5, "data": "15/03/2025" }
        ],
        "analises": [
            {
                "nome_produto": "AMOSTRAGEM LAVOURA",
                "descricao_bruta": "Amostras 0-20 cm (80%)",
                "componentes": [
                    { "profundidade": "0-20cm", "estratificacao": "80%",
                      "analises": { "macro": "60%", "micro": 20 } }
                ]
            },
            {
                "nome_produto": "TSI ABERTURA",
                "descricao_bruta": "80% 0-20 cm (100% Macro)"
            }
        ],
        "outros_servicos": [ { "nome": "Treinamento" }, { "nome": "3 calibrações" } ]
    }"#;

    #[test]
    fn full_document_maps_every_section() {
        let result = extract(PROPOSAL);
        assert!(result.success);
        assert_eq!(result.confidence, 100);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);

        let data = result.data.unwrap();
        assert_eq!(data.full_name.as_deref(), Some("JOÃO DA SILVA"));
        assert_eq!(data.farm_name.as_deref(), Some("Fazenda Boa Vista"));
        assert_eq!(data.total_area_hectares, Some(150.5));
        assert_eq!(data.price_per_hectare, Some(150.0));
        assert_eq!(data.total_value, Some(22575.0));

        let payments = data.payments.as_ref().unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].number, 1);
        assert_eq!(payments[0].due_date, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        assert_eq!(payments[1].value, 11287.5);

        let lavoura = data.layers(SoilZone::Lavoura);
        assert_eq!(lavoura.len(), 1);
        assert_eq!(lavoura[0].depth, "0-20 cm");
        assert_eq!(lavoura[0].samples_pct.as_deref(), Some("80"));
        assert_eq!(lavoura[0].macro_pct.as_deref(), Some("60"));
        assert_eq!(lavoura[0].micro_pct.as_deref(), Some("20"));

        let abertura = data.layers(SoilZone::Abertura);
        assert_eq!(abertura.len(), 1);
        assert_eq!(abertura[0].macro_pct.as_deref(), Some("100"));

        let services = data.services.unwrap();
        assert!(services.has(ServiceFlag::FertilityConsultancy));
        assert!(services.has(ServiceFlag::NemaScan));
        assert!(services.has(ServiceFlag::SoilSampling));
        assert!(services.has(ServiceFlag::TsiAbertura));
        assert!(services.has(ServiceFlag::Calibration));
        assert!(services.has(ServiceFlag::OtherServices));
        assert_eq!(services.sampling_grid_size.as_deref(), Some("5"));
        assert_eq!(services.calibration_total.as_deref(), Some("3"));
        assert_eq!(
            services.other_services_description.as_deref(),
            Some("Treinamento, 3 calibrações")
        );
    }

    #[test]
    fn empty_object_succeeds_with_warnings() {
        let result = extract("{}");
        assert!(result.success);
        assert_eq!(result.confidence, 100);
        assert_eq!(result.warnings.len(), 2);
        let data = result.data.unwrap();
        assert!(data.full_name.is_none());
        assert!(data.payments.is_none());
        assert!(data.soil_analysis_lavoura.is_none());
    }

    #[test]
    fn malformed_json_is_failure() {
        let result = extract("{ not json");
        assert!(!result.success);
        assert_eq!(result.confidence, 0);
        assert!(result.errors[0].starts_with("JSON parsing failed"));
    }

    #[test]
    fn non_object_json_is_failure() {
        assert!(!extract("[1, 2, 3]").success);
    }

    #[test]
    fn installments_without_numbers_follow_order() {
        let result = extract(
            r#"{"parcelas":[{"valor":"100,00","data":"01/01/2026"},{"valor":"100,00","data":"01/02/2026"}]}"#,
        );
        let payments = result.data.unwrap().payments.unwrap();
        assert_eq!(payments[0].number, 1);
        assert_eq!(payments[1].number, 2);
        assert_eq!(payments[1].due_date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
    }

    #[test]
    fn area_alias_without_accent() {
        let result = extract(r#"{"dados_gerais":{"area": 80}}"#);
        assert_eq!(result.data.unwrap().total_area_hectares, Some(80.0));
    }

    #[test]
    fn abertura_routed_by_description_when_unnamed() {
        let result = extract(
            r#"{"analises":[{"descricao_bruta":"Área de abertura: Amostras 0-20 cm (100%)"}]}"#,
        );
        let data = result.data.unwrap();
        assert_eq!(data.layers(SoilZone::Abertura).len(), 1);
        assert!(data.soil_analysis_lavoura.is_none());
    }
}
