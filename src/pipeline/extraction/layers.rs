//! Soil analysis layer table.
//!
//! Proposals describe per-depth sampling and analysis percentages in two
//! incompatible layouts:
//!
//! - separate lines: `Amostras 0-20 cm (80%)` and
//!   `Análise 0-20 cm (60% Macro, 20% Micro)`
//! - one line per depth: `80% 0-20 cm (60% Macro, 20% Micro)`
//!
//! Both coalesce into one row per depth, ordered by first appearance.
//! Layouts are mutually exclusive per text: the second is only tried when the
//! first yields nothing, and a bare `0-20 cm (...)` form is the last resort.

use std::sync::LazyLock;

use regex::Regex;

use super::normalize::percent_value;
use crate::models::{SoilAnalysisLayer, SoilZone};

static DEPTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*-\s*(\d+)\s*cm").expect("invalid depth regex"));

static SAMPLES_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Amostras?\s+(\d+\s*-\s*\d+\s*cm)\s*\(([^)]*)\)").expect("invalid samples regex")
});

static ANALYSIS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)An[aá]lises?\s+(\d+\s*-\s*\d+\s*cm)\s*\(([^)]*)\)").expect("invalid analysis regex")
});

static COMBINED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:[.,]\d+)?)\s*%\s+(\d+\s*-\s*\d+\s*cm)\s*\(([^)]*)\)")
        .expect("invalid combined layer regex")
});

static BARE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+\s*-\s*\d+\s*cm)\s*\(([^)]*)\)").expect("invalid bare layer regex")
});

static ZONE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(lavoura|abertura)\b").expect("invalid zone regex"));

/// Percentage kinds that can appear inside an analysis parenthesis.
#[derive(Debug, Clone, Copy)]
enum Component {
    Macro,
    Micro,
    Sulfur,
    Physical,
}

static COMPONENTS: LazyLock<Vec<(Component, Regex)>> = LazyLock::new(|| {
    let pct = r"(\d+(?:[.,]\d+)?)\s*%\s*(?:de\s+)?";
    vec![
        (Component::Macro, Regex::new(&format!(r"(?i){pct}macro")).expect("invalid macro regex")),
        (Component::Micro, Regex::new(&format!(r"(?i){pct}micro")).expect("invalid micro regex")),
        (
            Component::Sulfur,
            Regex::new(&format!(r"(?i){pct}(?:enxofre|sulfur|\bS\b)")).expect("invalid sulfur regex"),
        ),
        (
            Component::Physical,
            Regex::new(&format!(r"(?i){pct}f[ií]sica")).expect("invalid physical regex"),
        ),
    ]
});

/// "0-20cm", "0 - 20 cm" → "0-20 cm". Returns the input trimmed if it has no depth shape.
pub fn normalize_depth(raw: &str) -> String {
    match DEPTH.captures(raw) {
        Some(caps) => format!("{}-{} cm", &caps[1], &caps[2]),
        None => raw.trim().to_string(),
    }
}

/// Rows keyed by depth, kept in first-appearance order.
#[derive(Debug, Default)]
pub struct LayerTable {
    rows: Vec<SoilAnalysisLayer>,
}

impl LayerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The row for `depth`, created at the end if new.
    pub fn row(&mut self, depth: &str) -> &mut SoilAnalysisLayer {
        let depth = normalize_depth(depth);
        let index = match self.rows.iter().position(|r| r.depth == depth) {
            Some(i) => i,
            None => {
                self.rows.push(SoilAnalysisLayer::new(depth));
                self.rows.len() - 1
            }
        };
        &mut self.rows[index]
    }

    /// Fill analysis percentages from a parenthesised description.
    /// Later values overwrite earlier ones for the same sub-field.
    pub fn apply_analysis(&mut self, depth: &str, description: &str) {
        let row = self.row(depth);
        apply_components(row, description);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<SoilAnalysisLayer> {
        self.rows
    }
}

pub fn apply_components(row: &mut SoilAnalysisLayer, description: &str) {
    for (component, regex) in COMPONENTS.iter() {
        if let Some(caps) = regex.captures(description) {
            let value = Some(caps[1].to_string());
            match component {
                Component::Macro => row.macro_pct = value,
                Component::Micro => row.micro_pct = value,
                Component::Sulfur => row.sulfur_pct = value,
                Component::Physical => row.physical_pct = value,
            }
        }
    }
}

/// Extract the layer table from one text, trying each layout in turn.
pub fn extract_layers(text: &str) -> Vec<SoilAnalysisLayer> {
    let table = separate_lines(text);
    if !table.is_empty() {
        return table.into_rows();
    }
    let table = combined_lines(text);
    if !table.is_empty() {
        return table.into_rows();
    }
    bare_lines(text).into_rows()
}

fn separate_lines(text: &str) -> LayerTable {
    // Collect both line kinds with their offsets so rows follow document order
    let mut hits: Vec<(usize, bool, String, String)> = SAMPLES_LINE
        .captures_iter(text)
        .map(|c| (offset(&c), true, c[1].to_string(), c[2].to_string()))
        .chain(
            ANALYSIS_LINE
                .captures_iter(text)
                .map(|c| (offset(&c), false, c[1].to_string(), c[2].to_string())),
        )
        .collect();
    hits.sort_by_key(|h| h.0);

    let mut table = LayerTable::new();
    for (_, is_samples, depth, inner) in hits {
        if is_samples {
            let row = table.row(&depth);
            if let Some(pct) = percent_value(&inner) {
                row.samples_pct = Some(pct);
            }
        } else {
            table.apply_analysis(&depth, &inner);
        }
    }
    table
}

fn combined_lines(text: &str) -> LayerTable {
    let mut table = LayerTable::new();
    for caps in COMBINED_LINE.captures_iter(text) {
        let row = table.row(&caps[2]);
        row.samples_pct = Some(caps[1].to_string());
        apply_components(row, &caps[3]);
    }
    table
}

fn bare_lines(text: &str) -> LayerTable {
    let mut table = LayerTable::new();
    for caps in BARE_LINE.captures_iter(text) {
        table.apply_analysis(&caps[1], &caps[2]);
    }
    table
}

fn offset(caps: &regex::Captures<'_>) -> usize {
    caps.get(0).map(|m| m.start()).unwrap_or(0)
}

/// Split text at lavoura/abertura markers and extract a table per zone.
///
/// Text before any marker belongs to lavoura. Segments of the same zone are
/// concatenated before extraction so a depth split across segments still
/// yields one row.
pub fn extract_zoned_layers(text: &str) -> Vec<(SoilZone, Vec<SoilAnalysisLayer>)> {
    let mut lavoura = String::new();
    let mut abertura = String::new();

    let mut zone = SoilZone::Lavoura;
    let mut cursor = 0;
    for m in ZONE_MARKER.find_iter(text) {
        push_segment(zone, &text[cursor..m.start()], &mut lavoura, &mut abertura);
        zone = if m.as_str().eq_ignore_ascii_case("abertura") {
            SoilZone::Abertura
        } else {
            SoilZone::Lavoura
        };
        cursor = m.start();
    }
    push_segment(zone, &text[cursor..], &mut lavoura, &mut abertura);

    [(SoilZone::Lavoura, lavoura), (SoilZone::Abertura, abertura)]
        .into_iter()
        .map(|(zone, segment)| (zone, extract_layers(&segment)))
        .filter(|(_, rows)| !rows.is_empty())
        .collect()
}

fn push_segment(zone: SoilZone, segment: &str, lavoura: &mut String, abertura: &mut String) {
    let target = match zone {
        SoilZone::Lavoura => lavoura,
        SoilZone::Abertura => abertura,
    };
    target.push_str(segment);
    target.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_normalization() {
        assert_eq!(normalize_depth("0-20cm"), "0-20 cm");
        assert_eq!(normalize_depth("20 - 40 cm"), "20-40 cm");
        assert_eq!(normalize_depth(" superficial "), "superficial");
    }

    #[test]
    fn separate_lines_coalesce_per_depth() {
        let text = "Amostras 0-20 cm (80%)\nAnálise 0-20 cm (60% Macro, 20% Micro)";
        let rows = extract_layers(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].depth, "0-20 cm");
        assert_eq!(rows[0].samples_pct.as_deref(), Some("80"));
        assert_eq!(rows[0].macro_pct.as_deref(), Some("60"));
        assert_eq!(rows[0].micro_pct.as_deref(), Some("20"));
    }

    #[test]
    fn rows_follow_first_appearance() {
        let text = "Análise 20-40 cm (100% Macro)\nAmostras 0-20 cm (100%)\nAmostras 20-40 cm (50%)";
        let rows = extract_layers(text);
        let depths: Vec<&str> = rows.iter().map(|r| r.depth.as_str()).collect();
        assert_eq!(depths, vec!["20-40 cm", "0-20 cm"]);
        assert_eq!(rows[0].samples_pct.as_deref(), Some("50"));
        assert_eq!(rows[0].macro_pct.as_deref(), Some("100"));
    }

    #[test]
    fn combined_layout() {
        let text = "80% 0-20 cm (60% Macro, 20% Micro, 10% Enxofre)\n40% 20-40cm (100% de Macro)";
        let rows = extract_layers(text);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].samples_pct.as_deref(), Some("80"));
        assert_eq!(rows[0].sulfur_pct.as_deref(), Some("10"));
        assert_eq!(rows[1].depth, "20-40 cm");
        assert_eq!(rows[1].macro_pct.as_deref(), Some("100"));
        assert_eq!(rows[1].micro_pct, None);
    }

    #[test]
    fn combined_layout_ignored_when_separate_lines_found() {
        let text = "Amostras 0-20 cm (80%)\n50% 20-40 cm (100% Macro)";
        let rows = extract_layers(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].depth, "0-20 cm");
    }

    #[test]
    fn bare_layout_last_resort() {
        let rows = extract_layers("0-10 cm (30% Física)");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].physical_pct.as_deref(), Some("30"));
        assert_eq!(rows[0].samples_pct, None);
    }

    #[test]
    fn unknown_component_leaves_extra_blank() {
        let rows = extract_layers("Análise 0-20 cm (60% Macro, 15% Boro)");
        assert_eq!(rows[0].macro_pct.as_deref(), Some("60"));
        assert_eq!(rows[0].extra_pct, None);
    }

    #[test]
    fn later_value_overwrites_same_subfield() {
        let text = "Análise 0-20 cm (60% Macro)\nAnálise 0-20 cm (70% Macro)";
        let rows = extract_layers(text);
        assert_eq!(rows[0].macro_pct.as_deref(), Some("70"));
    }

    #[test]
    fn no_layers_is_empty() {
        assert!(extract_layers("nenhuma camada").is_empty());
    }

    #[test]
    fn zones_split_on_markers() {
        let text = "TSI PREMIUM lavoura\nAmostras 0-20 cm (80%)\nTSI ABERTURA\nAmostras 0-20 cm (100%)\nAnálise 0-20 cm (100% Macro)";
        let zones = extract_zoned_layers(text);
        assert_eq!(zones.len(), 2);

        let (zone, rows) = &zones[0];
        assert_eq!(*zone, SoilZone::Lavoura);
        assert_eq!(rows[0].samples_pct.as_deref(), Some("80"));
        assert_eq!(rows[0].macro_pct, None);

        let (zone, rows) = &zones[1];
        assert_eq!(*zone, SoilZone::Abertura);
        assert_eq!(rows[0].samples_pct.as_deref(), Some("100"));
        assert_eq!(rows[0].macro_pct.as_deref(), Some("100"));
    }

    #[test]
    fn unmarked_text_is_lavoura() {
        let zones = extract_zoned_layers("Amostras 0-20 cm (80%)");
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].0, SoilZone::Lavoura);
    }
}
