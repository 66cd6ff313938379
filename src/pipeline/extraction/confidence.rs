/// Confidence thresholds used when logging extraction quality
pub mod thresholds {
    /// Below this: most expected fields missed. Operator must fill the form.
    pub const LOW: u8 = 40;

    /// Above this: most fields recovered.
    pub const HIGH: u8 = 80;
}

/// Percentage of expected fields recovered, rounded to the nearest integer.
pub fn field_confidence(matched: usize, expected: usize) -> u8 {
    if expected == 0 {
        return 0;
    }
    let ratio = (matched.min(expected) as f64) / (expected as f64);
    (ratio * 100.0).round() as u8
}

/// Log a quality note for low-scoring extractions.
pub fn log_confidence(source: &str, confidence: u8) {
    if confidence < thresholds::LOW {
        tracing::warn!(source, confidence, "Low extraction confidence, manual review needed");
    } else {
        tracing::debug!(source, confidence, "Extraction confidence");
    }
}
