//! Three-stage contract wizard: upload → review → generate.
//!
//! Holds the current step and the record being worked on. The UI (or the
//! CLI) drives it with the outcome of a batch run, the reviewed record, and
//! finally a signing date.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::models::ContractRecord;
use crate::pipeline::merge::{BatchError, BatchOutcome};
use crate::render::{contract_to_template_data, TemplateData};
use crate::validation::{finalize, FinalizedContract, ValidationIssue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    Upload,
    Review,
    Generate,
}

impl WizardStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Review => "review",
            Self::Generate => "generate",
        }
    }

    /// Completion shown by the progress bar.
    pub fn progress_percent(&self) -> u8 {
        match self {
            Self::Upload => 33,
            Self::Review => 67,
            Self::Generate => 100,
        }
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum WizardError {
    #[error("Action not available at step {actual} (expected {expected})")]
    WrongStep {
        expected: WizardStep,
        actual: WizardStep,
    },

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("{} validation issue(s)", .0.len())]
    Invalid(Vec<ValidationIssue>),
}

#[derive(Debug)]
pub struct Wizard {
    step: WizardStep,
    record: Option<ContractRecord>,
    finalized: Option<FinalizedContract>,
    /// Consolidated message of the last failed batch.
    error: Option<String>,
    /// Per-file errors of a partially failed batch.
    notices: Vec<String>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Upload,
            record: None,
            finalized: None,
            error: None,
            notices: Vec::new(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn record(&self) -> Option<&ContractRecord> {
        self.record.as_ref()
    }

    /// Editable record, only while reviewing.
    pub fn record_mut(&mut self) -> Option<&mut ContractRecord> {
        match self.step {
            WizardStep::Review => self.record.as_mut(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    fn expect_step(&self, expected: WizardStep) -> Result<(), WizardError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(WizardError::WrongStep {
                expected,
                actual: self.step,
            })
        }
    }

    /// Take the outcome of a batch run. Advances to review only when the
    /// batch produced a record; a total failure stays on upload.
    pub fn accept_batch(
        &mut self,
        outcome: Result<BatchOutcome, BatchError>,
    ) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Upload)?;

        match outcome {
            Ok(outcome) => {
                self.error = None;
                self.notices = outcome.errors;
                self.record = Some(outcome.record);
                self.step = WizardStep::Review;
                tracing::debug!(notices = self.notices.len(), "Wizard advanced to review");
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                tracing::debug!(error = %e, "Wizard stays on upload");
                Err(e.into())
            }
        }
    }

    /// Skip extraction and review an empty record.
    pub fn start_manual(&mut self) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Upload)?;
        self.error = None;
        self.notices.clear();
        self.record = Some(ContractRecord::default());
        self.step = WizardStep::Review;
        Ok(())
    }

    /// Replace the record with the operator's version and finalize it.
    /// Stays on review with the submitted record when checks fail.
    pub fn submit_review(&mut self, record: ContractRecord) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Review)?;

        let result = finalize(&record);
        self.record = Some(record);
        match result {
            Ok(finalized) => {
                self.finalized = Some(finalized);
                self.step = WizardStep::Generate;
                Ok(())
            }
            Err(issues) => Err(WizardError::Invalid(issues)),
        }
    }

    /// Produce the template dictionary and start over.
    pub fn generate(&mut self, signed_on: NaiveDate) -> Result<TemplateData, WizardError> {
        self.expect_step(WizardStep::Generate)?;
        let Some(contract) = self.finalized.as_ref() else {
            return Err(WizardError::WrongStep {
                expected: WizardStep::Review,
                actual: self.step,
            });
        };

        let data = contract_to_template_data(contract, signed_on);
        self.reset();
        Ok(data)
    }

    /// One step back, keeping the record.
    pub fn back(&mut self) {
        self.step = match self.step {
            WizardStep::Upload | WizardStep::Review => WizardStep::Upload,
            WizardStep::Generate => {
                self.finalized = None;
                WizardStep::Review
            }
        };
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
