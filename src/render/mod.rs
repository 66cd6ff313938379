//! Contract rendering: pt-BR formatting, numbers in words, template dictionary.

pub mod extenso;
pub mod format;
pub mod template;

pub use template::{contract_to_template_data, InstallmentRow, LayerRow, TemplateData};
