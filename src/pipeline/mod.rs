pub mod import;
pub mod extraction;
pub mod merge;
