//! Domain module - entities and the error taxonomy shared by every component.

pub mod company;
pub mod errors;

// Re-export commonly used items
pub use company::{
    BatchResult, BatchSummary, CompanyOutcome, CompanyRecord, CompanyType, FieldError, Funding,
    OperatingStatus,
};
pub use errors::{RecoverableKind, ScrapeError};
