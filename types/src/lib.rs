//! Validated domain types shared by the noctua pipeline crates.
//!
//! Raw, possibly-invalid shapes (as decoded from JSON or from a model's
//! structured output) stay private behind `#[serde(try_from = "...")]`
//! boundaries, and the types exported from here are already known-valid
//! by construction.

pub mod budget;
pub mod event;
pub mod proofs;
pub mod recon;
pub mod slug;
pub mod stage;
pub mod test_report;

pub use budget::{Budget, BudgetError, BudgetExceeded};
pub use event::PipelineEvent;
pub use proofs::{EmptyStringError, NonEmptyString};
pub use recon::{
    AntiBot, ApiEndpoint, FormField, Page, PagePurpose, Pagination, ReconConversionError,
    ReconReport, ReconReportWire, SiteType, Strategy,
};
pub use slug::slugify;
pub use stage::{ReasoningEffort, Stage};
pub use test_report::{SchemaError, TestReport, TestReportConversionError, TestReportWire};
