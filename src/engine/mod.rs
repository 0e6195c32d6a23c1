//! Orchestration core: session lifecycle, pacing, extraction and batching.

pub mod batch;
pub mod fields;
pub mod normalize;
pub mod pacing;
pub mod pipeline;
pub mod search;
pub mod session;
pub mod site;

pub use batch::{BatchRunner, ProgressSink};
pub use fields::{AbsentReason, FieldResult};
pub use normalize::{CurrencyConverter, FixedRateConverter};
pub use pacing::PacingPolicy;
pub use pipeline::CompanyPipeline;
pub use session::{SessionManager, SessionState};
pub use site::SiteProfile;
