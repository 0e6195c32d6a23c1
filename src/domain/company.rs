//! Core entities: one scraped company record and the result of a whole batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ownership structure shown on the profile page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanyType {
    Public,
    Private,
    #[default]
    Unknown,
}

impl CompanyType {
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        if lower.contains("public") {
            Self::Public
        } else if lower.contains("private") {
            Self::Private
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Private => "Private",
            Self::Unknown => "",
        }
    }
}

/// Operating status shown on the profile page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingStatus {
    Active,
    Closed,
    Acquired,
    Ipo,
    #[default]
    Unknown,
}

impl OperatingStatus {
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        if lower.contains("acquired") {
            Self::Acquired
        } else if lower.contains("closed") || lower.contains("out of business") {
            Self::Closed
        } else if lower.contains("ipo") || lower.contains("went public") {
            Self::Ipo
        } else if lower.contains("active") {
            Self::Active
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Closed => "Closed",
            Self::Acquired => "Acquired",
            Self::Ipo => "IPO",
            Self::Unknown => "",
        }
    }
}

/// Total funding normalized into the target currency, keeping the
/// currency code the amount was originally quoted in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funding {
    pub amount: f64,
    pub currency: String,
}

/// One field that could not be extracted, with the reason it failed.
/// A record with entries here is still usable; absence is data too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

/// One output row. `name` is the input key and is always populated;
/// every other field is optional and stays `None` when the page did not
/// yield it, never an empty string masquerading as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub name: String,
    pub legal_name: Option<String>,
    pub description: Option<String>,
    pub funding_total: Option<Funding>,
    pub location: Option<String>,
    pub employee_count_range: Option<String>,
    pub company_type: CompanyType,
    pub website: Option<String>,
    pub founded_year: Option<i32>,
    pub ranking: Option<u32>,
    pub acquisitions_count: Option<u32>,
    pub investments_count: Option<u32>,
    pub exits_count: Option<u32>,
    pub stock_symbol: Option<String>,
    pub operating_status: OperatingStatus,
    pub extraction_errors: Vec<FieldError>,
}

impl CompanyRecord {
    /// CSV column order. Must stay in sync with [`CompanyRecord::csv_row`].
    pub const CSV_HEADERS: [&'static str; 17] = [
        "name",
        "legal_name",
        "description",
        "funding_total",
        "funding_currency",
        "location",
        "employee_count_range",
        "company_type",
        "website",
        "founded_year",
        "ranking",
        "acquisitions_count",
        "investments_count",
        "exits_count",
        "stock_symbol",
        "operating_status",
        "extraction_errors",
    ];

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            legal_name: None,
            description: None,
            funding_total: None,
            location: None,
            employee_count_range: None,
            company_type: CompanyType::Unknown,
            website: None,
            founded_year: None,
            ranking: None,
            acquisitions_count: None,
            investments_count: None,
            exits_count: None,
            stock_symbol: None,
            operating_status: OperatingStatus::Unknown,
            extraction_errors: Vec::new(),
        }
    }

    /// A partial record extracted fine as a whole but lost at least one field.
    pub fn is_partial(&self) -> bool {
        !self.extraction_errors.is_empty()
    }

    /// Serialize to one CSV row. Missing fields become empty cells.
    pub fn csv_row(&self) -> Vec<String> {
        fn opt<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(T::to_string).unwrap_or_default()
        }

        vec![
            self.name.clone(),
            opt(&self.legal_name),
            opt(&self.description),
            self.funding_total
                .as_ref()
                .map(|f| format!("{:.0}", f.amount))
                .unwrap_or_default(),
            self.funding_total
                .as_ref()
                .map(|f| f.currency.clone())
                .unwrap_or_default(),
            opt(&self.location),
            opt(&self.employee_count_range),
            self.company_type.as_str().to_string(),
            opt(&self.website),
            opt(&self.founded_year),
            opt(&self.ranking),
            opt(&self.acquisitions_count),
            opt(&self.investments_count),
            opt(&self.exits_count),
            opt(&self.stock_symbol),
            self.operating_status.as_str().to_string(),
            self.extraction_errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.reason))
                .collect::<Vec<_>>()
                .join("; "),
        ]
    }
}

/// Terminal outcome for one input name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompanyOutcome {
    /// Profile page reached and extracted (possibly with field-level gaps).
    Scraped(CompanyRecord),
    /// No acceptable match on the target site. Never retried.
    NotFound { name: String },
    /// Recoverable failures exhausted the retry budget.
    Failed {
        name: String,
        attempts: u32,
        error: String,
    },
}

impl CompanyOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Scraped(record) => &record.name,
            Self::NotFound { name } | Self::Failed { name, .. } => name,
        }
    }

    pub fn record(&self) -> Option<&CompanyRecord> {
        match self {
            Self::Scraped(record) => Some(record),
            _ => None,
        }
    }
}

/// Aggregate counts over a finished (or aborted) batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    pub not_found: usize,
}

/// Ordered outcomes parallel to the input list, built incrementally by the
/// batch runner and read-only once the batch completes. Partial results are
/// preserved on abort so an interrupted run stays inspectable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub outcomes: Vec<CompanyOutcome>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set when an authentication failure stopped the batch early.
    pub fatal_error: Option<String>,
    /// Set when an operator-initiated abort stopped the batch early.
    pub aborted: bool,
}

impl BatchResult {
    pub fn new() -> Self {
        Self {
            batch_id: Uuid::new_v4().to_string(),
            outcomes: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            fatal_error: None,
            aborted: false,
        }
    }

    pub fn push(&mut self, outcome: CompanyOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.outcomes.len(),
            succeeded: 0,
            partial: 0,
            failed: 0,
            not_found: 0,
        };
        for outcome in &self.outcomes {
            match outcome {
                CompanyOutcome::Scraped(record) if record.is_partial() => summary.partial += 1,
                CompanyOutcome::Scraped(_) => summary.succeeded += 1,
                CompanyOutcome::NotFound { .. } => summary.not_found += 1,
                CompanyOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

impl Default for BatchResult {
    fn default() -> Self {
        Self::new()
    }
}
