//! Field extraction: declarative descriptors and the one extractor routine.
//!
//! A descriptor says how to locate a field (primary selector plus
//! fallbacks), how to normalize it, and whether the record is usable
//! without it. The extractor itself has no per-field branching and never
//! errors on absence: `Absent` with a reason is a normal outcome.

use tracing::debug;

use crate::domain::{CompanyRecord, CompanyType, OperatingStatus};
use crate::engine::normalize::{
    normalize_funding, parse_count, parse_employee_range, parse_founded_year, CurrencyConverter,
};
use crate::infrastructure::browser::{BrowserDriver, DriverError};

/// One way of locating a field on the page. `attr: None` reads text
/// content, `Some` reads the named attribute.
#[derive(Debug, Clone, Copy)]
pub struct Locator {
    pub selector: &'static str,
    pub attr: Option<&'static str>,
}

impl Locator {
    const fn text(selector: &'static str) -> Self {
        Self {
            selector,
            attr: None,
        }
    }

    const fn attr(selector: &'static str, attr: &'static str) -> Self {
        Self {
            selector,
            attr: Some(attr),
        }
    }
}

/// Why a field came back empty. Distinguished so the report can separate
/// "the page changed" from "the value changed shape" from "we were slow".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsentReason {
    SelectorNotFound,
    Malformed(String),
    Timeout,
}

impl AbsentReason {
    pub fn describe(&self) -> String {
        match self {
            Self::SelectorNotFound => "selector not found".to_string(),
            Self::Malformed(reason) => format!("malformed value: {reason}"),
            Self::Timeout => "timed out".to_string(),
        }
    }
}

/// Outcome of extracting one field. `Present` carries the raw text that was
/// accepted; the normalized value has already been written to the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldResult {
    Present(String),
    Absent(AbsentReason),
}

type ApplyFn = fn(&mut CompanyRecord, &str, &dyn CurrencyConverter) -> Result<(), String>;

pub struct FieldDescriptor {
    pub name: &'static str,
    /// Tried top to bottom; first selector that yields a value wins.
    pub locators: &'static [Locator],
    /// A record without a critical field is not usable; its absence is
    /// escalated by the pipeline. Optional fields just log.
    pub critical: bool,
    apply: ApplyFn,
}

/// Extract one field from the current page. Never fails for a missing
/// field: exhausting every locator yields `Absent(SelectorNotFound)`, a
/// value the normalizer rejects yields `Absent(Malformed)`, and a driver
/// timeout yields `Absent(Timeout)`.
pub async fn extract(
    driver: &dyn BrowserDriver,
    descriptor: &FieldDescriptor,
    record: &mut CompanyRecord,
    fx: &dyn CurrencyConverter,
) -> FieldResult {
    for locator in descriptor.locators {
        let found = match locator.attr {
            Some(attr) => driver.find_attr(locator.selector, attr).await,
            None => driver.find_text(locator.selector).await,
        };

        match found {
            Ok(Some(raw)) if !raw.trim().is_empty() => {
                return match (descriptor.apply)(record, raw.trim(), fx) {
                    Ok(()) => FieldResult::Present(raw.trim().to_string()),
                    Err(reason) => {
                        debug!(field = descriptor.name, %reason, "malformed field value");
                        FieldResult::Absent(AbsentReason::Malformed(reason))
                    }
                };
            }
            Ok(_) => continue,
            Err(DriverError::Timeout { .. }) => {
                return FieldResult::Absent(AbsentReason::Timeout);
            }
            Err(e) => {
                debug!(field = descriptor.name, selector = locator.selector, error = %e,
                    "locator failed, trying fallback");
                continue;
            }
        }
    }
    FieldResult::Absent(AbsentReason::SelectorNotFound)
}

/// The company name as rendered on the profile page. Critical: a page
/// without it is stale or not a profile at all.
pub static PROFILE_NAME: FieldDescriptor = FieldDescriptor {
    name: "name",
    locators: &[
        Locator::text("h1.profile-name"),
        Locator::text(".profile-header h1"),
    ],
    critical: true,
    apply: |record, raw, _| {
        record.name = raw.to_string();
        Ok(())
    },
};

/// Every tracked attribute, in output-column order. Locator fallbacks come
/// from observed page variants; keeping them here means selector churn on
/// the site is a data edit.
pub static TRACKED_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        name: "legal_name",
        locators: &[
            Locator::text("blob-formatter span"),
            Locator::text(".legal-name span"),
        ],
        critical: false,
        apply: |record, raw, _| {
            record.legal_name = Some(raw.to_string());
            Ok(())
        },
    },
    FieldDescriptor {
        name: "description",
        locators: &[
            Locator::text("description-card .description"),
            Locator::text(".description"),
        ],
        critical: false,
        apply: |record, raw, _| {
            record.description = Some(raw.to_string());
            Ok(())
        },
    },
    FieldDescriptor {
        name: "funding_total",
        locators: &[
            Locator::attr("span.field-type-money.funding-total", "title"),
            Locator::text("span.field-type-money.funding-total"),
            Locator::text(".funding-total span.field-type-money"),
            Locator::text("span.field-type-money"),
        ],
        critical: false,
        apply: |record, raw, fx| {
            record.funding_total = Some(normalize_funding(raw, fx)?);
            Ok(())
        },
    },
    FieldDescriptor {
        name: "location",
        locators: &[
            Locator::text("li.location .field-formatter"),
            Locator::text(".location-links"),
            Locator::text("li.icon-location span"),
        ],
        critical: false,
        apply: |record, raw, _| {
            record.location = Some(raw.to_string());
            Ok(())
        },
    },
    FieldDescriptor {
        name: "employee_count_range",
        locators: &[
            Locator::text("li.employees .field-formatter"),
            Locator::text(".num-employees .field-formatter"),
        ],
        critical: false,
        apply: |record, raw, _| {
            record.employee_count_range = Some(parse_employee_range(raw)?);
            Ok(())
        },
    },
    FieldDescriptor {
        name: "company_type",
        locators: &[
            Locator::text("li.company-type .field-formatter"),
            Locator::text(".company-type span"),
        ],
        critical: false,
        apply: |record, raw, _| {
            record.company_type = CompanyType::parse(raw);
            Ok(())
        },
    },
    FieldDescriptor {
        name: "website",
        locators: &[
            Locator::attr("li.website a", "href"),
            Locator::attr(".website-link a", "href"),
        ],
        critical: false,
        apply: |record, raw, _| {
            record.website = Some(raw.to_string());
            Ok(())
        },
    },
    FieldDescriptor {
        name: "founded_year",
        locators: &[
            Locator::text("span.field-type-date_precision"),
            Locator::text("li.founded-date .field-formatter"),
        ],
        critical: false,
        apply: |record, raw, _| {
            record.founded_year = Some(parse_founded_year(raw)?);
            Ok(())
        },
    },
    FieldDescriptor {
        name: "ranking",
        locators: &[
            Locator::text("span.rank-number"),
            Locator::text(".ranking .field-type-integer"),
        ],
        critical: false,
        apply: |record, raw, _| {
            record.ranking = Some(parse_count(raw.trim_start_matches(['#', ' '].as_ref()))?);
            Ok(())
        },
    },
    FieldDescriptor {
        name: "acquisitions_count",
        locators: &[
            Locator::text("a.acquisitions span.field-type-integer"),
            Locator::text("li.acquisitions .field-type-integer"),
        ],
        critical: false,
        apply: |record, raw, _| {
            record.acquisitions_count = Some(parse_count(raw)?);
            Ok(())
        },
    },
    FieldDescriptor {
        name: "investments_count",
        locators: &[
            Locator::text("a.investments span.field-type-integer"),
            Locator::text("li.investments .field-type-integer"),
        ],
        critical: false,
        apply: |record, raw, _| {
            record.investments_count = Some(parse_count(raw)?);
            Ok(())
        },
    },
    FieldDescriptor {
        name: "exits_count",
        locators: &[
            Locator::text("a.exits span.field-type-integer"),
            Locator::text("li.exits .field-type-integer"),
        ],
        critical: false,
        apply: |record, raw, _| {
            record.exits_count = Some(parse_count(raw)?);
            Ok(())
        },
    },
    FieldDescriptor {
        name: "stock_symbol",
        locators: &[
            Locator::attr("link-formatter a", "title"),
            Locator::text("li.stock-symbol a"),
        ],
        critical: false,
        apply: |record, raw, _| {
            record.stock_symbol = Some(raw.to_string());
            Ok(())
        },
    },
    FieldDescriptor {
        name: "operating_status",
        locators: &[
            Locator::text("span.field-type-enum.operating-status"),
            Locator::text("span.field-type-enum"),
        ],
        critical: false,
        apply: |record, raw, _| {
            record.operating_status = OperatingStatus::parse(raw);
            Ok(())
        },
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_fields_cover_every_optional_record_attribute() {
        let names: Vec<_> = TRACKED_FIELDS.iter().map(|d| d.name).collect();
        for expected in [
            "legal_name",
            "description",
            "funding_total",
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
        ] {
            assert!(names.contains(&expected), "missing descriptor: {expected}");
        }
        assert!(PROFILE_NAME.critical);
        assert!(TRACKED_FIELDS.iter().all(|d| !d.critical));
    }

    #[test]
    fn every_descriptor_has_at_least_one_locator() {
        for descriptor in TRACKED_FIELDS {
            assert!(
                !descriptor.locators.is_empty(),
                "{} has no locators",
                descriptor.name
            );
        }
    }
}
