//! Name-to-profile resolution via the site's text search.
//!
//! Search results are disambiguated by string similarity against the
//! requested name; a best match below the threshold means the company is
//! treated as not present on the site rather than guessed at.

use tracing::{debug, info};
use url::Url;

use crate::domain::ScrapeError;
use crate::engine::site::SiteProfile;
use crate::infrastructure::browser::BrowserDriver;

/// Minimum normalized similarity for a search hit to count as a match.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Classic edit distance over characters.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Normalized similarity in `[0, 1]`, case-insensitive.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

/// Resolve a company name to its profile URL through the search page.
///
/// Returns `ScrapeError::NotFound` when no hit clears the similarity
/// threshold; driver failures classify as recoverable.
pub async fn resolve_profile_url(
    driver: &dyn BrowserDriver,
    site: &SiteProfile,
    name: &str,
) -> Result<String, ScrapeError> {
    let context = format!("searching for '{name}'");

    let mut search_url = Url::parse(site.base_url)
        .and_then(|base| base.join(site.search.search_path))
        .map_err(|e| {
            ScrapeError::recoverable(
                crate::domain::RecoverableKind::Navigation,
                context.clone(),
                format!("bad search url: {e}"),
            )
        })?;
    search_url
        .query_pairs_mut()
        .append_pair(site.search.query_param, name);

    driver
        .navigate(search_url.as_str())
        .await
        .map_err(|e| ScrapeError::from_driver(e, context.clone()))?;

    let hits = driver
        .find_all(site.search.result_link, Some(site.search.result_name))
        .await
        .map_err(|e| ScrapeError::from_driver(e, context.clone()))?;

    let mut best: Option<(f64, String, String)> = None;
    for hit in hits.into_iter().take(site.search.max_results) {
        let Some(href) = hit.href else { continue };
        let score = similarity(name, &hit.text);
        debug!(company = name, candidate = %hit.text, score, "search hit");
        if best.as_ref().map_or(true, |(s, _, _)| score > *s) {
            best = Some((score, hit.text, href));
        }
    }

    match best {
        Some((score, matched, href)) if score >= SIMILARITY_THRESHOLD => {
            info!(company = name, matched = %matched, score, "resolved profile");
            let absolute = Url::parse(site.base_url)
                .and_then(|base| base.join(&href))
                .map(|u| u.to_string())
                .unwrap_or(href);
            Ok(absolute)
        }
        Some((score, matched, _)) => {
            info!(
                company = name,
                closest = %matched,
                score,
                threshold = SIMILARITY_THRESHOLD,
                "best search hit below threshold"
            );
            Err(ScrapeError::not_found(name))
        }
        None => Err(ScrapeError::not_found(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Acme Inc", "Acme Inc", 1.0)]
    #[case("acme inc", "ACME INC", 1.0)]
    #[case("", "", 1.0)]
    fn identical_names_score_one(#[case] a: &str, #[case] b: &str, #[case] expected: f64) {
        assert!((similarity(a, b) - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn close_names_clear_the_threshold() {
        assert!(similarity("Acme Inc", "Acme Inc.") >= SIMILARITY_THRESHOLD);
        assert!(similarity("Stripe", "Stripe") >= SIMILARITY_THRESHOLD);
    }

    #[test]
    fn unrelated_names_fall_below_the_threshold() {
        assert!(similarity("Acme Inc", "Globex Corporation") < SIMILARITY_THRESHOLD);
        assert!(similarity("GhostCorp", "Initech") < SIMILARITY_THRESHOLD);
    }

    #[test]
    fn levenshtein_handles_empty_and_unicode() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("café", "cafe"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }
}
