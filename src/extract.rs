//! Site-aware field extraction with ordered fallbacks.

use anyhow::Result;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::models::JobListing;
use crate::normalize::normalize;
use crate::selectors::{SALARY_PATTERNS, Site, SiteStrategy};

/// Extract a listing from a fetched page. Missing fields stay empty; only an
/// unexpected failure of the whole pass is reported, via `extraction_error`,
/// with every other field left at its default.
pub fn extract(html: &str, url: &str, site: Site) -> JobListing {
    match try_extract(html, url, site) {
        Ok(listing) => listing,
        Err(e) => JobListing {
            source_url: url.to_string(),
            extraction_error: Some(format!("{e:#}")),
            ..Default::default()
        },
    }
}

fn try_extract(html: &str, url: &str, site: Site) -> Result<JobListing> {
    let doc = Html::parse_document(html);
    let rules = site.strategy();

    let mut listing = JobListing {
        source_url: url.to_string(),
        ..Default::default()
    };

    listing.position = first_text(&doc, rules.position);
    listing.company = first_text(&doc, rules.company);
    listing.location = collapse_spaces(&first_text(&doc, rules.location));
    listing.salary = first_salary(&doc, rules);

    if let Some(fragment) = first_inner_html(&doc, rules.description) {
        listing.description = normalize(&fragment);
    }

    // Sites often bury the pay in the prose instead of a dedicated element.
    if listing.salary.is_empty() && !listing.description.is_empty() {
        listing.salary = salary_from_text(&listing.description)?;
    }

    listing.external_id = external_id_from_url(url, site)?;

    debug!(
        site = %site,
        position = %listing.position,
        company = %listing.company,
        "extraction finished"
    );
    Ok(listing)
}

/// First selector whose element has non-empty trimmed text wins. A selector
/// that fails to parse or matches nothing is skipped, never an error.
fn first_text(doc: &Html, selectors: &[&str]) -> String {
    for sel in selectors {
        let Ok(selector) = Selector::parse(sel) else {
            continue;
        };
        for element in doc.select(&selector) {
            let text = element.text().collect::<Vec<_>>().join(" ");
            let text = text.trim();
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }
    String::new()
}

fn first_salary(doc: &Html, rules: &SiteStrategy) -> String {
    let candidate = first_text(doc, rules.salary);
    if rules.salary_requires_currency && !candidate.contains('$') {
        return String::new();
    }
    candidate
}

/// Inner HTML of the first matching element with any text content. The raw
/// fragment goes to the normalizer, which owns tag handling.
fn first_inner_html(doc: &Html, selectors: &[&str]) -> Option<String> {
    for sel in selectors {
        let Ok(selector) = Selector::parse(sel) else {
            continue;
        };
        for element in doc.select(&selector) {
            let text = element.text().collect::<Vec<_>>().join(" ");
            if !text.trim().is_empty() {
                return Some(element.inner_html());
            }
        }
    }
    None
}

fn salary_from_text(text: &str) -> Result<String> {
    for pattern in SALARY_PATTERNS {
        let re = Regex::new(pattern)?;
        if let Some(found) = re.find(text) {
            return Ok(found.as_str().trim().to_string());
        }
    }
    Ok(String::new())
}

/// Stable listing identifier where the site exposes one in the URL.
fn external_id_from_url(url: &str, site: Site) -> Result<String> {
    let pattern = match site {
        Site::LinkedIn => r"/jobs/view/(\d+)",
        Site::Indeed => r"[?&]jk=([A-Za-z0-9]+)",
        Site::Glassdoor | Site::GoogleJobs => return Ok(String::new()),
    };
    let re = Regex::new(pattern)?;
    let id = re
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    Ok(id)
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINKEDIN_URL: &str = "https://www.linkedin.com/jobs/view/4012345678/";

    fn linkedin_page(body: &str) -> String {
        format!("<html><head><title>Job</title></head><body>{body}</body></html>")
    }

    #[test]
    fn test_first_selector_with_content_wins() {
        let html = linkedin_page(
            r#"<h1 class="top-card-layout__title">Platform Engineer</h1>
               <h1 class="job-details-jobs-unified-top-card__job-title">Stale Title</h1>"#,
        );
        let listing = extract(&html, LINKEDIN_URL, Site::LinkedIn);
        assert_eq!(listing.position, "Platform Engineer");
    }

    #[test]
    fn test_empty_earlier_selector_falls_through_to_later_one() {
        // The higher-priority element exists but is blank; the rule must not
        // stop there.
        let html = linkedin_page(
            r#"<h1 class="top-card-layout__title">   </h1>
               <h1 class="job-details-jobs-unified-top-card__job-title">Backend Engineer</h1>"#,
        );
        let listing = extract(&html, LINKEDIN_URL, Site::LinkedIn);
        assert_eq!(listing.position, "Backend Engineer");
    }

    #[test]
    fn test_missing_fields_stay_empty_without_error() {
        let html = linkedin_page(r#"<h1 class="top-card-layout__title">Engineer</h1>"#);
        let listing = extract(&html, LINKEDIN_URL, Site::LinkedIn);
        assert_eq!(listing.position, "Engineer");
        assert_eq!(listing.company, "");
        assert_eq!(listing.salary, "");
        assert!(listing.extraction_error.is_none());
    }

    #[test]
    fn test_location_whitespace_collapsed() {
        let html = linkedin_page(
            r#"<span class="topcard__flavor--bullet">  Salt Lake City,
                 UT   (Remote)  </span>"#,
        );
        let listing = extract(&html, LINKEDIN_URL, Site::LinkedIn);
        assert_eq!(listing.location, "Salt Lake City, UT (Remote)");
    }

    #[test]
    fn test_description_is_normalized() {
        let html = linkedin_page(
            r#"<div class="jobs-description__container">
                 <p>Build services</p><ul><li>Rust</li></ul>
               </div>"#,
        );
        let listing = extract(&html, LINKEDIN_URL, Site::LinkedIn);
        assert_eq!(listing.description, "Build services\n\n\u{2022} Rust");
    }

    #[test]
    fn test_salary_regex_fallback_from_description() {
        let html = linkedin_page(
            r#"<div class="jobs-description__container">
                 <p>Compensation: $120,000 - $150,000 plus equity.</p>
               </div>"#,
        );
        let listing = extract(&html, LINKEDIN_URL, Site::LinkedIn);
        assert_eq!(listing.salary, "$120,000 - $150,000");
    }

    #[test]
    fn test_salary_range_pattern_beats_compact_pattern() {
        let html = linkedin_page(
            r#"<div class="jobs-description__container">
                 <p>Most roles pay $90k but this one is $100k - $130k.</p>
               </div>"#,
        );
        let listing = extract(&html, LINKEDIN_URL, Site::LinkedIn);
        assert_eq!(listing.salary, "$100k - $130k");
    }

    #[test]
    fn test_salary_per_year_pattern() {
        let html = linkedin_page(
            r#"<div class="jobs-description__container">
                 <p>We offer $85,000 per year and full benefits.</p>
               </div>"#,
        );
        let listing = extract(&html, LINKEDIN_URL, Site::LinkedIn);
        assert_eq!(listing.salary, "$85,000 per year");
    }

    #[test]
    fn test_structural_salary_beats_description_fallback() {
        let html = linkedin_page(
            r#"<span class="compensation__salary-range">$140,000/yr - $160,000/yr</span>
               <div class="jobs-description__container"><p>Around $90k.</p></div>"#,
        );
        let listing = extract(&html, LINKEDIN_URL, Site::LinkedIn);
        assert_eq!(listing.salary, "$140,000/yr - $160,000/yr");
    }

    #[test]
    fn test_google_jobs_salary_requires_currency_sign() {
        let html = r#"<html><body>
            <div class="vNEEBe">Data Engineer</div>
            <div data-attrid="subtitle"><span>Full-time</span></div>
        </body></html>"#;
        let listing = extract(
            html,
            "https://www.google.com/search?q=jobs",
            Site::GoogleJobs,
        );
        assert_eq!(listing.position, "Data Engineer");
        assert_eq!(listing.salary, "");
    }

    #[test]
    fn test_indeed_fields_and_external_id() {
        let html = r#"<html><body>
            <h1 class="jobsearch-JobInfoHeader-title">SRE</h1>
            <div class="jobsearch-InlineCompanyRating-companyName">Initech</div>
            <div data-testid="attribute_snippet_compensation">$70 - $80 an hour</div>
            <div id="jobDescriptionText">Keep the pagers quiet.</div>
        </body></html>"#;
        let url = "https://www.indeed.com/viewjob?jk=abc123DEF&from=serp";
        let listing = extract(html, url, Site::Indeed);
        assert_eq!(listing.position, "SRE");
        assert_eq!(listing.company, "Initech");
        assert_eq!(listing.salary, "$70 - $80 an hour");
        assert_eq!(listing.external_id, "abc123DEF");
    }

    #[test]
    fn test_linkedin_external_id_from_url() {
        let html = linkedin_page(r#"<h1 class="top-card-layout__title">Engineer</h1>"#);
        let listing = extract(&html, LINKEDIN_URL, Site::LinkedIn);
        assert_eq!(listing.external_id, "4012345678");
    }

    #[test]
    fn test_glassdoor_has_no_external_id() {
        let html = r#"<html><body>
            <div class="job-title">Analyst</div>
            <div class="employer-name">Umbrella</div>
        </body></html>"#;
        let url = "https://www.glassdoor.com/job-listing/analyst-JV_IC123.htm";
        let listing = extract(html, url, Site::Glassdoor);
        assert_eq!(listing.company, "Umbrella");
        assert_eq!(listing.external_id, "");
    }

    #[test]
    fn test_blank_page_yields_empty_listing() {
        let listing = extract("<html><body></body></html>", LINKEDIN_URL, Site::LinkedIn);
        assert!(listing.is_empty());
        assert_eq!(listing.source_url, LINKEDIN_URL);
        assert!(listing.extraction_error.is_none());
    }
}
