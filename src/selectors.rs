//! Per-site extraction rules. Pure data: adding a site or patching a
//! selector that markup drift broke is an edit here, never in the extractor.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    LinkedIn,
    Indeed,
    Glassdoor,
    GoogleJobs,
}

impl Site {
    /// Resolve the site from the page URL. Returns None for pages we do not
    /// model; the caller decides whether to ask for an explicit `--site`.
    pub fn detect(url: &str) -> Option<Site> {
        if url.contains("linkedin.com/jobs/")
            || url.contains("linkedin.com/job/")
            || (url.contains("linkedin.com") && url.contains("/view/"))
        {
            Some(Site::LinkedIn)
        } else if url.contains("indeed.com/viewjob") || url.contains("indeed.com/job/") {
            Some(Site::Indeed)
        } else if url.contains("glassdoor.com")
            && (url.contains("/job-listing/") || url.contains("/Details/"))
        {
            Some(Site::Glassdoor)
        } else if url.contains("google.com/search") {
            Some(Site::GoogleJobs)
        } else {
            None
        }
    }

    pub fn strategy(&self) -> &'static SiteStrategy {
        match self {
            Site::LinkedIn => &LINKEDIN,
            Site::Indeed => &INDEED,
            Site::Glassdoor => &GLASSDOOR,
            Site::GoogleJobs => &GOOGLE_JOBS,
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Site::LinkedIn => "linkedin",
            Site::Indeed => "indeed",
            Site::Glassdoor => "glassdoor",
            Site::GoogleJobs => "google",
        };
        f.write_str(name)
    }
}

impl FromStr for Site {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linkedin" => Ok(Site::LinkedIn),
            "indeed" => Ok(Site::Indeed),
            "glassdoor" => Ok(Site::Glassdoor),
            "google" | "google-jobs" => Ok(Site::GoogleJobs),
            _ => Err(anyhow!(
                "Unknown site '{}'. Available: linkedin, indeed, glassdoor, google",
                s
            )),
        }
    }
}

/// Ordered selector lists for one site. First selector with non-empty
/// trimmed text wins; later entries are fallbacks for older layouts.
pub struct SiteStrategy {
    pub position: &'static [&'static str],
    pub company: &'static [&'static str],
    pub location: &'static [&'static str],
    pub salary: &'static [&'static str],
    pub description: &'static [&'static str],
    /// Some sites only mark salary up as a generic subtitle span; require a
    /// currency sign before accepting the candidate.
    pub salary_requires_currency: bool,
}

static LINKEDIN: SiteStrategy = SiteStrategy {
    position: &[
        ".top-card-layout__title",                       // standard job page
        ".job-details-jobs-unified-top-card__job-title", // new layout
        "h1.t-24",
        "h1.job-view-title",
        "h1[data-test-job-title]",
    ],
    company: &[
        ".topcard__org-name-link",
        ".job-details-jobs-unified-top-card__company-name",
        r#"a[data-tracking-control-name="public_jobs_topcard-org-name"]"#,
        ".jobs-unified-top-card__company-name",
        r#"a[data-tracking-control-name="public_jobs_topcard_company_name"]"#,
        "a[data-test-job-company-name]",
    ],
    location: &[
        ".topcard__flavor--bullet",
        ".job-details-jobs-unified-top-card__bullet",
        ".jobs-unified-top-card__bullet",
        ".job-details-jobs-unified-top-card__workplace-type", // remote listings
        "span[data-test-job-location]",
        ".jobs-unified-top-card__location",
    ],
    salary: &[
        ".compensation__salary-range",
        ".job-details-jobs-unified-top-card__salary-range",
        ".salary-range-text",
    ],
    description: &[
        ".jobs-description__container",
        ".jobs-description-content__text",
        ".jobs-description",
        ".description__text",
        "[data-test-job-description]",
    ],
    salary_requires_currency: false,
};

static INDEED: SiteStrategy = SiteStrategy {
    position: &[".jobsearch-JobInfoHeader-title"],
    company: &[".jobsearch-InlineCompanyRating-companyName"],
    location: &[".jobsearch-JobInfoHeader-locationText"],
    salary: &[r#"[data-testid="attribute_snippet_compensation"]"#],
    description: &["#jobDescriptionText"],
    salary_requires_currency: false,
};

static GLASSDOOR: SiteStrategy = SiteStrategy {
    position: &[".job-title"],
    company: &[".employer-name"],
    location: &[".location"],
    salary: &[".salary-estimate"],
    description: &[".jobDescriptionContent"],
    salary_requires_currency: false,
};

static GOOGLE_JOBS: SiteStrategy = SiteStrategy {
    position: &[".vNEEBe"],
    company: &[".nJlQNd"],
    location: &[".Qk80Jf"],
    salary: &[r#"[data-attrid="subtitle"] span"#],
    description: &[".HBvzbc"],
    salary_requires_currency: true,
};

/// Last-resort salary patterns, run against the description text when no
/// structural element carried the salary. Strict priority order: ranges
/// first, then per-period amounts, then compact "$90k" forms.
pub const SALARY_PATTERNS: &[&str] = &[
    // $120,000 - $150,000 / $120k-150k / $55.50 – $65 ranges
    r"\$\s?\d{1,3}(?:,\d{3})*(?:\.\d+)?[kK]?\s?(?:-|–|—|to)\s?\$?\s?\d{1,3}(?:,\d{3})*(?:\.\d+)?[kK]?",
    // $120,000 per year / $55/hr / $48.75 an hour
    r"(?i)\$\s?\d{1,3}(?:,\d{3})*(?:\.\d+)?\s?(?:per\s|an\s|a\s|/\s?)(?:year|yr|annum|month|mo|week|wk|hour|hr)",
    // $90k
    r"\$\d{2,3}(?:\.\d+)?[kK]",
];

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_detect_linkedin_url_variants() {
        assert_eq!(
            Site::detect("https://www.linkedin.com/jobs/view/4012345678/"),
            Some(Site::LinkedIn)
        );
        assert_eq!(
            Site::detect("https://www.linkedin.com/job/some-posting"),
            Some(Site::LinkedIn)
        );
        assert_eq!(
            Site::detect("https://linkedin.com/comm/view/4012345678"),
            Some(Site::LinkedIn)
        );
    }

    #[test]
    fn test_detect_other_sites() {
        assert_eq!(
            Site::detect("https://www.indeed.com/viewjob?jk=abc123"),
            Some(Site::Indeed)
        );
        assert_eq!(
            Site::detect("https://www.glassdoor.com/job-listing/engineer-JV_123.htm"),
            Some(Site::Glassdoor)
        );
        assert_eq!(
            Site::detect("https://www.google.com/search?q=engineer+jobs&ibp=htl;jobs"),
            Some(Site::GoogleJobs)
        );
    }

    #[test]
    fn test_detect_rejects_non_job_pages() {
        assert_eq!(Site::detect("https://www.linkedin.com/feed/"), None);
        assert_eq!(Site::detect("https://example.com/careers"), None);
        assert_eq!(Site::detect("https://www.glassdoor.com/Reviews/acme.htm"), None);
    }

    #[test]
    fn test_site_parse_round_trip() {
        for site in [Site::LinkedIn, Site::Indeed, Site::Glassdoor, Site::GoogleJobs] {
            let parsed: Site = site.to_string().parse().unwrap();
            assert_eq!(parsed, site);
        }
        assert!("monster".parse::<Site>().is_err());
    }

    #[test]
    fn test_every_selector_in_every_table_parses() {
        for site in [Site::LinkedIn, Site::Indeed, Site::Glassdoor, Site::GoogleJobs] {
            let strategy = site.strategy();
            for list in [
                strategy.position,
                strategy.company,
                strategy.location,
                strategy.salary,
                strategy.description,
            ] {
                for sel in list {
                    assert!(
                        Selector::parse(sel).is_ok(),
                        "invalid selector for {}: {}",
                        site,
                        sel
                    );
                }
            }
        }
    }

    #[test]
    fn test_every_salary_pattern_compiles() {
        for pattern in SALARY_PATTERNS {
            assert!(regex::Regex::new(pattern).is_ok(), "bad pattern: {}", pattern);
        }
    }
}
