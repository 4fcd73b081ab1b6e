use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Raw result of one extraction attempt. Every field defaults to the empty
/// string so consumers never branch on presence, only on emptiness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobListing {
    pub company: String,
    pub position: String,
    pub location: String,
    pub salary: String,
    pub description: String,
    pub source_url: String,
    pub external_id: String,
    /// Set only when the whole extraction failed unexpectedly. Field misses
    /// are not errors.
    pub extraction_error: Option<String>,
}

impl JobListing {
    /// True when no field carried any content, i.e. the page yielded nothing.
    pub fn is_empty(&self) -> bool {
        self.company.is_empty()
            && self.position.is_empty()
            && self.location.is_empty()
            && self.salary.is_empty()
            && self.description.is_empty()
    }
}

/// The unit of persistence: a listing plus the user-supplied tracking fields.
/// `date_added` is deliberately absent here; it is assigned at submission
/// time, not at extraction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub company: String,
    pub position: String,
    pub location: String,
    pub salary: String,
    pub description: String,
    pub job_url: String,
    pub external_id: String,
    pub status: JobStatus,
    pub notes: String,
}

impl JobRecord {
    pub fn from_listing(listing: JobListing) -> Self {
        Self {
            company: listing.company,
            position: listing.position,
            location: listing.location,
            salary: listing.salary,
            description: listing.description,
            job_url: listing.source_url,
            external_id: listing.external_id,
            status: JobStatus::default(),
            notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Saved,
    Applied,
    Interviewing,
    Offer,
    Rejected,
}

impl JobStatus {
    /// The select option name used in the destination database.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Saved => "Saved",
            JobStatus::Applied => "Applied",
            JobStatus::Interviewing => "Interviewing",
            JobStatus::Offer => "Offer",
            JobStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "saved" => Ok(JobStatus::Saved),
            "applied" => Ok(JobStatus::Applied),
            "interviewing" => Ok(JobStatus::Interviewing),
            "offer" => Ok(JobStatus::Offer),
            "rejected" => Ok(JobStatus::Rejected),
            _ => Err(anyhow!(
                "Unknown status '{}'. Available: saved, applied, interviewing, offer, rejected",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_defaults_are_empty_strings() {
        let listing = JobListing::default();
        assert!(listing.is_empty());
        assert_eq!(listing.company, "");
        assert_eq!(listing.external_id, "");
        assert!(listing.extraction_error.is_none());
    }

    #[test]
    fn test_listing_with_any_field_is_not_empty() {
        let listing = JobListing {
            salary: "$90k".to_string(),
            ..Default::default()
        };
        assert!(!listing.is_empty());
    }

    #[test]
    fn test_record_from_listing_copies_fields() {
        let listing = JobListing {
            company: "Acme".to_string(),
            position: "Engineer".to_string(),
            source_url: "https://x/1".to_string(),
            external_id: "123".to_string(),
            ..Default::default()
        };
        let record = JobRecord::from_listing(listing);
        assert_eq!(record.company, "Acme");
        assert_eq!(record.job_url, "https://x/1");
        assert_eq!(record.external_id, "123");
        assert_eq!(record.status, JobStatus::Saved);
        assert_eq!(record.notes, "");
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            JobStatus::Saved,
            JobStatus::Applied,
            JobStatus::Interviewing,
            JobStatus::Offer,
            JobStatus::Rejected,
        ] {
            let parsed: JobStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        let status: JobStatus = "APPLIED".parse().unwrap();
        assert_eq!(status, JobStatus::Applied);
        assert!("ghosted".parse::<JobStatus>().is_err());
    }
}
