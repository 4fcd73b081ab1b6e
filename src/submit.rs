//! Single-flight submission pipeline: duplicate checks, schema resolution,
//! persistence. All mutable submission state lives on one owned value
//! constructed at startup, never in module-level globals.

use std::time::Instant;

use chrono::Local;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dedupe::RecentSubmissions;
use crate::models::JobRecord;
use crate::notion::{ExternalSchema, JobStore, SchemaCache};
use crate::resolve::build_properties;

/// Where the coordinator currently is. A richer value than a boolean flag:
/// rejection needs to know that *some* work is active, tests need to know
/// which step ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPhase {
    Idle,
    Checking,
    Resolving,
    Persisting,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("A submission is already in progress. Please wait and retry.")]
    InFlight,
    #[error("{url} was submitted recently. Confirm to submit it again.")]
    DuplicateUrl { url: String },
    #[error("A job with external id \"{id}\" already exists in the database.")]
    DuplicateExternalId { id: String },
    #[error("Failed to read the database schema: {0}")]
    Schema(anyhow::Error),
    #[error("{0}")]
    Resolve(anyhow::Error),
    #[error("The database rejected the record: {message}")]
    Persist { message: String },
}

#[derive(Debug)]
pub struct SubmitOutcome {
    pub page: Value,
    /// Best-effort omissions worth telling the user about (e.g. an
    /// unparseable salary dropped from a number column).
    pub warnings: Vec<String>,
}

pub struct Coordinator<S: JobStore> {
    store: S,
    database_id: String,
    cache: SchemaCache,
    recent: RecentSubmissions,
    phase: SubmitPhase,
}

impl<S: JobStore> Coordinator<S> {
    pub fn new(store: S, database_id: impl Into<String>) -> Self {
        Self {
            store,
            database_id: database_id.into(),
            cache: SchemaCache::new(),
            recent: RecentSubmissions::new(),
            phase: SubmitPhase::Idle,
        }
    }

    pub fn phase(&self) -> SubmitPhase {
        self.phase
    }

    /// Drive one record through checking, resolution, and persistence.
    /// Rejects synchronously while another submission is active; the phase
    /// returns to `Idle` on every exit path.
    pub fn submit(&mut self, record: &JobRecord, force: bool) -> Result<SubmitOutcome, SubmitError> {
        if self.phase != SubmitPhase::Idle {
            debug!("submission rejected: another one is in flight");
            return Err(SubmitError::InFlight);
        }
        self.phase = SubmitPhase::Checking;

        let result = self.run(record, force);
        self.phase = SubmitPhase::Idle;

        if result.is_ok() && !record.job_url.is_empty() {
            self.recent.remember(&record.job_url);
        }
        result
    }

    fn run(&mut self, record: &JobRecord, force: bool) -> Result<SubmitOutcome, SubmitError> {
        if self.recent.should_confirm(&record.job_url, force) {
            info!(url = %record.job_url, "recently submitted, asking for confirmation");
            return Err(SubmitError::DuplicateUrl {
                url: record.job_url.clone(),
            });
        }
        if force && self.recent.contains(&record.job_url) {
            info!(url = %record.job_url, "forcing resubmission of a recent URL");
        }

        // Same canonical listing, not just a resubmitted URL: fatal, no
        // override.
        if !record.external_id.is_empty() && self.exists_remotely(&record.external_id) {
            return Err(SubmitError::DuplicateExternalId {
                id: record.external_id.clone(),
            });
        }

        self.phase = SubmitPhase::Resolving;
        let schema = self.schema().map_err(SubmitError::Schema)?;
        let today = Local::now().date_naive();
        let payload = build_properties(&schema, record, today).map_err(SubmitError::Resolve)?;

        self.phase = SubmitPhase::Persisting;
        let page = self
            .store
            .create_page(&self.database_id, payload.properties)
            .map_err(|e| SubmitError::Persist {
                message: format!("{e:#}"),
            })?;

        info!(url = %record.job_url, "record created");
        Ok(SubmitOutcome {
            page,
            warnings: payload.warnings,
        })
    }

    /// Remote existence check by stable identifier. Conservative on
    /// failure: a transient query fault must never block a legitimate
    /// submission, so any error counts as "not found".
    fn exists_remotely(&mut self, external_id: &str) -> bool {
        let result = self.schema().and_then(|schema| {
            let property = schema.resolve_property("ExternalID");
            self.store
                .page_exists(&self.database_id, &property, external_id)
        });
        match result {
            Ok(found) => {
                debug!(external_id, found, "existence check finished");
                found
            }
            Err(e) => {
                warn!("existence check failed, continuing with submission: {e:#}");
                false
            }
        }
    }

    fn schema(&mut self) -> anyhow::Result<ExternalSchema> {
        let now = Instant::now();
        if let Some(schema) = self.cache.get(&self.database_id, now) {
            debug!("using cached database schema");
            return Ok(schema.clone());
        }
        debug!("fetching fresh database schema");
        let schema = self.store.describe_database(&self.database_id)?;
        self.cache.insert(&self.database_id, schema.clone(), now);
        Ok(schema)
    }
}
