//! Notion REST client plus the runtime-discovered database schema and its
//! process-wide cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

const NOTION_API_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Schemas are user-editable at any time; an hour is long enough to cover a
/// submission burst and short enough to pick up column renames.
pub const SCHEMA_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Property type tags the payload can target. Anything else a user adds to
/// their database maps to `Other` and is never written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Title,
    RichText,
    Url,
    Date,
    Select,
    Number,
    Other,
}

impl PropertyKind {
    fn from_tag(tag: &str) -> PropertyKind {
        match tag {
            "title" => PropertyKind::Title,
            "rich_text" => PropertyKind::RichText,
            "url" => PropertyKind::Url,
            "date" => PropertyKind::Date,
            "select" => PropertyKind::Select,
            "number" => PropertyKind::Number,
            _ => PropertyKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKind::Title => "title",
            PropertyKind::RichText => "rich_text",
            PropertyKind::Url => "url",
            PropertyKind::Date => "date",
            PropertyKind::Select => "select",
            PropertyKind::Number => "number",
            PropertyKind::Other => "other",
        }
    }
}

/// The destination database's property map as discovered at runtime, with a
/// lowercase index built once so case-insensitive lookups are not a re-scan
/// per field.
#[derive(Debug, Clone)]
pub struct ExternalSchema {
    properties: HashMap<String, PropertyKind>,
    lower_index: HashMap<String, String>,
}

impl ExternalSchema {
    pub fn new(properties: impl IntoIterator<Item = (String, PropertyKind)>) -> Self {
        let properties: HashMap<String, PropertyKind> = properties.into_iter().collect();
        let lower_index = properties
            .keys()
            .map(|name| (name.to_lowercase(), name.clone()))
            .collect();
        Self {
            properties,
            lower_index,
        }
    }

    pub fn kind_of(&self, name: &str) -> Option<PropertyKind> {
        self.properties.get(name).copied()
    }

    /// Map an abstract field name to the database's actual property name:
    /// exact match, then case-insensitive, then the logical name verbatim.
    /// The verbatim fallback means the later type check finds nothing and
    /// the field is dropped instead of failing the submission.
    pub fn resolve_property(&self, logical_name: &str) -> String {
        if self.properties.contains_key(logical_name) {
            return logical_name.to_string();
        }
        if let Some(actual) = self.lower_index.get(&logical_name.to_lowercase()) {
            return actual.clone();
        }
        logical_name.to_string()
    }

    /// The database's title property, whatever the user named it. Notion
    /// guarantees at most one.
    pub fn title_property(&self) -> Option<&str> {
        self.properties
            .iter()
            .find(|(_, kind)| **kind == PropertyKind::Title)
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, PropertyKind)> {
        self.properties.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Time-bounded cache of discovered schemas, keyed by database id. Inserts
/// are idempotent whole-value overwrites; staleness is decided by the caller
/// passing `now` so tests never sleep.
#[derive(Debug)]
pub struct SchemaCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

#[derive(Debug)]
struct CacheEntry {
    schema: ExternalSchema,
    cached_at: Instant,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::with_ttl(SCHEMA_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, database_id: &str, now: Instant) -> Option<&ExternalSchema> {
        let entry = self.entries.get(database_id)?;
        if now.duration_since(entry.cached_at) < self.ttl {
            Some(&entry.schema)
        } else {
            None
        }
    }

    pub fn insert(&mut self, database_id: &str, schema: ExternalSchema, now: Instant) {
        self.entries.insert(
            database_id.to_string(),
            CacheEntry {
                schema,
                cached_at: now,
            },
        );
    }

    pub fn invalidate(&mut self, database_id: &str) {
        self.entries.remove(database_id);
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

/// The three operations the submission pipeline needs from the record store.
/// The coordinator depends on this seam; tests substitute an in-memory fake.
pub trait JobStore {
    fn describe_database(&self, database_id: &str) -> Result<ExternalSchema>;
    fn page_exists(&self, database_id: &str, property: &str, external_id: &str) -> Result<bool>;
    fn create_page(&self, database_id: &str, properties: Value) -> Result<Value>;
}

#[derive(Debug)]
pub struct NotionClient {
    token: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct DescribeResponse {
    properties: HashMap<String, PropertyDef>,
}

#[derive(Debug, Deserialize)]
struct PropertyDef {
    #[serde(rename = "type")]
    type_tag: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Value>,
}

impl NotionClient {
    pub fn new(token: String) -> Self {
        Self {
            token,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn get(&self, path: &str) -> reqwest::blocking::RequestBuilder {
        self.client
            .get(format!("{NOTION_API_URL}{path}"))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    fn post(&self, path: &str) -> reqwest::blocking::RequestBuilder {
        self.client
            .post(format!("{NOTION_API_URL}{path}"))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    /// Surface the server's own message verbatim; the status alone is
    /// useless for schema and permission mistakes.
    fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message")?.as_str().map(String::from))
            .unwrap_or(body);
        Err(anyhow!("Notion API error ({status}): {message}"))
    }
}

impl JobStore for NotionClient {
    fn describe_database(&self, database_id: &str) -> Result<ExternalSchema> {
        debug!(database_id, "describing database");
        let response = self
            .get(&format!("/databases/{database_id}"))
            .send()
            .context("Failed to reach the Notion API")?;
        let described: DescribeResponse = Self::check(response)?
            .json()
            .context("Failed to parse the database description")?;

        Ok(ExternalSchema::new(described.properties.into_iter().map(
            |(name, def)| (name, PropertyKind::from_tag(&def.type_tag)),
        )))
    }

    fn page_exists(&self, database_id: &str, property: &str, external_id: &str) -> Result<bool> {
        debug!(database_id, property, external_id, "querying for existing page");
        let filter = json!({
            "filter": {
                "property": property,
                "rich_text": { "equals": external_id }
            }
        });
        let response = self
            .post(&format!("/databases/{database_id}/query"))
            .json(&filter)
            .send()
            .context("Failed to reach the Notion API")?;
        let queried: QueryResponse = Self::check(response)?
            .json()
            .context("Failed to parse the query response")?;
        Ok(!queried.results.is_empty())
    }

    fn create_page(&self, database_id: &str, properties: Value) -> Result<Value> {
        debug!(database_id, "creating page");
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": properties
        });
        let response = self
            .post("/pages")
            .json(&body)
            .send()
            .context("Failed to reach the Notion API")?;
        Self::check(response)?
            .json()
            .context("Failed to parse the create response")
    }
}
