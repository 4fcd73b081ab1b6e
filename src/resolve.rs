//! Maps the fixed record shape onto whatever properties the destination
//! database actually has. Best effort: a field that cannot be typed safely
//! is omitted, never an error, since users customize their databases freely
//! and one missing column must not sink the submission.

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::models::JobRecord;
use crate::notion::{ExternalSchema, PropertyKind};

/// The destination's hard per-field ceiling for rich text content. Applied
/// at emission time, independent of the normalizer's own bound.
pub const TEXT_FIELD_LIMIT: usize = 2000;

#[derive(Debug)]
pub struct ResolvedPayload {
    pub properties: Value,
    pub warnings: Vec<String>,
}

pub fn build_properties(
    schema: &ExternalSchema,
    record: &JobRecord,
    today: NaiveDate,
) -> Result<ResolvedPayload> {
    let mut props = Map::new();
    let mut warnings = Vec::new();

    // The company joins on the database's title column no matter what the
    // user renamed it to. This is the one field that must land.
    let title_prop = schema
        .title_property()
        .ok_or_else(|| anyhow!("the database has no title property to hold the company name"))?;
    props.insert(
        title_prop.to_string(),
        json!({ "title": [{ "text": { "content": record.company } }] }),
    );

    put_rich_text(&mut props, schema, "Position", &record.position);
    if !record.location.is_empty() {
        put_rich_text(&mut props, schema, "Location", &record.location);
    }
    put_rich_text(
        &mut props,
        schema,
        "Description",
        truncate_chars(&record.description, TEXT_FIELD_LIMIT),
    );
    put_rich_text(
        &mut props,
        schema,
        "Notes",
        truncate_chars(&record.notes, TEXT_FIELD_LIMIT),
    );
    if !record.external_id.is_empty() {
        put_rich_text(&mut props, schema, "ExternalID", &record.external_id);
    }

    let url_prop = schema.resolve_property("URL");
    if schema.kind_of(&url_prop) == Some(PropertyKind::Url) {
        props.insert(url_prop, json!({ "url": record.job_url }));
    }

    let status_prop = schema.resolve_property("Status");
    if schema.kind_of(&status_prop) == Some(PropertyKind::Select) {
        props.insert(
            status_prop,
            json!({ "select": { "name": record.status.as_str() } }),
        );
    }

    let date_prop = schema.resolve_property("Date Added");
    if schema.kind_of(&date_prop) == Some(PropertyKind::Date) {
        props.insert(
            date_prop,
            json!({ "date": { "start": today.format("%Y-%m-%d").to_string() } }),
        );
    }

    if !record.salary.is_empty() {
        let salary_prop = schema.resolve_property("Salary");
        match schema.kind_of(&salary_prop) {
            Some(PropertyKind::RichText) => {
                props.insert(
                    salary_prop,
                    json!({ "rich_text": [{ "text": { "content": record.salary } }] }),
                );
            }
            Some(PropertyKind::Number) => match parse_salary_number(&record.salary) {
                Some(number) => {
                    props.insert(salary_prop, json!({ "number": number }));
                }
                None => {
                    let message = format!(
                        "could not parse salary \"{}\" as a number; field omitted",
                        record.salary
                    );
                    warn!("{message}");
                    warnings.push(message);
                }
            },
            _ => {}
        }
    }

    Ok(ResolvedPayload {
        properties: Value::Object(props),
        warnings,
    })
}

/// Emit a rich text entry only when the resolved property really is rich
/// text; anything else (including no such property) drops the field.
fn put_rich_text(props: &mut Map<String, Value>, schema: &ExternalSchema, logical: &str, content: &str) {
    let name = schema.resolve_property(logical);
    if schema.kind_of(&name) == Some(PropertyKind::RichText) {
        props.insert(name, json!({ "rich_text": [{ "text": { "content": content } }] }));
    }
}

/// Strip everything that is not part of a plain decimal number. A range like
/// "$50,000 - $70,000" keeps its dash and fails the parse on purpose: a
/// made-up midpoint would be worse than no number at all.
fn parse_salary_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let number: f64 = cleaned.parse().ok()?;
    number.is_finite().then_some(number)
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
