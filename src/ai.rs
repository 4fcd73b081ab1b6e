//! Optional enrichment of a captured listing. The provider speaks the
//! OpenAI-compatible chat completions API, which covers a local LM Studio
//! server as well as hosted endpoints. Enhancement failures never abort a
//! submission; the caller skips the enrichment and moves on.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub trait AiProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
    #[allow(dead_code)]
    fn model_name(&self) -> &str;
}

#[derive(Debug)]
pub struct OpenAiCompatProvider {
    base_url: String,
    api_key: Option<String>,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl OpenAiCompatProvider {
    /// `base_url` is the API root, e.g. `http://localhost:1234/v1` for LM
    /// Studio. Local servers accept any key, so none is required.
    pub fn new(base_url: String, model_id: String) -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").ok();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model_id,
            client: reqwest::blocking::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl AiProvider for OpenAiCompatProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: self.model_id.clone(),
            max_tokens,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder
            .json(&request)
            .send()
            .context("Failed to reach the AI endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "AI request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: ChatResponse = response
            .json()
            .context("Failed to parse the AI response")?;

        api_response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow!("No choices in AI response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

/// Structured summary the enhancement step produces from a description.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AiNotes {
    pub title: String,
    pub salary: String,
    pub technical_stack: String,
    pub location: String,
    pub summary: Vec<String>,
}

impl AiNotes {
    /// Serialized form stored in the record's notes field.
    pub fn to_notes_text(&self) -> String {
        let mut text = String::from("AI summary\n");
        if !self.title.is_empty() {
            text.push_str(&format!("Title: {}\n", self.title));
        }
        if !self.salary.is_empty() {
            text.push_str(&format!("Salary: {}\n", self.salary));
        }
        if !self.technical_stack.is_empty() {
            text.push_str(&format!("Stack: {}\n", self.technical_stack));
        }
        if !self.location.is_empty() {
            text.push_str(&format!("Location: {}\n", self.location));
        }
        for point in &self.summary {
            text.push_str(&format!("\u{2022} {}\n", point));
        }
        text.trim_end().to_string()
    }
}

pub fn enhance(provider: &dyn AiProvider, description: &str) -> Result<AiNotes> {
    let prompt = format!(
        "Analyze this job description and summarize it.\n\
        Return EXACTLY in this format with no other text:\n\
        TITLE: <job title>\n\
        SALARY: <salary or empty>\n\
        STACK: <comma-separated technologies>\n\
        LOCATION: <location or empty>\n\
        SUMMARY:\n\
        - <key point>\n\
        - <key point>\n\n\
        Job description:\n{}",
        description
    );

    let response = provider.complete(&prompt, 5000)?;
    Ok(parse_notes(&response))
}

fn parse_notes(response: &str) -> AiNotes {
    let mut notes = AiNotes::default();
    let mut in_summary = false;

    for line in response.lines() {
        let line = line.trim();

        if in_summary {
            if let Some(point) = line.strip_prefix("- ").or_else(|| line.strip_prefix("\u{2022} ")) {
                let point = point.trim();
                if !point.is_empty() {
                    notes.summary.push(point.to_string());
                }
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("TITLE:") {
            notes.title = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("SALARY:") {
            notes.salary = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("STACK:") {
            notes.technical_stack = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("LOCATION:") {
            notes.location = rest.trim().to_string();
        } else if line.starts_with("SUMMARY:") {
            in_summary = true;
        }
    }

    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedProvider {
        response: &'static str,
    }

    impl AiProvider for ScriptedProvider {
        fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
            Ok(self.response.to_string())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn test_enhance_parses_structured_reply() {
        let provider = ScriptedProvider {
            response: "TITLE: Platform Engineer\n\
                       SALARY: $140k - $170k\n\
                       STACK: Rust, Postgres, AWS\n\
                       LOCATION: Remote (US)\n\
                       SUMMARY:\n\
                       - Owns the deploy pipeline\n\
                       - Small team, broad scope\n",
        };
        let notes = enhance(&provider, "some description").unwrap();
        assert_eq!(notes.title, "Platform Engineer");
        assert_eq!(notes.salary, "$140k - $170k");
        assert_eq!(notes.technical_stack, "Rust, Postgres, AWS");
        assert_eq!(notes.location, "Remote (US)");
        assert_eq!(
            notes.summary,
            vec!["Owns the deploy pipeline", "Small team, broad scope"]
        );
    }

    #[test]
    fn test_parse_tolerates_missing_fields() {
        let notes = parse_notes("TITLE: Engineer\nSUMMARY:\n- One point\n");
        assert_eq!(notes.title, "Engineer");
        assert_eq!(notes.salary, "");
        assert_eq!(notes.location, "");
        assert_eq!(notes.summary, vec!["One point"]);
    }

    #[test]
    fn test_parse_ignores_chatter_outside_the_format() {
        let notes = parse_notes(
            "Sure! Here is the summary.\nTITLE: Engineer\nSALARY: $90k\nSUMMARY:\n- Point\nThanks!",
        );
        assert_eq!(notes.title, "Engineer");
        assert_eq!(notes.salary, "$90k");
        assert_eq!(notes.summary, vec!["Point"]);
    }

    #[test]
    fn test_notes_text_serialization() {
        let notes = AiNotes {
            title: "Engineer".to_string(),
            salary: "$90k".to_string(),
            technical_stack: String::new(),
            location: "Remote".to_string(),
            summary: vec!["Point one".to_string()],
        };
        let text = notes.to_notes_text();
        assert_eq!(
            text,
            "AI summary\nTitle: Engineer\nSalary: $90k\nLocation: Remote\n\u{2022} Point one"
        );
    }

    #[test]
    fn test_empty_reply_yields_empty_notes() {
        let notes = parse_notes("");
        assert_eq!(notes.title, "");
        assert!(notes.summary.is_empty());
    }
}
