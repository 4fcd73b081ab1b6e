mod ai;
mod config;
mod dedupe;
mod extract;
mod models;
mod normalize;
mod notion;
mod resolve;
mod selectors;
mod submit;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ai::OpenAiCompatProvider;
use config::Settings;
use models::{JobListing, JobRecord};
use notion::{JobStore, NotionClient};
use selectors::Site;
use submit::{Coordinator, SubmitError};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Parser)]
#[command(name = "stash")]
#[command(about = "Capture job listings and file them into a Notion database")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the Notion credential and destination database
    Setup {
        /// Notion integration token (or set NOTION_TOKEN)
        #[arg(long)]
        token: String,

        /// Target database id
        #[arg(long)]
        database_id: String,

        /// Enhance notes with an AI summary of the description
        #[arg(long)]
        enhance_ai: bool,

        /// OpenAI-compatible endpoint for enhancement
        #[arg(long, default_value = config::DEFAULT_AI_BASE_URL)]
        ai_url: String,

        /// Model id for enhancement
        #[arg(long, default_value = config::DEFAULT_AI_MODEL)]
        ai_model: String,
    },

    /// Extract a listing from a page and print it
    Extract {
        /// URL of the listing, or path to a saved HTML file
        input: String,

        /// Site to extract for (linkedin, indeed, glassdoor, google);
        /// detected from the URL when omitted
        #[arg(short, long)]
        site: Option<String>,

        /// Source URL to record when the input is a local file
        #[arg(long)]
        url: Option<String>,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract a listing and file it into the database
    Add {
        /// URL of the listing, or path to a saved HTML file
        input: String,

        /// Site to extract for; detected from the URL when omitted
        #[arg(short, long)]
        site: Option<String>,

        /// Source URL to record when the input is a local file
        #[arg(long)]
        url: Option<String>,

        /// Tracking status (saved, applied, interviewing, offer, rejected)
        #[arg(long, default_value = "saved")]
        status: String,

        /// Free-form notes to store with the record
        #[arg(long)]
        notes: Option<String>,

        /// Submit even if this URL was submitted recently
        #[arg(long)]
        force: bool,

        /// Print the resolved payload without creating the record
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the destination database's discovered schema
    Schema,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stash=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Setup {
            token,
            database_id,
            enhance_ai,
            ai_url,
            ai_model,
        } => {
            let settings = Settings {
                notion_token: token,
                database_id,
                enhance_ai,
                ai_base_url: ai_url,
                ai_model,
            };
            let path = settings.save()?;
            println!("Settings saved to {}", path.display());
        }

        Commands::Extract {
            input,
            site,
            url,
            json,
        } => {
            let (html, page_url) = read_page(&input, url.as_deref())?;
            let site = resolve_site(site.as_deref(), &page_url, &input)?;
            let listing = extract::extract(&html, &page_url, site);

            if let Some(error) = &listing.extraction_error {
                eprintln!("Extraction failed: {error}");
            } else if listing.is_empty() {
                eprintln!("No fields could be extracted; the page layout may have changed.");
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                print_listing(&listing);
            }
        }

        Commands::Add {
            input,
            site,
            url,
            status,
            notes,
            force,
            dry_run,
        } => {
            let settings = Settings::load()?;
            let (html, page_url) = read_page(&input, url.as_deref())?;
            let site = resolve_site(site.as_deref(), &page_url, &input)?;

            let listing = extract::extract(&html, &page_url, site);
            if let Some(error) = &listing.extraction_error {
                return Err(anyhow!(
                    "Extraction failed: {error}. Fix the page input or enter the job manually."
                ));
            }
            if listing.is_empty() {
                eprintln!("Warning: nothing could be extracted from the page; submitting an empty record.");
            }

            let mut record = JobRecord::from_listing(listing);
            record.status = status.parse()?;
            if let Some(notes) = notes {
                record.notes = notes;
            }

            if settings.enhance_ai && !record.description.is_empty() {
                println!("Enhancing notes with AI...");
                let provider = OpenAiCompatProvider::new(
                    settings.ai_base_url.clone(),
                    settings.ai_model.clone(),
                );
                match ai::enhance(&provider, &record.description) {
                    Ok(ai_notes) => {
                        let text = ai_notes.to_notes_text();
                        record.notes = if record.notes.is_empty() {
                            text
                        } else {
                            format!("{}\n\n{}", record.notes, text)
                        };
                    }
                    Err(e) => {
                        eprintln!("AI enhancement failed, continuing without it: {e:#}");
                    }
                }
            }

            let client = NotionClient::new(settings.notion_token.clone());

            if dry_run {
                let schema = client.describe_database(&settings.database_id)?;
                let today = chrono::Local::now().date_naive();
                let payload = resolve::build_properties(&schema, &record, today)?;
                println!("{}", serde_json::to_string_pretty(&payload.properties)?);
                for warning in &payload.warnings {
                    eprintln!("Warning: {warning}");
                }
                println!("\n(Dry run - no record was created)");
                return Ok(());
            }

            let mut coordinator = Coordinator::new(client, settings.database_id.clone());
            match coordinator.submit(&record, force) {
                Ok(outcome) => {
                    for warning in &outcome.warnings {
                        eprintln!("Warning: {warning}");
                    }
                    let label = if record.position.is_empty() {
                        record.company.clone()
                    } else {
                        format!("{} at {}", record.position, record.company)
                    };
                    println!("Added '{label}' to the database.");
                }
                Err(SubmitError::DuplicateUrl { url }) => {
                    println!(
                        "{url} was submitted recently. Re-run with --force to submit it anyway."
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Schema => {
            let settings = Settings::load()?;
            let client = NotionClient::new(settings.notion_token.clone());
            let schema = client.describe_database(&settings.database_id)?;

            let mut rows: Vec<_> = schema.iter().collect();
            rows.sort_by(|a, b| a.0.cmp(b.0));

            println!("{:<32} {}", "PROPERTY", "TYPE");
            println!("{}", "-".repeat(44));
            for (name, kind) in rows {
                println!("{:<32} {}", name, kind.as_str());
            }
        }
    }

    Ok(())
}

fn read_page(input: &str, url_override: Option<&str>) -> Result<(String, String)> {
    if input.starts_with("http://") || input.starts_with("https://") {
        let client = reqwest::blocking::Client::new();
        let response = client
            .get(input)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .with_context(|| format!("Failed to fetch {input}"))?;
        if !response.status().is_success() {
            return Err(anyhow!("Failed to fetch {}: HTTP {}", input, response.status()));
        }
        let html = response.text().context("Failed to read the page body")?;
        Ok((html, url_override.unwrap_or(input).to_string()))
    } else {
        let html = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read page file: {input}"))?;
        Ok((html, url_override.unwrap_or_default().to_string()))
    }
}

fn resolve_site(site_flag: Option<&str>, page_url: &str, input: &str) -> Result<Site> {
    if let Some(name) = site_flag {
        return name.parse();
    }
    Site::detect(page_url).ok_or_else(|| {
        anyhow!(
            "Could not detect the site from '{}'. Pass --site (linkedin, indeed, glassdoor, google).",
            if page_url.is_empty() { input } else { page_url }
        )
    })
}

fn print_listing(listing: &JobListing) {
    println!("Company:   {}", listing.company);
    println!("Position:  {}", listing.position);
    println!("Location:  {}", listing.location);
    println!("Salary:    {}", listing.salary);
    println!("URL:       {}", listing.source_url);
    if !listing.external_id.is_empty() {
        println!("ID:        {}", listing.external_id);
    }
    if !listing.description.is_empty() {
        println!("\n--- Description ---\n{}", listing.description);
    }
}
