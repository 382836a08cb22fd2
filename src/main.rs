use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clinotes::config::ensure_database_directory;
use clinotes::content::{PREVIEW_CHARS, load_note_content, preview, save_content};
use clinotes::fhir::{DOCUMENT_REFERENCE, collect_resources, load_json};
use clinotes::medication::MEDICATION_RESOURCE_TYPES;
use clinotes::{
    Config, ConfigBuilder, ContentResolver, Database, DocumentImportSummary, DocumentImporter,
    MedicationImportSummary, MedicationImporter, NoteId, ResolutionSummary, StoredContent,
    logging,
};

/// clinotes - import FHIR clinical notes and medications into SQLite
#[derive(Parser)]
#[command(name = "clinotes")]
#[command(about = "Import FHIR clinical notes and medications into a SQLite database")]
#[command(version)]
struct Cli {
    /// Path to the SQLite database (overrides CLINOTES_DB)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Append log output to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Import DocumentReference resources as notes
    ImportDocuments(ImportDocumentsCommand),
    /// Import Medication, MedicationRequest and MedicationAdministration resources
    ImportMedications(ImportMedicationsCommand),
    /// Fetch the content of notes that only hold a URL reference
    ResolveContent(ResolveContentCommand),
    /// Show a note's content and export resolved binaries
    Show(ShowCommand),
}

#[derive(Parser)]
struct ImportDocumentsCommand {
    /// JSON file holding a resource, an array of resources, or a Bundle
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

#[derive(Parser)]
struct ImportMedicationsCommand {
    /// One or more JSON files holding resources, arrays, or Bundles
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,
}

#[derive(Parser)]
struct ResolveContentCommand {
    /// Per-request timeout in seconds (overrides CLINOTES_HTTP_TIMEOUT_SECS)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Parser)]
struct ShowCommand {
    /// ID of the note to show
    #[arg(value_name = "NOTE_ID")]
    note_id: i64,

    /// Directory that receives exported binary content
    #[arg(long, value_name = "DIR", default_value = "note_content")]
    out: PathBuf,
}

/// Errors caused by the invocation rather than by the data or environment.
#[derive(Debug, thiserror::Error)]
enum UsageError {
    #[error("Input file not found: {0}")]
    MissingInput(PathBuf),

    #[error("Note with ID {0} not found")]
    NoteNotFound(NoteId),
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
fn is_user_error(error: &anyhow::Error) -> bool {
    error.downcast_ref::<UsageError>().is_some()
}

fn run(cli: &Cli) -> Result<()> {
    let config = build_config(cli)?;
    logging::init(&config)?;

    ensure_database_directory(&config.database_path)?;
    let db = Database::open(&config.database_path).with_context(|| {
        format!("Failed to open database: {}", config.database_path.display())
    })?;

    match &cli.command {
        Commands::ImportDocuments(cmd) => {
            let summary = execute_import_documents(&cmd.file, &db)?;
            println!("{summary}");
        }
        Commands::ImportMedications(cmd) => {
            let summary = execute_import_medications(&cmd.files, &db)?;
            println!("{summary}");
        }
        Commands::ResolveContent(_) => {
            let summary = execute_resolve_content(&config, &db)?;
            println!("{summary}");
        }
        Commands::Show(cmd) => execute_show(NoteId::new(cmd.note_id), &cmd.out, &db)?,
    }

    Ok(())
}

/// Layers CLI flags over the environment.
fn build_config(cli: &Cli) -> Result<Config> {
    let mut builder = ConfigBuilder::new();
    if let Some(path) = &cli.db {
        builder = builder.database_path(path);
    }
    if let Some(path) = &cli.log_file {
        builder = builder.log_file(path);
    }
    if let Commands::ResolveContent(ResolveContentCommand {
        timeout: Some(secs),
    }) = &cli.command
    {
        builder = builder.http_timeout(Duration::from_secs(*secs));
    }
    builder.build()
}

/// Reads an input file, failing with a user error when it does not exist.
fn read_input(path: &Path) -> Result<serde_json::Value> {
    if !path.exists() {
        return Err(UsageError::MissingInput(path.to_path_buf()).into());
    }
    load_json(path)
}

fn execute_import_documents(path: &Path, db: &Database) -> Result<DocumentImportSummary> {
    let input = read_input(path)?;
    let resources = collect_resources(input, &[DOCUMENT_REFERENCE]);
    tracing::info!(count = resources.len(), file = %path.display(), "loaded DocumentReference resources");

    Ok(DocumentImporter::new(db).import_batch(resources))
}

/// Loads every file before importing, so an unreadable file aborts the
/// whole run without partial writes.
fn execute_import_medications(paths: &[PathBuf], db: &Database) -> Result<MedicationImportSummary> {
    let mut resources = Vec::new();
    for path in paths {
        let input = read_input(path)?;
        resources.extend(collect_resources(input, &MEDICATION_RESOURCE_TYPES));
    }
    tracing::info!(count = resources.len(), "loaded medication resources");

    Ok(MedicationImporter::new(db).import_resources(resources))
}

fn execute_resolve_content(config: &Config, db: &Database) -> Result<ResolutionSummary> {
    let fetcher = config
        .fetcher_builder()
        .build()
        .context("Failed to create HTTP client")?;

    ContentResolver::new(db, fetcher)
        .resolve_pending()
        .context("Failed to list notes with URL references")
}

fn execute_show(note_id: NoteId, out_dir: &Path, db: &Database) -> Result<()> {
    let content = load_note_content(db.connection(), note_id)?
        .ok_or(UsageError::NoteNotFound(note_id))?;

    println!("Note ID: {}", content.note.id);
    println!(
        "Note Type: {}",
        content.note.note_type.as_deref().unwrap_or("Not specified")
    );
    println!(
        "Content Type: {}",
        content.version.content_type.as_deref().unwrap_or("Not specified")
    );

    match &content.content {
        StoredContent::Empty => println!("\nNo content stored."),
        StoredContent::Pending { url } => {
            println!("Content: URL: {url}");
            println!("Note: This content is a URL reference and has not been fetched.");
        }
        StoredContent::Text(_) => {
            println!("\nContent:");
            println!("{}", preview(&content.content).unwrap_or_default());
        }
        StoredContent::Binary { .. } => {
            match preview(&content.content) {
                Some(text) => println!("\nContent Preview (first {PREVIEW_CHARS} characters):\n{text}"),
                None => println!("\nContent is binary and cannot be displayed directly."),
            }
            if let Some(path) = save_content(&content, out_dir)? {
                println!("\nContent saved to: {}", path.display());
            }
        }
    }

    Ok(())
}
