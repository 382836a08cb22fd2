use std::collections::HashMap;

use anyhow::Result;
use clinotes::content::{FHIR_JSON, load_note_content, preview, save_content};
use clinotes::fhir::{DOCUMENT_REFERENCE, collect_resources};
use clinotes::notes::{find_notes_by_external_id, pending_content};
use clinotes::{
    ContentFetcher, ContentResolver, Database, DocumentImporter, FetchError, NoteId,
    ResolutionSummary, StoredContent,
};
use serde_json::json;
use tempfile::TempDir;

/// In-memory FHIR server keyed by (url, Accept header).
struct StubServer {
    responses: HashMap<(&'static str, &'static str), &'static [u8]>,
}

impl ContentFetcher for StubServer {
    fn fetch(&self, url: &str, accept: &str) -> Result<Vec<u8>, FetchError> {
        self.responses
            .iter()
            .find(|((u, a), _)| *u == url && *a == accept)
            .map(|(_, body)| body.to_vec())
            .ok_or(FetchError::Http { status: 404 })
    }
}

const PDF_URL: &str = "https://fhir.example/Binary/pdf-1";
const HTML_URL: &str = "https://fhir.example/Binary/html-1";
const DEAD_URL: &str = "https://fhir.example/Binary/gone";

fn server() -> StubServer {
    let mut responses: HashMap<(&'static str, &'static str), &'static [u8]> = HashMap::new();
    responses.insert(
        (PDF_URL, FHIR_JSON),
        br#"{"resourceType":"Binary","contentType":"application/pdf"}"#,
    );
    responses.insert((PDF_URL, "application/pdf"), b"%PDF-1.4 report");
    // Metadata endpoint refuses JSON; only the HTML probe succeeds
    responses.insert((HTML_URL, "text/html"), b"<h1>Discharge summary</h1>");
    StubServer { responses }
}

fn import_remote_documents(db: &Database) {
    let input = json!([
        {"resourceType": "DocumentReference", "id": "pdf", "content": [{"attachment": {"url": PDF_URL}}]},
        {"resourceType": "DocumentReference", "id": "html", "content": [{"attachment": {"url": HTML_URL}}]},
        {"resourceType": "DocumentReference", "id": "dead", "content": [{"attachment": {"url": DEAD_URL}}]},
        {"resourceType": "DocumentReference", "id": "inline", "content": [{"attachment": {"data": "aGVsbG8="}}]}
    ]);
    DocumentImporter::new(db).import_batch(collect_resources(input, &[DOCUMENT_REFERENCE]));
}

fn note_id(db: &Database, external_id: &str) -> Result<NoteId> {
    Ok(find_notes_by_external_id(db.connection(), external_id)?[0].id)
}

#[test]
fn test_resolve_pending_replaces_placeholders() -> Result<()> {
    // Arrange
    let db = Database::in_memory()?;
    import_remote_documents(&db);
    assert_eq!(pending_content(db.connection())?.len(), 3);

    // Act
    let summary = ContentResolver::new(&db, server()).resolve_pending()?;

    // Assert
    assert_eq!(
        summary,
        ResolutionSummary {
            pending: 3,
            resolved: 2,
            failed: 1
        }
    );

    let pdf = load_note_content(db.connection(), note_id(&db, "pdf")?)?.unwrap();
    assert_eq!(pdf.version.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(
        pdf.content,
        StoredContent::Binary {
            content_type: "application/pdf".into(),
            bytes: b"%PDF-1.4 report".to_vec()
        }
    );

    let html = load_note_content(db.connection(), note_id(&db, "html")?)?.unwrap();
    assert_eq!(html.version.content_type.as_deref(), Some("text/html"));
    assert_eq!(preview(&html.content).as_deref(), Some("<h1>Discharge summary</h1>"));

    let dead = load_note_content(db.connection(), note_id(&db, "dead")?)?.unwrap();
    assert_eq!(
        dead.content,
        StoredContent::Pending {
            url: DEAD_URL.into()
        }
    );

    Ok(())
}

#[test]
fn test_rerun_only_retries_failures() -> Result<()> {
    let db = Database::in_memory()?;
    import_remote_documents(&db);
    let resolver = ContentResolver::new(&db, server());

    resolver.resolve_pending()?;
    let rerun = resolver.resolve_pending()?;

    assert_eq!(rerun.pending, 1);
    assert_eq!(rerun.resolved, 0);

    let inline = load_note_content(db.connection(), note_id(&db, "inline")?)?.unwrap();
    assert_eq!(inline.content, StoredContent::Text("hello".into()));
    assert_eq!(inline.version.content_type, None);

    Ok(())
}

#[test]
fn test_resolved_content_exports_to_file() -> Result<()> {
    let db = Database::in_memory()?;
    import_remote_documents(&db);
    ContentResolver::new(&db, server()).resolve_pending()?;

    let dir = TempDir::new()?;
    let out = dir.path().join("note_content");
    let id = note_id(&db, "pdf")?;
    let pdf = load_note_content(db.connection(), id)?.unwrap();

    let path = save_content(&pdf, &out)?.unwrap();

    assert_eq!(path.file_name().unwrap().to_string_lossy(), format!("note_{id}.pdf"));
    assert_eq!(std::fs::read(path)?, b"%PDF-1.4 report");
    Ok(())
}
