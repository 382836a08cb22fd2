use anyhow::Result;
use clinotes::category::list_categories;
use clinotes::fhir::{DOCUMENT_REFERENCE, collect_resources, load_json};
use clinotes::notes::{count_notes, find_notes_by_external_id, get_version};
use clinotes::{Database, DocumentImporter};
use serde_json::json;
use tempfile::TempDir;

fn bundle() -> serde_json::Value {
    json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "entry": [
            {"resource": {
                "resourceType": "DocumentReference",
                "id": "doc-inline",
                "type": {"coding": [{"system": "http://loinc.org", "code": "34117-2", "display": "History and physical note"}]},
                "category": [{"coding": [{"system": "http://loinc.org", "code": "clinical-note", "display": "Clinical Note"}]}],
                "date": "2024-05-02T09:30:00Z",
                "author": [{"reference": "Practitioner/abc123"}],
                "context": {"encounter": [{"reference": "Encounter/enc-1"}]},
                "content": [{"attachment": {"contentType": "text/plain", "data": "UGF0aWVudCBpcyBzdGFibGUu"}}]
            }},
            {"resource": {
                "resourceType": "DocumentReference",
                "id": "doc-remote",
                "category": [{"coding": [{"code": "discharge", "display": "Discharge Summary"}]}],
                "content": [{"attachment": {"contentType": "application/pdf", "url": "https://fhir.example/Binary/77"}}]
            }},
            {"resource": {"resourceType": "Patient", "id": "pat-1"}}
        ]
    })
}

#[test]
fn test_import_bundle_from_file() -> Result<()> {
    // Arrange: write the bundle and open a file-backed database
    let dir = TempDir::new()?;
    let input = dir.path().join("documents.json");
    std::fs::write(&input, bundle().to_string())?;
    let db = Database::open(dir.path().join("healthcare.db"))?;

    // Act
    let resources = collect_resources(load_json(&input)?, &[DOCUMENT_REFERENCE]);
    let summary = DocumentImporter::new(&db).import_batch(resources);

    // Assert
    assert_eq!(summary.categories_added, 2);
    assert_eq!(summary.notes_added, 2);
    assert_eq!(summary.versions_added, 2);
    assert_eq!(summary.failed, 0);

    let inline = &find_notes_by_external_id(db.connection(), "doc-inline")?[0];
    let version = get_version(db.connection(), inline.current_version_id.unwrap())?.unwrap();
    assert_eq!(version.note_text.as_deref(), Some("Patient is stable."));
    assert_eq!(version.practitioner_id.as_deref(), Some("abc123"));
    assert_eq!(inline.encounter_id.as_deref(), Some("enc-1"));
    assert_eq!(inline.note_type.as_deref(), Some("History and physical note"));

    let remote = &find_notes_by_external_id(db.connection(), "doc-remote")?[0];
    let version = get_version(db.connection(), remote.current_version_id.unwrap())?.unwrap();
    assert_eq!(version.note_text.as_deref(), Some("URL: https://fhir.example/Binary/77"));
    assert_eq!(version.content_type, None);

    Ok(())
}

#[test]
fn test_imported_notes_survive_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("healthcare.db");

    {
        let db = Database::open(&db_path)?;
        let resources = collect_resources(bundle(), &[DOCUMENT_REFERENCE]);
        DocumentImporter::new(&db).import_batch(resources);
    }

    let db = Database::open(&db_path)?;
    assert_eq!(count_notes(db.connection())?, 2);
    assert_eq!(list_categories(db.connection())?.len(), 2);

    Ok(())
}

#[test]
fn test_reimport_keeps_categories_but_duplicates_notes() -> Result<()> {
    let db = Database::in_memory()?;
    let importer = DocumentImporter::new(&db);

    let first = importer.import_batch(collect_resources(bundle(), &[DOCUMENT_REFERENCE]));
    let second = importer.import_batch(collect_resources(bundle(), &[DOCUMENT_REFERENCE]));

    assert_eq!(first.categories_added, 2);
    assert_eq!(second.categories_added, 0);
    assert_eq!(list_categories(db.connection())?.len(), 2);
    assert_eq!(count_notes(db.connection())?, 4);
    assert_eq!(find_notes_by_external_id(db.connection(), "doc-inline")?.len(), 2);

    Ok(())
}

#[test]
fn test_single_malformed_document_does_not_block_batch() -> Result<()> {
    let db = Database::in_memory()?;
    let input = json!([
        {"resourceType": "DocumentReference", "id": "a", "content": [{"attachment": {"data": "b2s="}}]},
        {"resourceType": "DocumentReference", "id": "b", "context": {"encounter": ["x"]}},
        {"resourceType": "DocumentReference", "id": "c", "content": [{"attachment": {"data": "b2s="}}]}
    ]);

    let summary = DocumentImporter::new(&db).import_batch(collect_resources(input, &[DOCUMENT_REFERENCE]));

    assert_eq!(summary.notes_added, 2);
    assert_eq!(summary.failed, 1);
    assert!(find_notes_by_external_id(db.connection(), "b")?.is_empty());

    Ok(())
}

#[test]
fn test_wrong_shaped_fields_import_as_null() -> Result<()> {
    // Arrange
    let db = Database::in_memory()?;
    let input = json!({
        "resourceType": "Bundle",
        "entry": [{"resource": {
            "resourceType": "DocumentReference",
            "id": "loose",
            "category": {"coding": [{"code": "note", "display": "Note"}]},
            "author": {"reference": "Practitioner/p1"},
            "date": 20240301,
            "content": [{"attachment": {"url": "https://fhir.example/Binary/9"}}]
        }}]
    });

    // Act
    let summary = DocumentImporter::new(&db).import_batch(collect_resources(input, &[DOCUMENT_REFERENCE]));

    // Assert
    assert_eq!(summary.notes_added, 1);
    assert_eq!(summary.failed, 0);

    let note = &find_notes_by_external_id(db.connection(), "loose")?[0];
    assert_eq!(note.category_id, None);
    assert_eq!(note.note_date.as_deref(), Some("20240301"));
    let version = get_version(db.connection(), note.current_version_id.unwrap())?.unwrap();
    assert_eq!(version.practitioner_id, None);
    assert_eq!(version.note_text.as_deref(), Some("URL: https://fhir.example/Binary/9"));

    Ok(())
}

#[test]
fn test_single_resource_input_is_accepted() -> Result<()> {
    let db = Database::in_memory()?;
    let input = json!({"resourceType": "DocumentReference", "id": "solo"});

    let summary = DocumentImporter::new(&db).import_batch(collect_resources(input, &[DOCUMENT_REFERENCE]));

    assert_eq!(summary.notes_added, 1);
    Ok(())
}
