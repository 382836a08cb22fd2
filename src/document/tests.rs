use super::*;
use crate::category::list_categories;
use crate::models::NoteVersion;
use crate::notes::{count_notes, find_notes_by_external_id, get_note, get_version};
use serde_json::json;

fn parse(value: Value) -> DocumentReference {
    serde_json::from_value(value).unwrap()
}

fn full_document() -> Value {
    json!({
        "resourceType": "DocumentReference",
        "id": "doc-1",
        "type": {"coding": [{"code": "11506-3", "display": "Progress note"}]},
        "category": [{"coding": [{"system": "http://loinc.org", "code": "clinical-note", "display": "Clinical Note"}]}],
        "date": "2024-03-01T10:00:00Z",
        "author": [{"reference": "Practitioner/abc123"}],
        "context": {"encounter": [{"reference": "Encounter/enc-9"}]},
        "content": [{"attachment": {"contentType": "text/plain", "data": "SGVsbG8gd29ybGQ="}}]
    })
}

fn version_of(db: &Database, imported: ImportedNote) -> NoteVersion {
    get_version(db.connection(), imported.version_id)
        .unwrap()
        .expect("version should exist")
}

#[test]
fn extract_note_maps_every_field() {
    let record = extract_note(&parse(full_document()));

    assert_eq!(
        record,
        NoteRecord {
            external_id: Some("doc-1".into()),
            category_code: Some("clinical-note".into()),
            note_type: Some("Progress note".into()),
            note_type_code: Some("11506-3".into()),
            encounter_id: Some("enc-9".into()),
            note_date: Some("2024-03-01T10:00:00Z".into()),
            note_text: Some("Hello world".into()),
            practitioner_id: Some("abc123".into()),
        }
    );
}

#[test]
fn extract_note_of_empty_document_is_all_none() {
    let record = extract_note(&parse(json!({"resourceType": "DocumentReference"})));
    assert_eq!(record, NoteRecord::default());
}

#[test]
fn references_without_expected_prefix_pass_through() {
    let record = extract_note(&parse(json!({
        "author": [{"reference": "urn:uuid:1234"}],
        "context": {"encounter": [{"reference": "enc-raw"}]}
    })));

    assert_eq!(record.practitioner_id.as_deref(), Some("urn:uuid:1234"));
    assert_eq!(record.encounter_id.as_deref(), Some("enc-raw"));
}

#[test]
fn r5_context_encounter_is_stripped() {
    let record = extract_note(&parse(json!({
        "context": [{"reference": "Encounter/enc-5"}]
    })));
    assert_eq!(record.encounter_id.as_deref(), Some("enc-5"));
}

#[test]
fn url_attachment_becomes_placeholder() {
    let record = extract_note(&parse(json!({
        "content": [{"attachment": {"url": "https://fhir.example/Binary/42"}}]
    })));
    assert_eq!(record.note_text.as_deref(), Some("URL: https://fhir.example/Binary/42"));
}

#[test]
fn inline_data_wins_over_url() {
    let record = extract_note(&parse(json!({
        "content": [{"attachment": {"data": "aGk=", "url": "https://fhir.example/Binary/1"}}]
    })));
    assert_eq!(record.note_text.as_deref(), Some("hi"));
}

#[test]
fn undecodable_data_is_stored_raw() {
    let record = extract_note(&parse(json!({
        "content": [{"attachment": {"data": "not base64 !!"}}]
    })));
    assert_eq!(record.note_text.as_deref(), Some("not base64 !!"));
}

#[test]
fn decode_inline_data_classifies_failures() {
    assert_eq!(decode_inline_data("aGk=").unwrap(), "hi");
    assert!(matches!(
        decode_inline_data("%%%"),
        Err(DecodeFailure::Base64(_))
    ));
    // 0xff 0xfe is valid base64 but not UTF-8
    assert!(matches!(decode_inline_data("//4="), Err(DecodeFailure::Utf8(_))));
}

#[test]
fn attachment_without_data_or_url_has_no_text() {
    let record = extract_note(&parse(json!({
        "content": [{"attachment": {"contentType": "text/plain"}}]
    })));
    assert_eq!(record.note_text, None);
}

#[test]
fn import_document_writes_note_and_first_version() {
    let db = Database::in_memory().unwrap();
    let importer = DocumentImporter::new(&db);
    let doc = parse(full_document());

    CategoryNormalizer::new(&db).import_categories([&doc]).unwrap();
    let imported = importer.import_document(&doc).unwrap();

    let note = get_note(db.connection(), imported.note_id).unwrap().unwrap();
    assert!(note.category_id.is_some());
    assert_eq!(note.current_version_id, Some(imported.version_id));
    assert_eq!(note.encounter_id.as_deref(), Some("enc-9"));

    let version = version_of(&db, imported);
    assert_eq!(version.version_number, 1);
    assert_eq!(version.note_text.as_deref(), Some("Hello world"));
    assert_eq!(version.practitioner_id.as_deref(), Some("abc123"));
    assert_eq!(version.content_type, None);
}

#[test]
fn unknown_category_leaves_category_null() {
    let db = Database::in_memory().unwrap();
    let doc = parse(json!({
        "id": "doc-1",
        "category": [{"coding": [{"code": "unregistered"}]}]
    }));

    let imported = DocumentImporter::new(&db).import_document(&doc).unwrap();
    let note = get_note(db.connection(), imported.note_id).unwrap().unwrap();
    assert_eq!(note.category_id, None);
}

#[test]
fn document_without_content_still_gets_a_version() {
    let db = Database::in_memory().unwrap();
    let imported = DocumentImporter::new(&db)
        .import_document(&parse(json!({"id": "doc-1"})))
        .unwrap();

    let version = version_of(&db, imported);
    assert_eq!(version.note_text, None);
}

#[test]
fn reimport_creates_duplicate_notes() {
    let db = Database::in_memory().unwrap();
    let importer = DocumentImporter::new(&db);

    importer.import_batch(vec![full_document()]);
    let summary = importer.import_batch(vec![full_document()]);

    assert_eq!(summary.notes_added, 1);
    assert_eq!(summary.categories_added, 0);
    assert_eq!(find_notes_by_external_id(db.connection(), "doc-1").unwrap().len(), 2);
    assert_eq!(list_categories(db.connection()).unwrap().len(), 1);
}

#[test]
fn document_with_unreadable_encounter_fails_alone() {
    let db = Database::in_memory().unwrap();
    let resources = vec![
        json!({"resourceType": "DocumentReference", "id": "first"}),
        json!({"resourceType": "DocumentReference", "id": "second", "context": {"encounter": ["x"]}}),
        json!({"resourceType": "DocumentReference", "id": "third"}),
    ];

    let summary = DocumentImporter::new(&db).import_batch(resources);

    assert_eq!(summary.notes_added, 2);
    assert_eq!(summary.versions_added, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(count_notes(db.connection()).unwrap(), 2);
    assert_eq!(find_notes_by_external_id(db.connection(), "first").unwrap().len(), 1);
    assert_eq!(find_notes_by_external_id(db.connection(), "second").unwrap().len(), 0);
    assert_eq!(find_notes_by_external_id(db.connection(), "third").unwrap().len(), 1);
}

#[test]
fn category_object_instead_of_list_is_ignored() {
    let db = Database::in_memory().unwrap();
    let summary = DocumentImporter::new(&db).import_batch(vec![json!({
        "resourceType": "DocumentReference",
        "id": "d1",
        "category": {"coding": [{"code": "clinical-note", "display": "Clinical Note"}]},
        "content": [{"attachment": {"url": "https://fhir.example/Binary/1"}}]
    })]);

    assert_eq!(summary.notes_added, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.categories_added, 0);

    let note = &find_notes_by_external_id(db.connection(), "d1").unwrap()[0];
    assert_eq!(note.category_id, None);
}

#[test]
fn numeric_date_is_stored_as_text() {
    let db = Database::in_memory().unwrap();
    let summary = DocumentImporter::new(&db).import_batch(vec![json!({
        "resourceType": "DocumentReference",
        "id": "d1",
        "date": 20240301
    })]);

    assert_eq!(summary.notes_added, 1);
    assert_eq!(summary.failed, 0);

    let note = &find_notes_by_external_id(db.connection(), "d1").unwrap()[0];
    assert_eq!(note.note_date.as_deref(), Some("20240301"));
}

#[test]
fn author_and_content_of_wrong_shape_are_null() {
    let record = extract_note(&parse(json!({
        "author": "Practitioner/abc123",
        "content": {"attachment": {"data": "aGk="}}
    })));

    assert_eq!(record.practitioner_id, None);
    assert_eq!(record.note_text, None);
}

#[test]
fn line_wrapped_inline_data_is_decoded() {
    let record = extract_note(&parse(json!({
        "content": [{"attachment": {"data": "SGVsbG8g\nd29ybGQ="}}]
    })));
    assert_eq!(record.note_text.as_deref(), Some("Hello world"));

    assert_eq!(decode_inline_data("SGVs\r\nbG8g d29y\tbGQ=").unwrap(), "Hello world");
}

#[test]
fn batch_registers_categories_before_notes() {
    let db = Database::in_memory().unwrap();
    let summary = DocumentImporter::new(&db).import_batch(vec![full_document()]);

    assert_eq!(summary.categories_added, 1);
    let categories = list_categories(db.connection()).unwrap();
    assert_eq!(categories[0].loinc_code.as_deref(), Some("clinical-note"));

    let note = &find_notes_by_external_id(db.connection(), "doc-1").unwrap()[0];
    assert_eq!(note.category_id, Some(categories[0].id));
}

#[test]
fn failed_write_rolls_back_the_document() {
    let db = Database::in_memory().unwrap();
    db.connection()
        .execute_batch(
            "CREATE TRIGGER reject_versions BEFORE INSERT ON note_version
             BEGIN SELECT RAISE(ABORT, 'versions disabled'); END;",
        )
        .unwrap();

    let result = DocumentImporter::new(&db).import_document(&parse(json!({"id": "doc-1"})));

    assert!(matches!(result, Err(ImportError::Storage(_))));
    assert_eq!(count_notes(db.connection()).unwrap(), 0, "note insert rolled back");
}
