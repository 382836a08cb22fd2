/// Relational schema for imported clinical notes and medications.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution.
pub const INITIAL_SCHEMA: &str = r#"
-- Coded note categories, deduplicated by code
CREATE TABLE IF NOT EXISTS category (
    category_id INTEGER PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    display TEXT,
    loinc_code TEXT,
    is_active INTEGER NOT NULL DEFAULT 1
);

-- One row per imported DocumentReference
CREATE TABLE IF NOT EXISTS note (
    note_id INTEGER PRIMARY KEY,
    note_id_external TEXT,
    category_id INTEGER REFERENCES category(category_id),
    note_type TEXT,
    note_type_code TEXT,
    encounter_id TEXT,
    note_date TEXT,
    current_version_id INTEGER REFERENCES note_version(version_id),
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER
);

-- Note content; the import creates version 1, content resolution updates it
CREATE TABLE IF NOT EXISTS note_version (
    version_id INTEGER PRIMARY KEY,
    note_id INTEGER NOT NULL REFERENCES note(note_id) ON DELETE CASCADE,
    version_number INTEGER NOT NULL DEFAULT 1,
    note_text TEXT,
    practitioner_id TEXT,
    created_at INTEGER,
    UNIQUE (note_id, version_number)
);

CREATE TABLE IF NOT EXISTS medication (
    medication_id INTEGER PRIMARY KEY,
    medication_id_external TEXT NOT NULL UNIQUE,
    medication TEXT,
    form TEXT,
    ingredient TEXT,
    strength TEXT,
    manufacturer TEXT
);

CREATE TABLE IF NOT EXISTS medication_request (
    medication_request_id INTEGER PRIMARY KEY,
    medication_request_id_external TEXT NOT NULL UNIQUE,
    medication_id TEXT,
    medication TEXT,
    status TEXT,
    practitioner_id TEXT,
    encounter_id TEXT,
    authored_on TEXT,
    dosage_text TEXT,
    dosage_route TEXT,
    dosage_method TEXT,
    dosage_quantity REAL,
    dosage_unit TEXT,
    timing_frequency INTEGER,
    timing_period REAL,
    timing_period_unit TEXT,
    timing_start TEXT,
    timing_end TEXT
);

CREATE TABLE IF NOT EXISTS medication_administration (
    medication_administration_id INTEGER PRIMARY KEY,
    medication_administration_id_external TEXT NOT NULL UNIQUE,
    medication_id TEXT,
    medication_display TEXT,
    status TEXT,
    practitioner_id TEXT,
    request_id TEXT,
    encounter_id TEXT,
    effective_start TEXT,
    effective_end TEXT,
    dosage_text TEXT,
    dosage_route TEXT,
    dosage_method TEXT,
    dosage_quantity REAL,
    dosage_unit TEXT
);

CREATE INDEX IF NOT EXISTS idx_note_external ON note(note_id_external);
CREATE INDEX IF NOT EXISTS idx_note_category ON note(category_id);
CREATE INDEX IF NOT EXISTS idx_note_version_note ON note_version(note_id);
"#;

/// Additive column migrations, one statement per line.
///
/// `content_type` is not part of the base DDL. On a database that already
/// has the column the statement fails with "duplicate column" and is skipped.
pub const MIGRATIONS: &str = r#"
-- Negotiated content type of resolved attachment content
ALTER TABLE note_version ADD COLUMN content_type TEXT
"#;
