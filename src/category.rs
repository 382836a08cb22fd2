//! Deduplicated storage of document categories.

use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension};

use crate::db::{Database, is_unique_violation};
use crate::error::ImportError;
use crate::fhir::DocumentReference;
use crate::models::{Category, CategoryCoding, CategoryId};

/// Coding system whose codes are also recorded as the LOINC code.
pub const LOINC_SYSTEM: &str = "http://loinc.org";

/// Registers the distinct categories found in a batch of documents.
///
/// # Examples
///
/// ```
/// use clinotes::{CategoryNormalizer, Database, DocumentReference};
///
/// # fn main() -> anyhow::Result<()> {
/// let db = Database::in_memory()?;
/// let doc: DocumentReference = serde_json::from_value(serde_json::json!({
///     "category": [{"coding": [{"code": "clinical-note", "display": "Clinical Note"}]}]
/// }))?;
///
/// let normalizer = CategoryNormalizer::new(&db);
/// assert_eq!(normalizer.import_categories([&doc])?, 1);
/// assert_eq!(normalizer.import_categories([&doc])?, 0);
/// # Ok(())
/// # }
/// ```
pub struct CategoryNormalizer<'a> {
    db: &'a Database,
}

impl<'a> CategoryNormalizer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Collects every coding that has both a code and a display.
    ///
    /// The set is ordered, so insertion order does not depend on input order.
    pub fn collect_codings<'d, I>(documents: I) -> BTreeSet<CategoryCoding>
    where
        I: IntoIterator<Item = &'d DocumentReference>,
    {
        documents
            .into_iter()
            .flat_map(|doc| doc.category.iter())
            .flat_map(|concept| concept.coding.iter())
            .filter_map(|coding| {
                let code = coding.code.as_deref()?;
                let display = coding.display.as_deref()?;
                let loinc_code = (coding.system.as_deref() == Some(LOINC_SYSTEM))
                    .then(|| code.to_string());
                Some(CategoryCoding {
                    code: code.to_string(),
                    display: display.to_string(),
                    loinc_code,
                })
            })
            .collect()
    }

    /// Inserts the batch's categories in one transaction.
    ///
    /// Returns the number of newly inserted rows. Codes that are already
    /// stored are left untouched.
    pub fn import_categories<'d, I>(&self, documents: I) -> Result<usize, ImportError>
    where
        I: IntoIterator<Item = &'d DocumentReference>,
    {
        let codings = Self::collect_codings(documents);

        let added = self.db.with_transaction(|conn| {
            let mut added = 0;
            for coding in &codings {
                match insert_category(conn, coding) {
                    Ok(_) => added += 1,
                    Err(ImportError::DuplicateEntity { key, .. }) => {
                        tracing::debug!(code = %key, "category already present");
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok::<_, ImportError>(added)
        })?;

        tracing::info!(found = codings.len(), added, "categories processed");
        Ok(added)
    }
}

/// Inserts one category row.
///
/// A code that already exists yields [`ImportError::DuplicateEntity`].
pub fn insert_category(conn: &Connection, coding: &CategoryCoding) -> Result<CategoryId, ImportError> {
    let result = conn.execute(
        "INSERT INTO category (code, display, loinc_code) VALUES (?1, ?2, ?3)",
        (&coding.code, &coding.display, &coding.loinc_code),
    );

    match result {
        Ok(_) => Ok(CategoryId::new(conn.last_insert_rowid())),
        Err(e) if is_unique_violation(&e) => Err(ImportError::DuplicateEntity {
            entity: "category",
            key: coding.code.clone(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Looks up a category by its code.
pub fn category_id_for_code(conn: &Connection, code: &str) -> rusqlite::Result<Option<CategoryId>> {
    conn.query_row(
        "SELECT category_id FROM category WHERE code = ?1",
        [code],
        |row| row.get::<_, i64>(0),
    )
    .optional()
    .map(|id| id.map(CategoryId::new))
}

/// Lists all stored categories ordered by code.
pub fn list_categories(conn: &Connection) -> rusqlite::Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT category_id, code, display, loinc_code, is_active
         FROM category
         ORDER BY code",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(Category {
            id: CategoryId::new(row.get(0)?),
            code: row.get(1)?,
            display: row.get(2)?,
            loinc_code: row.get(3)?,
            is_active: row.get(4)?,
        })
    })?;

    rows.collect()
}
