use super::CategoryId;

/// A stored `category` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub code: String,
    pub display: Option<String>,
    pub loinc_code: Option<String>,
    pub is_active: bool,
}

/// A distinct coded category found in a batch of documents.
///
/// Ordered by code first so that batch insertion order is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryCoding {
    pub code: String,
    pub display: String,
    pub loinc_code: Option<String>,
}
