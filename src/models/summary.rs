use std::fmt;

/// Per-batch counts for one resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub imported: usize,
    /// Already present (matched by external id); not an error.
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.imported + self.skipped + self.failed
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} imported, {} skipped, {} failed",
            self.imported, self.skipped, self.failed
        )
    }
}

/// Result of importing a batch of DocumentReference resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentImportSummary {
    pub categories_added: usize,
    pub notes_added: usize,
    pub versions_added: usize,
    pub failed: usize,
}

impl fmt::Display for DocumentImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Added {} categories, {} notes, and {} versions ({} failed)",
            self.categories_added, self.notes_added, self.versions_added, self.failed
        )
    }
}

/// Result of importing medication-family resources, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MedicationImportSummary {
    pub medications: BatchSummary,
    pub requests: BatchSummary,
    pub administrations: BatchSummary,
}

impl fmt::Display for MedicationImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Medications: {}", self.medications)?;
        writeln!(f, "Medication requests: {}", self.requests)?;
        write!(f, "Medication administrations: {}", self.administrations)
    }
}

/// Result of one content-resolution run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionSummary {
    /// Versions whose text was a `URL:` placeholder at the start of the run.
    pub pending: usize,
    pub resolved: usize,
    pub failed: usize,
}

impl fmt::Display for ResolutionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Resolved {} of {} URL references ({} failed)",
            self.resolved, self.pending, self.failed
        )
    }
}
