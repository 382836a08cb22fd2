use serde::Deserialize;

use super::datatypes::{
    Attachment, CodeableConcept, Reference, lenient_text, list_or_empty, one_or_many,
};

/// A clinical document: metadata plus one or more content attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub id: Option<String>,
    pub status: Option<String>,
    pub doc_status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<CodeableConcept>,
    #[serde(default, deserialize_with = "list_or_empty")]
    pub category: Vec<CodeableConcept>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "list_or_empty")]
    pub author: Vec<Reference>,
    /// R4 carries a single context object, R5 an array of references.
    #[serde(default, deserialize_with = "one_or_many")]
    pub context: Vec<DocumentContext>,
    #[serde(default, deserialize_with = "list_or_empty")]
    pub content: Vec<DocumentContent>,
}

/// Clinical context of a document.
///
/// Covers both the R4 shape (`{"encounter": [...]}`) and the R5 shape, where
/// each context entry is itself a reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocumentContext {
    #[serde(default, deserialize_with = "one_or_many")]
    pub encounter: Vec<Reference>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocumentContent {
    pub attachment: Option<Attachment>,
}

impl DocumentReference {
    /// First code of the first category coding.
    pub fn primary_category_code(&self) -> Option<&str> {
        self.category.first().and_then(CodeableConcept::first_code)
    }

    /// Encounter reference string, as written in the resource.
    ///
    /// Prefers the R4 `context.encounter[0]`; falls back to the first R5
    /// context entry pointing at an encounter.
    pub fn encounter_reference(&self) -> Option<&str> {
        let r4 = self
            .context
            .first()
            .and_then(|ctx| ctx.encounter.first())
            .and_then(|r| r.reference.as_deref());

        r4.or_else(|| {
            self.context
                .iter()
                .filter_map(|ctx| ctx.reference.as_deref())
                .find(|r| r.starts_with("Encounter/"))
        })
    }

    /// Author reference string of the first author.
    pub fn author_reference(&self) -> Option<&str> {
        self.author.first().and_then(|a| a.reference.as_deref())
    }

    /// Attachment of the first content entry.
    pub fn primary_attachment(&self) -> Option<&Attachment> {
        self.content.first().and_then(|c| c.attachment.as_ref())
    }
}
