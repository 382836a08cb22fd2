use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// A single code from a terminology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Coding {
    pub system: Option<String>,
    pub code: Option<String>,
    pub display: Option<String>,
}

/// A concept expressed as one or more codings plus optional free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Returns the first coding, if any.
    pub fn first_coding(&self) -> Option<&Coding> {
        self.coding.first()
    }

    /// Returns the display of the first coding.
    pub fn first_display(&self) -> Option<&str> {
        self.first_coding().and_then(|c| c.display.as_deref())
    }

    /// Returns the code of the first coding.
    pub fn first_code(&self) -> Option<&str> {
        self.first_coding().and_then(|c| c.code.as_deref())
    }
}

/// A reference to another resource, by literal string and/or display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Reference {
    pub reference: Option<String>,
    pub display: Option<String>,
}

/// R5 construct pairing a concept with a resource reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CodeableReference {
    pub concept: Option<CodeableConcept>,
    pub reference: Option<Reference>,
}

/// A measured amount.
///
/// `value` keeps the JSON number as written so that composed strings such as
/// `"500 mg"` match the source text exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Quantity {
    pub value: Option<Number>,
    pub unit: Option<String>,
    pub code: Option<String>,
}

impl Quantity {
    /// Returns the coded unit, falling back to the human-readable unit.
    pub fn unit_code(&self) -> Option<&str> {
        self.code.as_deref().or(self.unit.as_deref())
    }

    /// Returns the value as a float for numeric columns.
    pub fn value_f64(&self) -> Option<f64> {
        self.value.as_ref().and_then(Number::as_f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Ratio {
    pub numerator: Option<Quantity>,
    pub denominator: Option<Quantity>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Period {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Payload-bearing part of a document: inline base64 `data` or a remote `url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: Option<String>,
    pub data: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
}

/// Accepts either a single value or an array of values.
///
/// Used where FHIR versions disagree on cardinality.
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        None => Vec::new(),
    })
}

/// Accepts an array of `T`; any other shape reads as empty.
///
/// Top-level document lists that do not have the expected shape are treated
/// as absent instead of failing the whole resource.
pub(crate) fn list_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(Vec::new());
    }

    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "ignoring list with unexpected shape");
        Vec::new()
    }))
}

/// Reads a string as-is and any other non-null scalar as its JSON text.
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}
