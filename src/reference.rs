//! Parsing of FHIR reference strings.
//!
//! Every cross-resource identifier (encounter, practitioner, medication,
//! organization, request) goes through this module so that the rules for
//! turning `"Practitioner/abc123"` into `"abc123"` live in one place.

/// A reference string split into its optional type prefix and id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedReference<'a> {
    pub resource_type: Option<&'a str>,
    pub id: &'a str,
}

/// Splits a reference on its last `/`.
///
/// The segment before the final slash is reported as the resource type, so
/// absolute URLs such as `https://host/fhir/Encounter/e1` parse to
/// `(Some("Encounter"), "e1")`. A reference without a slash has no type.
pub fn parse(reference: &str) -> ParsedReference<'_> {
    match reference.rsplit_once('/') {
        Some((prefix, id)) => {
            let resource_type = prefix.rsplit('/').next().filter(|s| !s.is_empty());
            ParsedReference { resource_type, id }
        }
        None => ParsedReference {
            resource_type: None,
            id: reference,
        },
    }
}

/// Returns the trailing id of a reference.
///
/// Generic rule used for medication-family references, regardless of type.
pub fn trailing_id(reference: &str) -> &str {
    parse(reference).id
}

/// Strips a literal `"<resource_type>/"` prefix.
///
/// References are opaque: anything without the expected prefix is returned
/// unchanged rather than rejected.
pub fn strip_type_prefix<'a>(reference: &'a str, resource_type: &str) -> &'a str {
    reference
        .strip_prefix(resource_type)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(reference)
}

/// Returns the local id of a contained-resource reference (`"#org1"`).
pub fn contained_id(reference: &str) -> Option<&str> {
    reference.strip_prefix('#').filter(|id| !id.is_empty())
}
