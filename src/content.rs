/// Remote content resolution and presentation of stored note content.
///
/// Notes imported from URL-only attachments hold a `URL: <address>`
/// placeholder. The resolver fetches those addresses and stores the payload
/// base64-encoded with its content type; the presenter turns stored text back
/// into something a user can read or save.
mod fetcher;
mod presenter;
mod resolver;

pub use fetcher::{ContentFetcher, FetchError, HttpContentFetcher, HttpContentFetcherBuilder};
pub use presenter::{
    NoteContent, PREVIEW_CHARS, StoredContent, file_extension, is_textual, load_note_content,
    preview, save_content,
};
pub use resolver::{
    ContentResolver, DEFAULT_CONTENT_TYPE, FHIR_JSON, PROBE_CONTENT_TYPES, ResolutionState,
    ResolvedContent,
};
