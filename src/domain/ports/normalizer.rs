//! Content normaliser port.
//!
//! Normalisers are optional per MIME type; when one matches, its output
//! replaces the raw content before chunking.

pub trait Normalizer: Send + Sync {
    /// MIME types this normaliser handles.
    fn mime_types(&self) -> &[&'static str];

    /// Rewrite raw content into indexable plain text.
    fn normalize(&self, content: &str) -> String;
}
