use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::pipeline::import::compute_fingerprint;

/// Stable content-derived identifier of a document (SHA-256, URL-safe base64).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Self(compute_fingerprint(bytes))
    }

    /// Wrap an already computed fingerprint (e.g. read back from the database or a URL).
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A submitted document. Immutable once constructed; the bytes are shared
/// so handing the document to a worker thread never copies the payload.
#[derive(Debug, Clone)]
pub struct Document {
    filename: String,
    declared_mime: Option<String>,
    bytes: Arc<[u8]>,
    fingerprint: Fingerprint,
    uploaded_at: NaiveDateTime,
}

impl Document {
    pub fn new(filename: impl Into<String>, declared_mime: Option<String>, bytes: Vec<u8>) -> Self {
        let fingerprint = Fingerprint::of(&bytes);
        Self {
            filename: filename.into(),
            declared_mime,
            bytes: bytes.into(),
            fingerprint,
            uploaded_at: chrono::Local::now().naive_local(),
        }
    }

    pub fn with_uploaded_at(mut self, uploaded_at: NaiveDateTime) -> Self {
        self.uploaded_at = uploaded_at;
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn declared_mime(&self) -> Option<&str> {
        self.declared_mime.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cheap handle on the payload for work that outlives this borrow.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn uploaded_at(&self) -> NaiveDateTime {
        self.uploaded_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_share_fingerprint() {
        let a = Document::new("a.pdf", None, b"%PDF-1.4 same".to_vec());
        let b = Document::new("b.pdf", Some("application/pdf".into()), b"%PDF-1.4 same".to_vec());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.size_bytes(), 13);
    }

    #[test]
    fn different_bytes_differ() {
        let a = Document::new("a.png", None, vec![1, 2, 3]);
        let b = Document::new("a.png", None, vec![1, 2, 4]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_is_url_safe() {
        let fp = Fingerprint::of(&[0xFF; 64]);
        assert!(!fp.as_str().contains('/'));
        assert!(!fp.as_str().contains('+'));
        assert!(!fp.as_str().contains('='));
    }
}
