//! Sinks that assemble decoded text into a document.

use std::borrow::Cow;

use bytes::Bytes;

use crate::error::DocumentError;

/// An append-only sink fed with UTF-8 blocks by a loader.
///
/// The loader owns the builder until it completes, then hands it to the
/// owning thread inside the completion event.
pub trait DocumentBuilder: Send + 'static {
    type Document;

    /// Append one decoded block. An error aborts the load.
    fn add_data(&mut self, data: &[u8]) -> Result<(), DocumentError>;

    /// Discard a partially built document.
    fn release(self);

    fn into_document(self) -> Self::Document;
}

/// In-memory builder producing a [`TextDocument`].
#[derive(Debug, Default)]
pub struct TextBuilder {
    text: Vec<u8>,
    limit: Option<usize>,
}

impl TextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with room for `capacity` bytes, typically the file size
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: Vec::with_capacity(capacity),
            limit: None,
        }
    }

    /// Refuse documents larger than `limit` bytes
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl DocumentBuilder for TextBuilder {
    type Document = TextDocument;

    fn add_data(&mut self, data: &[u8]) -> Result<(), DocumentError> {
        let new_len = self.text.len().saturating_add(data.len());
        if self.limit.is_some_and(|limit| new_len > limit) {
            return Err(DocumentError::OUT_OF_MEMORY);
        }
        self.text
            .try_reserve(data.len())
            .map_err(|_| DocumentError::OUT_OF_MEMORY)?;
        self.text.extend_from_slice(data);
        Ok(())
    }

    fn release(self) {}

    fn into_document(self) -> TextDocument {
        TextDocument {
            bytes: Bytes::from(self.text),
        }
    }
}

/// A finished document; its bytes can be shared with a storer without copying.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocument {
    bytes: Bytes,
}

impl TextDocument {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

impl From<&str> for TextDocument {
    fn from(text: &str) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(text.as_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accumulates_blocks() {
        let mut builder = TextBuilder::with_capacity(16);
        builder.add_data(b"hello ").unwrap();
        builder.add_data(b"world").unwrap();
        assert_eq!(builder.len(), 11);

        let doc = builder.into_document();
        assert_eq!(doc.text(), "hello world");
        assert_eq!(doc.to_bytes(), Bytes::from_static(b"hello world"));
    }

    #[test]
    fn test_limit_rejects_oversized_document() {
        let mut builder = TextBuilder::new().with_limit(4);
        builder.add_data(b"abcd").unwrap();
        assert_eq!(builder.add_data(b"e"), Err(DocumentError::OUT_OF_MEMORY));
        assert_eq!(builder.len(), 4);
    }
}
