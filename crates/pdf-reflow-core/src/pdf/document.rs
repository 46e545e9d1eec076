use std::path::Path;
use std::sync::Arc;

use mupdf::{Document as MuDocument, MetadataName};

use crate::error::{Error, Result};

/// Thread-safe wrapper around an uploaded PDF document
pub struct PdfDocument {
    /// The raw PDF bytes
    bytes: Arc<Vec<u8>>,
    /// Cached metadata
    metadata: DocumentMetadata,
    /// Number of pages
    page_count: usize,
}

/// Document metadata carried over to the translated output
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
}

impl PdfDocument {
    /// Open a PDF from bytes, failing with [`Error::Extraction`] if it does not parse
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();

        let doc = MuDocument::from_bytes(&bytes, "")
            .map_err(|e| Error::Extraction(format!("Failed to parse PDF: {e}")))?;

        let page_count = doc.page_count()
            .map_err(|e| Error::Extraction(format!("Failed to get page count: {e}")))?;

        // mupdf returns empty string if not present
        let metadata = DocumentMetadata {
            title: doc.metadata(MetadataName::Title).ok().filter(|s| !s.is_empty()),
        };

        Ok(Self {
            bytes: Arc::new(bytes),
            metadata,
            page_count: usize::try_from(page_count).unwrap_or(0),
        })
    }

    /// Open a PDF from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            Error::Extraction(format!("Failed to read file {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_bytes(bytes)
    }

    pub const fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    /// Open the document for operations (creates a temporary handle)
    pub(crate) fn open_document(&self) -> Result<MuDocument> {
        MuDocument::from_bytes(&self.bytes, "")
            .map_err(|e| Error::Extraction(format!("Failed to open document: {e}")))
    }
}

impl Clone for PdfDocument {
    /// O(1): only the `Arc` around the bytes is cloned.
    fn clone(&self) -> Self {
        Self {
            bytes: Arc::clone(&self.bytes),
            metadata: self.metadata.clone(),
            page_count: self.page_count,
        }
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_count)
            .field("metadata", &self.metadata)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}
