use mupdf::{Document as MuDocument, TextPageOptions};
use tracing::debug;

use crate::error::{Error, Result};
use crate::segment::{LINE_SEPARATOR, PARAGRAPH_SEPARATOR};
use super::document::PdfDocument;

/// Plain text recovered from a document, in the extractor's reading order.
///
/// Paragraphs are separated by a blank line; lines inside a paragraph by a
/// single newline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText(String);

impl ExtractedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text extraction from PDF documents
pub struct TextExtractor<'a> {
    /// The PDF document to extract text from
    pub doc: &'a PdfDocument,
}

impl<'a> TextExtractor<'a> {
    pub const fn new(doc: &'a PdfDocument) -> Self {
        Self { doc }
    }

    /// Extract the whole document as one string.
    ///
    /// Each MuPDF block becomes one paragraph. Pages are separated like
    /// paragraphs, so a block never continues across a page boundary.
    pub fn extract(&self) -> Result<ExtractedText> {
        let doc = self.doc.open_document()?;
        let mut paragraphs: Vec<String> = Vec::new();

        for page_num in 0..self.doc.page_count() {
            let page_paragraphs = Self::page_paragraphs(&doc, page_num)?;
            debug!("Page {}: {} paragraphs", page_num, page_paragraphs.len());
            paragraphs.extend(page_paragraphs);
        }

        Ok(ExtractedText(paragraphs.join(PARAGRAPH_SEPARATOR)))
    }

    /// Paragraphs of one page, lines joined with a newline.
    fn page_paragraphs(doc: &MuDocument, page_num: usize) -> Result<Vec<String>> {
        let page_index = i32::try_from(page_num)
            .map_err(|_| Error::Extraction(format!("page index {page_num} out of range")))?;

        let page = doc.load_page(page_index).map_err(|e| {
            Error::Extraction(format!("Failed to load page {page_num}: {e}"))
        })?;

        let text_page = page.to_text_page(TextPageOptions::empty()).map_err(|e| {
            Error::Extraction(format!("Failed to get text page {page_num}: {e}"))
        })?;

        let mut paragraphs = Vec::new();

        for block in text_page.blocks() {
            let mut lines: Vec<String> = Vec::new();

            for line in block.lines() {
                let line_text: String = line.chars().filter_map(|c| c.char()).collect();
                let line_text = line_text.trim_end();
                if line_text.trim().is_empty() {
                    continue;
                }
                lines.push(line_text.to_string());
            }

            if lines.is_empty() {
                continue;
            }

            let mut paragraph = String::new();
            for (i, line) in lines.iter().enumerate() {
                if i > 0 {
                    paragraph.push(LINE_SEPARATOR);
                }
                paragraph.push_str(line);
            }
            paragraphs.push(paragraph);
        }

        Ok(paragraphs)
    }
}

/// Parse `bytes` and extract their text.
pub fn extract_text(bytes: impl Into<Vec<u8>>) -> Result<ExtractedText> {
    let doc = PdfDocument::from_bytes(bytes)?;
    TextExtractor::new(&doc).extract()
}
