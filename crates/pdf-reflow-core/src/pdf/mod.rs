mod document;
mod font;
mod text;
pub mod reflow;

pub use document::{DocumentMetadata, PdfDocument};
pub use font::{FontData, PageFont};
pub use text::{ExtractedText, TextExtractor, extract_text};
pub use reflow::{DocumentRenderer, LineOutcome, RenderReport, RenderedDocument, SkippedLine};
