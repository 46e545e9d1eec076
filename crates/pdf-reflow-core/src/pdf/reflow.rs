//! Reflow of translated text into a new paginated PDF.
//!
//! # Coordinate System
//!
//! Layout runs top-down: the cursor is the distance from the top edge of
//! the page. PDF uses a bottom-left origin, so every row is converted with
//! ```text
//! pdf_y = PAGE_HEIGHT - baseline_from_top
//! ```
//!
//! # Layout
//!
//! Every line of every paragraph becomes a wrapped block of rows of equal
//! height. Long lines get a smaller font. A row that would cross the bottom
//! break margin starts a new page. Paragraphs are followed by one blank row.

use std::collections::BTreeSet;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat};
use tracing::{debug, warn};

use crate::config::RenderConfig;
use crate::error::{Error, Result};
use crate::segment::segment;
use super::font::{FONT_RESOURCE, FontData, PageFont};

// =============================================================================
// Layout Constants
// =============================================================================

const MM: f32 = 72.0 / 25.4;

/// A4 portrait, in points.
pub const PAGE_WIDTH: f32 = 210.0 * MM;
pub const PAGE_HEIGHT: f32 = 297.0 * MM;

/// Left, top and right page margin.
const MARGIN: f32 = 10.0 * MM;

/// Distance from the bottom edge at which a new page is started.
const BREAK_MARGIN: f32 = 15.0 * MM;

/// Inner horizontal padding of a text block.
const CELL_PADDING: f32 = 1.0 * MM;

/// Height of one row of text (and of the paragraph spacer).
pub const ROW_HEIGHT: f32 = 5.0 * MM;

/// Font size for lines up to [`LONG_LINE_THRESHOLD`] characters.
pub const DEFAULT_FONT_SIZE: f32 = 10.0;

/// Font size for lines longer than [`LONG_LINE_THRESHOLD`] characters.
pub const REDUCED_FONT_SIZE: f32 = 8.0;

/// Character count above which a line is set in the reduced size.
pub const LONG_LINE_THRESHOLD: usize = 100;

/// Available width for text inside the margins.
const TEXT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN - 2.0 * CELL_PADDING;

/// Font size for a line, chosen from its character count.
pub fn font_size_for_line(line: &str) -> f32 {
    if line.chars().count() > LONG_LINE_THRESHOLD {
        REDUCED_FONT_SIZE
    } else {
        DEFAULT_FONT_SIZE
    }
}

// =============================================================================
// Public Types
// =============================================================================

/// Result of laying out one line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Rendered { rows: usize, font_size: f32 },
    Skipped { reason: String },
}

/// A line the renderer had to leave out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub paragraph: usize,
    pub line: usize,
    pub reason: String,
}

/// Summary of one render call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub pages: usize,
    pub lines_rendered: usize,
    pub skipped: Vec<SkippedLine>,
}

/// Serialized output document plus what happened while laying it out.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub report: RenderReport,
}

// =============================================================================
// Renderer
// =============================================================================

/// Builds reflowed PDFs from translated text.
///
/// `font` is `None` for the standard Helvetica font.
#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    font: Option<FontData>,
    title: Option<String>,
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::bundled()
    }
}

impl DocumentRenderer {
    /// Renderer embedding the bundled Unicode font.
    pub const fn bundled() -> Self {
        Self { font: Some(FontData::bundled()), title: None }
    }

    /// Renderer using the standard Helvetica font (Latin-1 only).
    pub const fn standard() -> Self {
        Self { font: None, title: None }
    }

    pub fn new(config: &RenderConfig) -> Result<Self> {
        let font = match &config.font_path {
            Some(path) => Some(FontData::from_file(path)?),
            None if config.standard_font => None,
            None => Some(FontData::bundled()),
        };
        Ok(Self {
            font,
            title: config.title.clone(),
        })
    }

    #[must_use]
    pub fn with_font(mut self, font: FontData) -> Self {
        self.font = Some(font);
        self
    }

    /// Configured document title, if any.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Render `text` into a new PDF.
    pub fn render(&self, text: &str) -> Result<RenderedDocument> {
        self.render_with_title(text, self.title.as_deref())
    }

    /// Render `text`, writing `title` into the document information.
    pub fn render_with_title(&self, text: &str, title: Option<&str>) -> Result<RenderedDocument> {
        let font = match &self.font {
            Some(data) => PageFont::Embedded(data.parse()?),
            None => PageFont::Standard,
        };

        debug!("Rendering {} characters", text.len());

        let mut layout = Layout::new(&font);
        let mut report = RenderReport::default();

        for paragraph in segment(text) {
            if paragraph.is_blank() {
                continue;
            }

            for (line_index, line) in paragraph.lines().into_iter().enumerate() {
                debug!("Processing line: {}", line);
                match layout.write_line(line) {
                    LineOutcome::Rendered { .. } => report.lines_rendered += 1,
                    LineOutcome::Skipped { reason } => {
                        warn!(
                            "Skipping line {} of paragraph {}: {}",
                            line_index, paragraph.index, reason
                        );
                        report.skipped.push(SkippedLine {
                            paragraph: paragraph.index,
                            line: line_index,
                            reason,
                        });
                    }
                }
            }

            layout.spacer();
        }

        report.pages = layout.pages.len();
        let bytes = layout.finish(title)?;

        debug!(
            "Rendered {} pages ({} lines, {} skipped), {} bytes",
            report.pages,
            report.lines_rendered,
            report.skipped.len(),
            bytes.len()
        );

        Ok(RenderedDocument { bytes, report })
    }
}

// =============================================================================
// Layout State
// =============================================================================

/// Page accumulation: one operation list per page and a top-down cursor.
struct Layout<'r, 'a> {
    font: &'r PageFont<'a>,
    pages: Vec<Vec<Operation>>,
    cursor_y: f32,
    used_chars: BTreeSet<char>,
}

impl<'r, 'a> Layout<'r, 'a> {
    fn new(font: &'r PageFont<'a>) -> Self {
        Self {
            font,
            pages: vec![Vec::new()],
            cursor_y: MARGIN,
            used_chars: BTreeSet::new(),
        }
    }

    fn write_line(&mut self, line: &str) -> LineOutcome {
        let font_size = font_size_for_line(line);

        match wrap_line(self.font, line, font_size, TEXT_WIDTH) {
            Ok(rows) => {
                let count = rows.len();
                for row in rows {
                    self.write_row(&row, font_size);
                }
                LineOutcome::Rendered { rows: count, font_size }
            }
            Err(e) => LineOutcome::Skipped { reason: e.to_string() },
        }
    }

    fn write_row(&mut self, row: &str, font_size: f32) {
        if self.cursor_y + ROW_HEIGHT > PAGE_HEIGHT - BREAK_MARGIN {
            self.pages.push(Vec::new());
            self.cursor_y = MARGIN;
        }

        if !row.is_empty() {
            let baseline = 0.3f32.mul_add(font_size, self.cursor_y + 0.5 * ROW_HEIGHT);
            let operand = self.font.encode(row);
            self.used_chars.extend(row.chars());

            if let Some(ops) = self.pages.last_mut() {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("Tf", vec![FONT_RESOURCE.into(), font_size.into()]));
                ops.push(Operation::new(
                    "Td",
                    vec![(MARGIN + CELL_PADDING).into(), (PAGE_HEIGHT - baseline).into()],
                ));
                ops.push(Operation::new("Tj", vec![operand]));
                ops.push(Operation::new("ET", vec![]));
            }
        }

        self.cursor_y += ROW_HEIGHT;
    }

    /// Blank row between paragraphs; never starts a page on its own.
    fn spacer(&mut self) {
        self.cursor_y += ROW_HEIGHT;
    }

    fn finish(self, title: Option<&str>) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = self.font.add_to_document(&mut doc, &self.used_chars);
        let resources_id = doc.add_object(Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([(FONT_RESOURCE, Object::Reference(font_id))])),
        )]));

        let mut kids = Vec::with_capacity(self.pages.len());
        for operations in self.pages {
            let content = Content { operations }
                .encode()
                .map_err(|e| Error::PdfSave(format!("Failed to encode page content: {e}")))?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
                ("Resources", Object::Reference(resources_id)),
                (
                    "MediaBox",
                    Object::Array(vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()]),
                ),
            ]));
            kids.push(Object::Reference(page_id));
        }

        let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(count)),
            ])),
        );

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut info = Dictionary::from_iter([(
            "Producer",
            Object::String(b"pdf-reflow".to_vec(), StringFormat::Literal),
        )]);
        if let Some(title) = title {
            info.set("Title", Object::String(pdf_text_string(title), StringFormat::Hexadecimal));
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", Object::Reference(info_id));

        doc.compress();

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save PDF: {e}")))?;

        Ok(output)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Wrap a line into rows that fit `max_width`.
///
/// Words are broken at spaces; a word wider than a whole row is split
/// between characters. An empty line is one empty row. Fails when the font
/// lacks a glyph for any visible character, or a single glyph is wider than
/// a row.
fn wrap_line(font: &PageFont<'_>, line: &str, font_size: f32, max_width: f32) -> Result<Vec<String>> {
    let line: String = line
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    if let Some(c) = line.chars().find(|&c| !c.is_whitespace() && !font.supports(c)) {
        return Err(Error::RenderLine(format!("font has no glyph for {c:?}")));
    }

    if let Some(c) = line.chars().find(|&c| font.char_width(c, font_size) > max_width) {
        return Err(Error::RenderLine(format!(
            "character {c:?} is wider than the text area"
        )));
    }

    let space_width = font.char_width(' ', font_size);
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0f32;

    for word in line.split_whitespace() {
        let word_width = font.string_width(word, font_size);
        let needed = if current.is_empty() { word_width } else { current_width + space_width + word_width };

        if needed <= max_width {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_width = needed;
            continue;
        }

        if !current.is_empty() {
            rows.push(std::mem::take(&mut current));
            current_width = 0.0;
        }

        if word_width <= max_width {
            current.push_str(word);
            current_width = word_width;
            continue;
        }

        for c in word.chars() {
            let w = font.char_width(c, font_size);
            if current_width + w > max_width && !current.is_empty() {
                rows.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            current.push(c);
            current_width += w;
        }
    }

    if !current.is_empty() || rows.is_empty() {
        rows.push(current);
    }

    Ok(rows)
}

/// UTF-16BE with byte order mark, as PDF text strings require outside PDFDocEncoding.
fn pdf_text_string(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

// =============================================================================
// Tests
// =============================================================================
