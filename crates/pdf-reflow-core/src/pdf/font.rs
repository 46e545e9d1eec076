//! Fonts for the reflowed document.
//!
//! Two choices are supported:
//!
//! - **Embedded** (default): a TrueType font embedded as a composite font,
//!   which renders any character the font has a glyph for. DejaVu Sans is
//!   bundled at compile time; another font can be loaded at runtime.
//! - **Standard**: the base-14 Helvetica font with WinAnsiEncoding. Needs no
//!   embedding but only covers Latin-1 plus a few typographic characters.
//!
//! # Composite Font Structure
//!
//! - **Type0 font**: the top-level font dictionary that references:
//!   - **CIDFont**: glyph metrics (`W` array) and references:
//!     - **FontDescriptor**: font metadata (flags, bounding box, etc.)
//!     - **FontFile2**: the embedded TrueType font program
//!   - **ToUnicode CMap**: maps glyph IDs back to Unicode for copy/paste
//!
//! Text is written with Identity-H encoding, i.e. as big-endian glyph IDs.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::Face;

use crate::error::{Error, Result};

/// Resource name of the text font in every page's resources.
pub const FONT_RESOURCE: &str = "F1";

/// DejaVu Sans, embedded at compile time (Bitstream Vera license, see
/// `assets/DejaVuSans-LICENSE.txt`). Covers Latin, Greek, Cyrillic and
/// Armenian among others.
const DEJAVU_SANS: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Raw TrueType data, either bundled or loaded from disk.
#[derive(Clone)]
pub struct FontData {
    bytes: Cow<'static, [u8]>,
}

impl FontData {
    /// The bundled DejaVu Sans font.
    pub const fn bundled() -> Self {
        Self { bytes: Cow::Borrowed(DEJAVU_SANS) }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::Font(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Face::parse(&bytes, 0).map_err(|e| Error::Font(format!("Failed to parse font: {e}")))?;
        Ok(Self { bytes: Cow::Owned(bytes) })
    }

    /// Parse the font tables; borrows the data for the lifetime of the face.
    pub fn parse(&self) -> Result<EmbeddedFont<'_>> {
        let face = Face::parse(&self.bytes, 0)
            .map_err(|e| Error::Font(format!("Failed to parse font: {e}")))?;
        Ok(EmbeddedFont { face, data: &self.bytes })
    }
}

impl std::fmt::Debug for FontData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontData").field("len", &self.bytes.len()).finish()
    }
}

/// Font used to measure and encode text while laying out pages.
pub enum PageFont<'a> {
    Standard,
    Embedded(EmbeddedFont<'a>),
}

impl PageFont<'_> {
    /// Whether the font has a glyph for `c`.
    pub fn supports(&self, c: char) -> bool {
        match self {
            Self::Standard => winansi_byte(c).is_some(),
            Self::Embedded(font) => font.glyph_id(c) != 0,
        }
    }

    /// Width of a single character in points.
    pub fn char_width(&self, c: char, font_size: f32) -> f32 {
        match self {
            Self::Standard => {
                f32::from(helvetica_width(winansi_byte(c).unwrap_or(b'?'))) * font_size / 1000.0
            }
            Self::Embedded(font) => font.char_width(c, font_size),
        }
    }

    /// Width of a string in points.
    pub fn string_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c, font_size)).sum()
    }

    /// Encode a row of text as the operand of a `Tj` operator.
    pub fn encode(&self, text: &str) -> Object {
        match self {
            Self::Standard => Object::String(
                text.chars().map(|c| winansi_byte(c).unwrap_or(b'?')).collect(),
                StringFormat::Literal,
            ),
            Self::Embedded(font) => Object::String(font.encode_glyphs(text), StringFormat::Hexadecimal),
        }
    }

    /// Add the font objects to `doc`; `used` is every character drawn with it.
    pub fn add_to_document(&self, doc: &mut Document, used: &BTreeSet<char>) -> ObjectId {
        match self {
            Self::Standard => doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"Type1".to_vec())),
                ("BaseFont", Object::Name(b"Helvetica".to_vec())),
                ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
            ])),
            Self::Embedded(font) => font.embed(doc, used),
        }
    }
}

/// A parsed TrueType font ready for embedding.
pub struct EmbeddedFont<'a> {
    face: Face<'a>,
    data: &'a [u8],
}

impl EmbeddedFont<'_> {
    /// Glyph ID for a character, 0 (.notdef) if the font lacks it.
    pub fn glyph_id(&self, c: char) -> u16 {
        self.face.glyph_index(c).map_or(0, |g| g.0)
    }

    pub fn glyph_width(&self, glyph_id: u16) -> u16 {
        self.face
            .glyph_hor_advance(ttf_parser::GlyphId(glyph_id))
            .unwrap_or(0)
    }

    pub fn units_per_em(&self) -> u16 {
        self.face.units_per_em()
    }

    pub fn char_width(&self, c: char, font_size: f32) -> f32 {
        f32::from(self.glyph_width(self.glyph_id(c))) * font_size / f32::from(self.units_per_em())
    }

    /// Big-endian glyph IDs for Identity-H content strings.
    pub fn encode_glyphs(&self, text: &str) -> Vec<u8> {
        text.chars()
            .flat_map(|c| self.glyph_id(c).to_be_bytes())
            .collect()
    }

    fn embed(&self, doc: &mut Document, used: &BTreeSet<char>) -> ObjectId {
        let glyphs: BTreeMap<u16, char> = used
            .iter()
            .map(|&c| (self.glyph_id(c), c))
            .filter(|&(gid, _)| gid != 0)
            .rev()
            .collect();

        let font_file_id = self.create_font_file(doc);
        let font_descriptor_id = self.create_font_descriptor(doc, font_file_id);
        let cid_font_id = self.create_cid_font(doc, font_descriptor_id, &glyphs);
        let to_unicode_id = Self::create_to_unicode_cmap(doc, &glyphs);

        doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type0".to_vec())),
            ("BaseFont", Object::Name(self.base_font_name())),
            ("Encoding", Object::Name(b"Identity-H".to_vec())),
            ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)])),
            ("ToUnicode", Object::Reference(to_unicode_id)),
        ]))
    }

    fn base_font_name(&self) -> Vec<u8> {
        self.face
            .names()
            .into_iter()
            .filter(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .find_map(|name| name.to_string())
            .unwrap_or_else(|| "EmbeddedFont".to_string())
            .into_bytes()
    }

    #[allow(clippy::cast_possible_wrap)] // Font size always fits in i64
    fn create_font_file(&self, doc: &mut Document) -> ObjectId {
        let mut dict = Dictionary::new();
        dict.set("Length1", Object::Integer(self.data.len() as i64));

        let stream = Stream::new(dict, self.data.to_vec()).with_compression(true);
        doc.add_object(Object::Stream(stream))
    }

    fn create_font_descriptor(&self, doc: &mut Document, font_file_id: ObjectId) -> ObjectId {
        let bbox = self.face.global_bounding_box();
        let scale = |v: i16| self.scale_units(i64::from(v));

        let dict = Dictionary::from_iter([
            ("Type", Object::Name(b"FontDescriptor".to_vec())),
            ("FontName", Object::Name(self.base_font_name())),
            ("Flags", Object::Integer(32)), // Nonsymbolic
            ("FontBBox", Object::Array(vec![
                Object::Integer(scale(bbox.x_min)),
                Object::Integer(scale(bbox.y_min)),
                Object::Integer(scale(bbox.x_max)),
                Object::Integer(scale(bbox.y_max)),
            ])),
            ("ItalicAngle", Object::Integer(0)),
            ("Ascent", Object::Integer(scale(self.face.ascender()))),
            ("Descent", Object::Integer(scale(self.face.descender()))),
            ("CapHeight", Object::Integer(scale(
                self.face.capital_height().unwrap_or_else(|| self.face.ascender()),
            ))),
            ("StemV", Object::Integer(80)),
            ("FontFile2", Object::Reference(font_file_id)),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }

    fn create_cid_font(
        &self,
        doc: &mut Document,
        font_descriptor_id: ObjectId,
        glyphs: &BTreeMap<u16, char>,
    ) -> ObjectId {
        let default_width = self.scale_units(i64::from(self.glyph_width(self.glyph_id(' '))));

        let dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
            ("BaseFont", Object::Name(self.base_font_name())),
            ("CIDSystemInfo", Object::Dictionary(Dictionary::from_iter([
                ("Registry", Object::String(b"Adobe".to_vec(), StringFormat::Literal)),
                ("Ordering", Object::String(b"Identity".to_vec(), StringFormat::Literal)),
                ("Supplement", Object::Integer(0)),
            ]))),
            ("FontDescriptor", Object::Reference(font_descriptor_id)),
            ("DW", Object::Integer(default_width)),
            ("W", Object::Array(self.build_widths_array(glyphs))),
            ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }

    /// Font design units to PDF's 1000-unit glyph space.
    fn scale_units(&self, value: i64) -> i64 {
        value * 1000 / i64::from(self.face.units_per_em())
    }

    /// `W` array entries `[gid [w1 w2 ...]]`, one run per consecutive GID range.
    fn build_widths_array(&self, glyphs: &BTreeMap<u16, char>) -> Vec<Object> {
        let mut result = Vec::new();
        let mut iter = glyphs.keys().copied().peekable();

        while let Some(first_gid) = iter.next() {
            let mut widths = vec![Object::Integer(self.scale_units(i64::from(self.glyph_width(first_gid))))];
            let mut expected_next = first_gid.saturating_add(1);

            while let Some(&gid) = iter.peek() {
                if gid != expected_next {
                    break;
                }
                widths.push(Object::Integer(self.scale_units(i64::from(self.glyph_width(gid)))));
                expected_next = gid.saturating_add(1);
                iter.next();
            }

            result.push(Object::Integer(i64::from(first_gid)));
            result.push(Object::Array(widths));
        }

        result
    }

    /// ToUnicode CMap covering exactly the glyphs drawn in the document.
    fn create_to_unicode_cmap(doc: &mut Document, glyphs: &BTreeMap<u16, char>) -> ObjectId {
        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
        );

        let entries: Vec<(&u16, &char)> = glyphs.iter().collect();
        // bfchar sections are limited to 100 entries each
        for chunk in entries.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for (gid, c) in chunk {
                let mut units = [0u16; 2];
                let utf16: String = c
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{u:04X}"))
                    .collect();
                let _ = writeln!(cmap, "<{gid:04X}> <{utf16}>");
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end",
        );

        let stream = Stream::new(Dictionary::new(), cmap.into_bytes());
        doc.add_object(Object::Stream(stream))
    }
}

/// WinAnsiEncoding code for a character, if it has one.
pub fn winansi_byte(c: char) -> Option<u8> {
    let code = u32::from(c);
    match code {
        0x20..=0x7E | 0xA0..=0xFF => u8::try_from(code).ok(),
        _ => match c {
            '€' => Some(0x80),
            '‚' => Some(0x82),
            'ƒ' => Some(0x83),
            '„' => Some(0x84),
            '…' => Some(0x85),
            '†' => Some(0x86),
            '‡' => Some(0x87),
            'ˆ' => Some(0x88),
            '‰' => Some(0x89),
            'Š' => Some(0x8A),
            '‹' => Some(0x8B),
            'Œ' => Some(0x8C),
            'Ž' => Some(0x8E),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '˜' => Some(0x98),
            '™' => Some(0x99),
            'š' => Some(0x9A),
            '›' => Some(0x9B),
            'œ' => Some(0x9C),
            'ž' => Some(0x9E),
            'Ÿ' => Some(0x9F),
            _ => None,
        },
    }
}

/// Helvetica advance widths (1/1000 em) for printable ASCII.
const HELVETICA_ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

/// Helvetica width for a WinAnsi code; accented letters use the common 556.
fn helvetica_width(code: u8) -> u16 {
    match code {
        0x20..=0x7E => HELVETICA_ASCII_WIDTHS[usize::from(code - 0x20)],
        0xA0 => 278,
        0x85 | 0x89 | 0x97 | 0xC6 | 0xE6 => 1000,
        _ => 556,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winansi_ascii_and_latin1() {
        assert_eq!(winansi_byte('A'), Some(b'A'));
        assert_eq!(winansi_byte('é'), Some(0xE9));
        assert_eq!(winansi_byte('€'), Some(0x80));
        assert_eq!(winansi_byte('“'), Some(0x93));
    }

    #[test]
    fn test_winansi_rejects_other_scripts() {
        assert_eq!(winansi_byte('ж'), None);
        assert_eq!(winansi_byte('中'), None);
        assert_eq!(winansi_byte('\t'), None);
    }

    #[test]
    fn test_standard_font_widths() {
        let font = PageFont::Standard;
        assert!((font.char_width('i', 10.0) - 2.22).abs() < 1e-4);
        assert!((font.string_width("WW", 10.0) - 18.88).abs() < 1e-3);
    }

    #[test]
    fn test_standard_font_substitutes_unencodable() {
        let font = PageFont::Standard;
        assert!(!font.supports('ж'));
        match font.encode("aжb") {
            Object::String(bytes, StringFormat::Literal) => assert_eq!(bytes, b"a?b"),
            other => panic!("unexpected operand {other:?}"),
        }
    }

    #[test]
    fn test_bundled_font_covers_cyrillic_and_czech() {
        let data = FontData::bundled();
        let font = PageFont::Embedded(data.parse().unwrap());
        for c in "Привет, мир. Děkuji, že čtete. Ґанок".chars() {
            assert!(font.supports(c), "no glyph for {c:?}");
        }
    }

    #[test]
    fn test_embedded_font_encodes_glyph_ids() {
        let data = FontData::bundled();
        let font = data.parse().unwrap();
        let encoded = font.encode_glyphs("жš");
        assert_eq!(encoded.len(), 4);
        assert_eq!(encoded[..2], font.glyph_id('ж').to_be_bytes());
        assert_eq!(encoded[2..], font.glyph_id('š').to_be_bytes());
    }

    #[test]
    fn test_invalid_font_data_is_rejected() {
        assert!(matches!(FontData::from_bytes(vec![0, 1, 2, 3]), Err(Error::Font(_))));
    }
}
