//! Lexical segmentation of extracted text.
//!
//! Paragraphs are separated by a blank line (`"\n\n"`), lines inside a
//! paragraph by a single `'\n'`. Both splits are plain string splits, so a
//! paragraph may be empty and joining the pieces back with the same
//! separator reproduces the input exactly.

/// Separator between paragraphs, as produced by the extractor.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Separator between lines inside a paragraph.
pub const LINE_SEPARATOR: char = '\n';

/// A run of text between two paragraph separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paragraph<'a> {
    /// Position in the source text (0-based, counting empty paragraphs)
    pub index: usize,
    pub text: &'a str,
}

impl<'a> Paragraph<'a> {
    /// Whether the paragraph has no visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn lines(&self) -> Vec<&'a str> {
        split_lines(self.text)
    }
}

/// Split text into paragraphs, preserving order and empty paragraphs.
pub fn segment(text: &str) -> Vec<Paragraph<'_>> {
    text.split(PARAGRAPH_SEPARATOR)
        .enumerate()
        .map(|(index, text)| Paragraph { index, text })
        .collect()
}

/// Split a paragraph into its lines.
pub fn split_lines(paragraph: &str) -> Vec<&str> {
    paragraph.split(LINE_SEPARATOR).collect()
}

/// Join paragraph texts with the paragraph separator.
pub fn join_paragraphs<I, S>(paragraphs: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, paragraph) in paragraphs.into_iter().enumerate() {
        if i > 0 {
            out.push_str(PARAGRAPH_SEPARATOR);
        }
        out.push_str(paragraph.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(paragraphs: &[Paragraph<'a>]) -> Vec<&'a str> {
        paragraphs.iter().map(|p| p.text).collect()
    }

    #[test]
    fn test_segment_counts_paragraphs_in_order() {
        let paragraphs = segment("First para.\n\nSecond para\nwith two lines.\n\nThird.");
        assert_eq!(
            texts(&paragraphs),
            vec!["First para.", "Second para\nwith two lines.", "Third."]
        );
        assert_eq!(paragraphs[2].index, 2);
    }

    #[test]
    fn test_segment_without_boundaries() {
        let paragraphs = segment("just one line");
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].lines(), vec!["just one line"]);
    }

    #[test]
    fn test_segment_keeps_blank_paragraphs() {
        let paragraphs = segment("a\n\n\n\nb\n\n");
        assert_eq!(texts(&paragraphs), vec!["a", "", "b", ""]);
        assert!(paragraphs[1].is_blank());
        assert!(!paragraphs[2].is_blank());
    }

    #[test]
    fn test_odd_newline_runs_split_left_to_right() {
        let paragraphs = segment("a\n\n\nb");
        assert_eq!(texts(&paragraphs), vec!["a", "\nb"]);
        assert_eq!(paragraphs[1].lines(), vec!["", "b"]);
    }

    #[test]
    fn test_whitespace_only_paragraph_is_blank() {
        let paragraphs = segment("a\n\n  \t \n\nb");
        assert!(paragraphs[1].is_blank());
    }

    #[test]
    fn test_segmentation_is_idempotent() {
        let samples = [
            "",
            "one",
            "a\n\nb",
            "a\n\n\nb\n\n\n\nc",
            "\n\nleading\n\ntrailing\n\n",
            "line one\nline two\n\npara two",
        ];
        for text in samples {
            let first = segment(text);
            let joined = join_paragraphs(first.iter().map(|p| p.text));
            assert_eq!(joined, text);
            assert_eq!(texts(&segment(&joined)), texts(&first), "sample {text:?}");
        }
    }

    #[test]
    fn test_join_paragraphs() {
        assert_eq!(join_paragraphs(["Hello world.", "Goodbye."]), "Hello world.\n\nGoodbye.");
        assert_eq!(join_paragraphs(Vec::<String>::new()), "");
    }
}
