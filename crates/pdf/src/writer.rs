//! Minimal PDF 1.4 document writer.
//!
//! Emits a single-page document with the two built-in Helvetica fonts and an
//! uncompressed content stream. Output is fully deterministic: the same
//! composed page always serializes to the same bytes.

use crate::RenderError;

/// US Letter media box.
pub(crate) const PAGE_WIDTH: f64 = 612.0;
const PAGE_HEIGHT: f64 = 792.0;

pub(crate) const MARGIN_X: f64 = 50.0;
const TOP_Y: f64 = 760.0;
const BOTTOM_Y: f64 = 60.0;

/// Approximate average glyph width as a fraction of font size, used for
/// centering. Exact metrics are not needed for this layout.
const AVG_GLYPH_WIDTH: f64 = 0.5;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Font {
    /// Helvetica (/F1)
    Regular,
    /// Helvetica-Bold (/F2)
    Bold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Font::Regular => "/F1",
            Font::Bold => "/F2",
        }
    }
}

/// Builds the content stream of one page, top to bottom.
pub(crate) struct PageComposer {
    content: String,
    y: f64,
}

impl PageComposer {
    pub(crate) fn new() -> Self {
        Self {
            content: String::new(),
            y: TOP_Y,
        }
    }

    fn advance(&mut self, leading: f64) -> Result<f64, RenderError> {
        if self.y - leading < BOTTOM_Y {
            return Err(RenderError::PageOverflow);
        }
        let line_y = self.y;
        self.y -= leading;
        Ok(line_y)
    }

    pub(crate) fn text(&mut self, font: Font, size: f64, text: &str) -> Result<(), RenderError> {
        self.text_at(font, size, MARGIN_X, text)
    }

    pub(crate) fn text_centered(
        &mut self,
        font: Font,
        size: f64,
        text: &str,
    ) -> Result<(), RenderError> {
        let width = text.chars().count() as f64 * size * AVG_GLYPH_WIDTH;
        let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN_X);
        self.text_at(font, size, x, text)
    }

    fn text_at(&mut self, font: Font, size: f64, x: f64, text: &str) -> Result<(), RenderError> {
        let y = self.advance(size * 1.35)?;
        self.content.push_str(&format!(
            "BT {} {:.1} Tf {:.1} {:.1} Td ({}) Tj ET\n",
            font.resource(),
            size,
            x,
            y,
            escape_text(text)
        ));
        Ok(())
    }

    /// Horizontal rule across the text column.
    pub(crate) fn rule(&mut self) -> Result<(), RenderError> {
        let y = self.advance(12.0)?;
        self.content.push_str(&format!(
            "{MARGIN_X:.1} {y:.1} m {:.1} {y:.1} l S\n",
            PAGE_WIDTH - MARGIN_X
        ));
        Ok(())
    }

    pub(crate) fn space(&mut self, dy: f64) -> Result<(), RenderError> {
        self.advance(dy)?;
        Ok(())
    }

    pub(crate) fn finish(self) -> String {
        self.content
    }
}

/// Escape a string for a PDF literal string; characters outside Latin-1 are
/// replaced since the built-in fonts use WinAnsi encoding.
pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' | '\r' | '\t' => out.push(' '),
            c if c.is_ascii() => out.push(c),
            // Latin-1 range as octal escapes: the content stream is declared
            // WinAnsi, so these must stay single bytes, not UTF-8 sequences.
            c if (c as u32) < 256 => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out
}

/// Assemble a complete single-page PDF around `content`.
pub(crate) fn assemble_document(content: &str) -> Vec<u8> {
    let objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH:.0} {PAGE_HEIGHT:.0}] \
             /Resources << /Font << /F1 4 0 R /F2 5 0 R >> >> /Contents 6 0 R >>"
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ),
    ];

    let mut out: Vec<u8> = Vec::with_capacity(content.len() + 1024);
    out.extend_from_slice(b"%PDF-1.4\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", index + 1, body).as_bytes());
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        )
        .as_bytes(),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping_covers_delimiters_and_non_latin1() {
        assert_eq!(escape_text(r"a\b"), r"a\\b");
        assert_eq!(escape_text("x (y)"), r"x \(y\)");
        assert_eq!(escape_text("héllo"), r"h\351llo");
        assert_eq!(escape_text("José"), r"Jos\351");
        assert_eq!(escape_text("日本"), "??");
    }

    #[test]
    fn latin1_text_stays_single_byte_in_the_stream() {
        let mut page = PageComposer::new();
        page.text(Font::Regular, 11.0, "José Álvarez").unwrap();
        let content = page.finish();
        assert!(content.is_ascii());
        assert!(content.contains(r"(Jos\351 \301lvarez) Tj"));
    }

    #[test]
    fn overflowing_the_page_is_an_error() {
        let mut page = PageComposer::new();
        let result = (0..200).try_for_each(|_| page.text(Font::Regular, 11.0, "line"));
        assert!(matches!(result, Err(RenderError::PageOverflow)));
    }

    #[test]
    fn assembled_document_has_pdf_framing() {
        let mut page = PageComposer::new();
        page.text(Font::Bold, 20.0, "Title").unwrap();
        let bytes = assemble_document(&page.finish());

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("(Title) Tj"));
        assert!(text.contains("startxref"));
    }
}
