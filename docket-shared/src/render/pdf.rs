use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use super::{layout, DocumentRenderer, Line, LineStyle, RenderContext, RenderError};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const LAYER: &str = "Content";

/// Characters per body line before wrapping
const WRAP_AT: usize = 90;

/// A4 PDF renderer using the built-in Helvetica fonts
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

fn metrics(style: LineStyle) -> (f32, f32) {
    // (font size in pt, advance in mm)
    match style {
        LineStyle::Title => (18.0, 12.0),
        LineStyle::Heading => (13.0, 9.0),
        LineStyle::Status => (14.0, 10.0),
        LineStyle::Body => (10.0, 6.0),
    }
}

fn wrap(text: &str) -> Vec<String> {
    let mut rows = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > WRAP_AT {
            rows.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() || rows.is_empty() {
        rows.push(current);
    }

    rows
}

struct Cursor {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl Cursor {
    fn advance(&mut self, by: f32) {
        if self.y - by < MARGIN {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
            self.pages += 1;
        }
        self.y -= by;
    }

    fn write(&mut self, line: &Line, regular: &IndirectFontRef, bold: &IndirectFontRef) {
        let (size, advance) = metrics(line.style);
        let font = match line.style {
            LineStyle::Body => regular,
            _ => bold,
        };

        if line.style == LineStyle::Heading || line.style == LineStyle::Status {
            self.advance(advance / 2.0);
        }

        for row in wrap(&line.text) {
            self.advance(advance);
            self.layer.use_text(row, size, Mm(MARGIN), Mm(self.y), font);
        }
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, ctx: &RenderContext) -> Result<Vec<u8>, RenderError> {
        let title = format!("Delivery note {}", ctx.note.id);
        let (doc, page, layer) = PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);

        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;

        let layer = doc.get_page(page).get_layer(layer);
        let mut cursor = Cursor {
            doc,
            layer,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        };

        for line in layout(ctx) {
            cursor.write(&line, &regular, &bold);
        }

        tracing::debug!(note_id = %ctx.note.id, pages = cursor.pages, "Rendered delivery note");

        cursor
            .doc
            .save_to_bytes()
            .map_err(|e| RenderError::Pdf(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::delivery_note::{NoteFormat, WorkerLine};
    use crate::render::tests::context;

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("short line"), vec!["short line"]);
        assert_eq!(wrap(""), vec![""]);

        let long = "word ".repeat(40);
        let rows = wrap(&long);
        assert!(rows.len() > 1);
        assert!(rows.iter().all(|r| r.chars().count() <= WRAP_AT));
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = PdfRenderer::new().render(&context(NoteFormat::Both)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_paginates_long_notes() {
        let mut ctx = context(NoteFormat::Hours);
        ctx.note.workers = (0..200)
            .map(|i| WorkerLine {
                name: format!("Worker {}", i),
                hours: 1.0,
            })
            .collect();

        let bytes = PdfRenderer::new().render(&ctx).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
