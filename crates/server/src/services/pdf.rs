//! Renders a note as an A4 PDF using the built-in Helvetica faces, so no font
//! files are needed at runtime.

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use crate::{
    db::models::Note,
    error::{AppError, Result},
};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const LINE_HEIGHT: f32 = 5.5;
const BODY_SIZE: f32 = 11.0;
const TITLE_SIZE: f32 = 18.0;
/// Helvetica at 11pt fits about this many characters between the margins
const WRAP_COLUMNS: usize = 88;

const STAMP: &str = "%B %d, %Y at %I:%M %p";

/// Tracks the write position and starts a new page when the current one is full
struct Writer {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl Writer {
    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        if self.y < MARGIN {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
        self.layer.use_text(latin1(text), size, Mm(MARGIN), Mm(self.y), font);
        self.y -= LINE_HEIGHT * size / BODY_SIZE;
    }

    fn gap(&mut self) {
        self.y -= LINE_HEIGHT;
    }
}

pub fn render_note(note: &Note) -> Result<Vec<u8>> {
    let (doc, page, layer) =
        PdfDocument::new(note.title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let layer = doc.get_page(page).get_layer(layer);

    let mut writer = Writer {
        doc,
        layer,
        y: PAGE_HEIGHT - MARGIN,
    };

    for line in wrap(&note.title, WRAP_COLUMNS / 2) {
        writer.line(&line, TITLE_SIZE, &bold);
    }
    writer.gap();

    let meta = [
        format!("Subject: {}", note.subject_name),
        format!("Progress: {}", capitalized(note.progress.as_str())),
        format!("Created: {}", note.created_at.format(STAMP)),
        format!("Last Updated: {}", note.updated_at.format(STAMP)),
    ];
    for line in &meta {
        writer.line(line, BODY_SIZE, &regular);
    }
    writer.gap();

    for line in wrap(&note.content, WRAP_COLUMNS) {
        writer.line(&line, BODY_SIZE, &regular);
    }
    writer.gap();
    writer.line("Exported from StudyHub", BODY_SIZE, &regular);

    writer.doc.save_to_bytes().map_err(pdf_error)
}

fn pdf_error(e: printpdf::Error) -> AppError {
    AppError::Internal(format!("PDF rendering failed: {e}"))
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The built-in fonts only cover Latin-1
fn latin1(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) < 0x100 && !c.is_control() { c } else { '?' })
        .collect()
}

/// Word-wraps every paragraph to `columns` characters. Blank lines are kept
/// and words longer than a line are split.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > columns {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(word.drain(..columns).collect());
            }
            if word.is_empty() {
                continue;
            }

            let needed = if current.is_empty() { word.len() } else { word.len() + 1 };
            if current.chars().count() + needed > columns {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Progress;
    use chrono::Utc;

    fn note(content: String) -> Note {
        Note {
            id: 1,
            title: "Algebra".to_string(),
            content,
            is_pinned: false,
            progress: Progress::Reading,
            color: "#ffffff".to_string(),
            subject_id: 1,
            subject_name: "Math".to_string(),
            owner_id: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
        assert_eq!(wrap("one\n\ntwo", 10), vec!["one", "", "two"]);
        assert_eq!(wrap("abcdefghijkl", 5), vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn unsupported_characters_are_replaced() {
        assert_eq!(latin1("Übung → π"), "Übung ? ?");
        assert_eq!(capitalized("mastered"), "Mastered");
    }

    #[test]
    fn long_notes_render_to_a_pdf() {
        let content = "A sentence about sets and functions. ".repeat(400);
        let bytes = render_note(&note(content)).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
