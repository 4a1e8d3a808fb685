//! PDF rendering with printpdf.
//!
//! A4 pages, fixed 10 mm line pitch, bold 14 pt headings and 12 pt body
//! text. Long lines are word-wrapped and a new page starts once the cursor
//! reaches the bottom margin.
//!
//! The built-in Helvetica faces are WinAnsi-encoded. printpdf drops any
//! character outside that encoding without complaint, so every line is
//! checked up front and rendering fails instead of printing a different
//! name or address than the one on screen.

use std::io::{BufWriter, Write};

use printpdf::lopdf::{self, Object, ObjectId};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use tempfile::Builder;
use tracing::debug;

use crate::config::ReportConfig;
use crate::error::ReportRenderError;

use super::layout::{ReportDocument, ReportLine};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_LEFT_MM: f32 = 10.0;
const MARGIN_TOP_MM: f32 = 10.0;
const MARGIN_BOTTOM_MM: f32 = 15.0;
const LINE_HEIGHT_MM: f32 = 10.0;
const HEADING_SIZE_PT: f32 = 14.0;
const BODY_SIZE_PT: f32 = 12.0;

const PT_TO_MM: f32 = 0.352_778;
// Helvetica's average advance is about half an em.
const AVG_CHAR_EM: f32 = 0.5;

const FONT_ENCODING: &str = "WinAnsiEncoding";

/// Characters that fit on one line at the given font size.
fn chars_per_line(font_size_pt: f32) -> usize {
    let usable = PAGE_WIDTH_MM - 2.0 * MARGIN_LEFT_MM;
    let char_width = font_size_pt * AVG_CHAR_EM * PT_TO_MM;
    (usable / char_width).floor().max(1.0) as usize
}

/// Greedy word wrap. Words longer than `width` are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn line_style(line: &ReportLine) -> (bool, f32) {
    match line {
        ReportLine::Heading(_) => (true, HEADING_SIZE_PT),
        ReportLine::Body(_) | ReportLine::Spacer => (false, BODY_SIZE_PT),
    }
}

/// The text lines drawn on the page, in drawing order, after wrapping.
/// Spacers take vertical room but draw nothing, so they are omitted.
pub fn rendered_lines(document: &ReportDocument) -> Vec<String> {
    document
        .lines()
        .iter()
        .flat_map(|line| {
            let (_, size) = line_style(line);
            wrap(line.text(), chars_per_line(size))
        })
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Reject text the report font cannot represent.
pub fn check_encodable(document: &ReportDocument) -> Result<(), ReportRenderError> {
    for line in document.lines() {
        let text = line.text();
        for ch in text.chars().filter(|c| !c.is_whitespace()) {
            let mut buf = [0u8; 4];
            let encoded = lopdf::Document::encode_text(Some(FONT_ENCODING), ch.encode_utf8(&mut buf));
            if encoded.is_empty() {
                return Err(ReportRenderError::UnsupportedCharacter {
                    ch,
                    line: text.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Replace indirect `/Font` resource entries with the dictionaries they
/// point to, so readers that only look at direct font maps (text
/// extractors, some accessibility tools) pick up the WinAnsi encoding.
fn inline_font_resources(bytes: &[u8]) -> Result<Vec<u8>, ReportRenderError> {
    let pdf_err = |e: lopdf::Error| ReportRenderError::Pdf(e.to_string());
    let mut pdf = lopdf::Document::load_mem(bytes).map_err(pdf_err)?;

    let mut patches: Vec<(ObjectId, lopdf::Dictionary)> = Vec::new();
    for page_id in pdf.get_pages().into_values() {
        let Ok(resources_id) = pdf
            .get_dictionary(page_id)
            .and_then(|page| page.get(b"Resources"))
            .and_then(Object::as_reference)
        else {
            continue;
        };
        let Ok(fonts_id) = pdf
            .get_dictionary(resources_id)
            .and_then(|resources| resources.get(b"Font"))
            .and_then(Object::as_reference)
        else {
            continue;
        };
        let fonts = pdf.get_dictionary(fonts_id).map_err(pdf_err)?.clone();
        patches.push((resources_id, fonts));
    }

    for (resources_id, fonts) in patches {
        pdf.get_dictionary_mut(resources_id)
            .map_err(pdf_err)?
            .set("Font", Object::Dictionary(fonts));
    }

    let mut out = Vec::with_capacity(bytes.len());
    pdf.save_to(&mut out).map_err(|e| ReportRenderError::Pdf(e.to_string()))?;
    Ok(out)
}

struct Cursor {
    layer: PdfLayerReference,
    /// Distance from the top edge of the current page.
    offset_mm: f32,
}

/// Build the PDF and return its bytes through a scoped temporary file.
/// The temporary file is removed on every exit path.
pub fn render_pdf(
    document: &ReportDocument,
    config: &ReportConfig,
) -> Result<Vec<u8>, ReportRenderError> {
    check_encodable(document)?;

    let (doc, page, layer) = PdfDocument::new(
        "Classification Report",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let regular: IndirectFontRef = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportRenderError::Pdf(e.to_string()))?;
    let bold: IndirectFontRef = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportRenderError::Pdf(e.to_string()))?;

    let mut cursor = Cursor {
        layer: doc.get_page(page).get_layer(layer),
        offset_mm: MARGIN_TOP_MM,
    };
    let mut pages = 1;

    for line in document.lines() {
        let (is_heading, size) = line_style(line);
        let font = if is_heading { &bold } else { &regular };

        for segment in wrap(line.text(), chars_per_line(size)) {
            if cursor.offset_mm + LINE_HEIGHT_MM > PAGE_HEIGHT_MM - MARGIN_BOTTOM_MM {
                let (next_page, next_layer) =
                    doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
                cursor = Cursor {
                    layer: doc.get_page(next_page).get_layer(next_layer),
                    offset_mm: MARGIN_TOP_MM,
                };
                pages += 1;
            }
            if !segment.is_empty() {
                // Baseline sits in the lower part of the line box.
                let baseline = PAGE_HEIGHT_MM - cursor.offset_mm - LINE_HEIGHT_MM * 0.7;
                cursor
                    .layer
                    .use_text(segment, size, Mm(MARGIN_LEFT_MM), Mm(baseline), font);
            }
            cursor.offset_mm += LINE_HEIGHT_MM;
        }
    }

    drop(cursor);
    let raw = doc
        .save_to_bytes()
        .map_err(|e| ReportRenderError::Pdf(e.to_string()))?;
    let pdf = inline_font_resources(&raw)?;

    let mut artifact = match &config.temp_dir {
        Some(dir) => Builder::new()
            .prefix("report")
            .suffix(".pdf")
            .tempfile_in(dir)?,
        None => Builder::new().prefix("report").suffix(".pdf").tempfile()?,
    };

    {
        let mut writer = BufWriter::new(artifact.as_file_mut());
        writer.write_all(&pdf)?;
        writer.flush()?;
    }

    let bytes = std::fs::read(artifact.path())?;
    if bytes.len() != pdf.len() {
        return Err(ReportRenderError::Pdf(format!(
            "report artifact truncated: wrote {} bytes, read {}",
            pdf.len(),
            bytes.len()
        )));
    }
    debug!(bytes = bytes.len(), pages, "Report rendered");
    Ok(bytes)
}
