//! Weekly intelligence report rendered as PDF.
//!
//! The writer emits a minimal PDF 1.4 document using the two standard
//! Helvetica faces with WinAnsi encoding, so no fonts are embedded. Text is
//! forced into Latin-1 first; anything outside it becomes `?`.
//!
//! Layout (A4, 10 mm margins):
//!
//! ```text
//! Project 2025 Weekly Intelligence Report      (centered, 12 pt)
//!
//! Progress Overview                            (bold, 12 pt)
//! {category}: {progress}% (Last Updated: {date})
//!
//! Recent Events                                (bold, 12 pt)
//! {title} ({date})
//! {summary, word-wrapped}
//! ```

use std::io::Write;
use std::path::Path;

use crate::geopolitical::GeopoliticalArticle;
use crate::progress::ProgressEntry;
use tracker_utils_string::to_latin1_lossy;

pub const REPORT_TITLE: &str = "Project 2025 Weekly Intelligence Report";

/// File name offered to HTTP clients.
pub const REPORT_FILENAME: &str = "project2025_report.pdf";

const MM: f32 = 72.0 / 25.4;
const PAGE_WIDTH: f32 = 210.0 * MM;
const PAGE_HEIGHT: f32 = 297.0 * MM;
const MARGIN: f32 = 10.0 * MM;
const HEADING_HEIGHT: f32 = 10.0 * MM;
const LINE_HEIGHT: f32 = 8.0 * MM;
const SECTION_GAP: f32 = 10.0 * MM;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Regular,
    Bold,
}

impl Face {
    fn resource(self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
        }
    }
}

/// Helvetica advance widths (1/1000 em) for 0x20..=0x7E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

fn glyph_width(byte: u8) -> u16 {
    match byte {
        0x20..=0x7e => HELVETICA_WIDTHS[usize::from(byte - 0x20)],
        _ => 556,
    }
}

fn text_width(text: &[u8], size: f32) -> f32 {
    let units: u32 = text.iter().map(|b| u32::from(glyph_width(*b))).sum();
    units as f32 * size / 1000.0
}

/// Greedy word wrap of Latin-1 text to `max_width` points. Words wider than
/// a full line are split by character.
fn wrap(text: &[u8], size: f32, max_width: f32) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut line: Vec<u8> = Vec::new();

    for word in text.split(|b| *b == b' ').filter(|w| !w.is_empty()) {
        let mut candidate = line.clone();
        if !candidate.is_empty() {
            candidate.push(b' ');
        }
        candidate.extend_from_slice(word);
        if text_width(&candidate, size) <= max_width {
            line = candidate;
            continue;
        }

        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        for &byte in word {
            line.push(byte);
            if line.len() > 1 && text_width(&line, size) > max_width {
                line.pop();
                lines.push(std::mem::replace(&mut line, vec![byte]));
            }
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

#[derive(Debug, Clone)]
struct PlacedLine {
    face: Face,
    size: f32,
    x: f32,
    baseline: f32,
    text: Vec<u8>,
}

/// Top-down layout cursor; starts a new page when a line would cross the
/// bottom margin.
struct Layout {
    pages: Vec<Vec<PlacedLine>>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: MARGIN,
        }
    }

    fn gap(&mut self, height: f32) {
        self.y += height;
    }

    fn line(&mut self, face: Face, size: f32, height: f32, text: Vec<u8>, centered: bool) {
        if self.y + height > PAGE_HEIGHT - MARGIN {
            self.pages.push(Vec::new());
            self.y = MARGIN;
        }
        let x = if centered {
            ((PAGE_WIDTH - text_width(&text, size)) / 2.0).max(MARGIN)
        } else {
            MARGIN
        };
        // Vertically centre the glyphs in the cell, measured from the top.
        let baseline = PAGE_HEIGHT - (self.y + height / 2.0 + 0.3 * size);
        if let Some(page) = self.pages.last_mut() {
            page.push(PlacedLine {
                face,
                size,
                x,
                baseline,
                text,
            });
        }
        self.y += height;
    }

    fn paragraph(&mut self, face: Face, size: f32, height: f32, text: &str, centered: bool) {
        let max_width = PAGE_WIDTH - 2.0 * MARGIN;
        for chunk in text.split('\n') {
            for line in wrap(&to_latin1_lossy(chunk), size, max_width) {
                self.line(face, size, height, line, centered);
            }
        }
    }
}

fn escape_pdf_string(text: &[u8], out: &mut Vec<u8>) {
    for &byte in text {
        match byte {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(byte);
            }
            0x20..=0x7e => out.push(byte),
            _ => out.extend_from_slice(format!("\\{byte:03o}").as_bytes()),
        }
    }
}

fn content_stream(lines: &[PlacedLine]) -> Vec<u8> {
    let mut out = Vec::new();
    for line in lines {
        out.extend_from_slice(
            format!(
                "BT /{} {:.2} Tf {:.2} {:.2} Td (",
                line.face.resource(),
                line.size,
                line.x,
                line.baseline
            )
            .as_bytes(),
        );
        escape_pdf_string(&line.text, &mut out);
        out.extend_from_slice(b") Tj ET\n");
    }
    out
}

/// Serializes numbered objects and tracks their byte offsets for the xref.
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    /// Objects must be written in id order starting at 1.
    fn object(&mut self, body: &[u8]) {
        self.offsets.push(self.buf.len());
        let id = self.offsets.len();
        self.buf
            .extend_from_slice(format!("{id} 0 obj\n").as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream_object(&mut self, data: &[u8]) {
        let mut body = format!("<< /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.object(&body);
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_at = self.buf.len();
        let size = self.offsets.len() + 1;
        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for offset in &self.offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n"
        ));
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}

fn lay_out(progress: &[ProgressEntry], events: &[GeopoliticalArticle]) -> Layout {
    let mut layout = Layout::new();
    layout.paragraph(Face::Regular, 12.0, HEADING_HEIGHT, REPORT_TITLE, true);

    layout.gap(SECTION_GAP);
    layout.paragraph(Face::Bold, 12.0, HEADING_HEIGHT, "Progress Overview", false);
    for item in progress {
        let line = format!(
            "{}: {}% (Last Updated: {})",
            item.title, item.progress, item.last_updated
        );
        layout.paragraph(Face::Regular, 11.0, LINE_HEIGHT, &line, false);
    }

    layout.gap(SECTION_GAP);
    layout.paragraph(Face::Bold, 12.0, HEADING_HEIGHT, "Recent Events", false);
    for event in events {
        let heading = format!("{} ({})", event.title, event.date);
        layout.paragraph(Face::Regular, 11.0, LINE_HEIGHT, &heading, false);
        layout.paragraph(Face::Regular, 11.0, LINE_HEIGHT, &event.summary, false);
    }
    layout
}

/// Render the report to PDF bytes. Infallible: unrepresentable characters
/// are replaced, never rejected.
pub fn render_report(progress: &[ProgressEntry], events: &[GeopoliticalArticle]) -> Vec<u8> {
    let layout = lay_out(progress, events);
    let page_count = layout.pages.len();

    // 1 catalog, 2 page tree, 3-4 fonts, then (page, content) pairs.
    let page_ids: Vec<usize> = (0..page_count).map(|i| 5 + 2 * i).collect();
    let kids = page_ids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");

    let mut pdf = PdfWriter::new();
    pdf.object(b"<< /Type /Catalog /Pages 2 0 R >>");
    pdf.object(format!("<< /Type /Pages /Kids [{kids}] /Count {page_count} >>").as_bytes());
    pdf.object(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );
    pdf.object(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
    );

    for (page, id) in layout.pages.iter().zip(&page_ids) {
        pdf.object(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH:.2} {PAGE_HEIGHT:.2}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                id + 1
            )
            .as_bytes(),
        );
        pdf.stream_object(&content_stream(page));
    }

    pdf.finish()
}

/// Render the report into a new temporary `.pdf` file under `dir` (or the
/// system temp dir). The file is removed when the handle is dropped.
pub fn write_report_file(
    progress: &[ProgressEntry],
    events: &[GeopoliticalArticle],
    dir: Option<&Path>,
) -> Result<tempfile::NamedTempFile, ReportError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("agenda-report-").suffix(".pdf");
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(&render_report(progress, events))?;
    file.flush()?;
    Ok(file)
}
