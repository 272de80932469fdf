//! Downloadable A4 report.
//!
//! The page layout is computed first as a list of positioned lines, then
//! written out with `printpdf`. Every list item from the analysis is placed;
//! a new page starts whenever the cursor passes [`PAGE_BREAK_Y`].

use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rgb};
use std::io::BufWriter;
use thiserror::Error;
use tracing::warn;

use super::ReportInputs;
use crate::models::non_blank;

const PAGE_WIDTH: f64 = 210.0;
const PAGE_HEIGHT: f64 = 297.0;
const LEFT_MARGIN: f64 = 20.0;
const INDENT: f64 = 25.0;
const TOP_Y: f64 = 20.0;
/// Distance from the top of the page past which the next line starts a new page.
pub const PAGE_BREAK_Y: f64 = 270.0;
const LINE_HEIGHT: f64 = 7.0;
const WRAP_CHARS: usize = 90;
const WRAP_CHARS_INDENTED: usize = 85;

const TITLE: &str = "HealthAware AI - Health Report";
const DISCLAIMER_HEADLINE: &str =
    "DISCLAIMER: This is an AI-generated educational report. NOT A MEDICAL DIAGNOSIS.";
const DISCLAIMER_ADVICE: &str = "Consult a qualified healthcare provider for medical decisions.";

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF font error: {0}")]
    Font(String),

    #[error("PDF save error: {0}")]
    Save(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextColor(pub u8, pub u8, pub u8);

impl TextColor {
    pub const BLACK: TextColor = TextColor(0, 0, 0);
    pub const GREY: TextColor = TextColor(100, 100, 100);
    pub const BLUE: TextColor = TextColor(37, 99, 235);
    pub const RED: TextColor = TextColor(220, 38, 38);
    pub const GREEN: TextColor = TextColor(0, 100, 0);
    pub const AMBER: TextColor = TextColor(180, 83, 9);

    fn to_pdf(self) -> Color {
        Color::Rgb(Rgb::new(
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0,
            None,
        ))
    }
}

/// One line of text at a fixed place. `y` is measured down from the top of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLine {
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub size: f32,
    pub bold: bool,
    pub color: TextColor,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfLayout {
    pub pages: usize,
    pub lines: Vec<PdfLine>,
}

impl PdfLayout {
    pub fn contains(&self, text: &str) -> bool {
        self.lines.iter().any(|line| line.text.contains(text))
    }

    /// Lines holding characters outside Latin-1, which the builtin Helvetica
    /// font has no glyphs for.
    pub fn unsupported_lines(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| line.text.chars().any(|c| u32::from(c) > 0xFF))
            .count()
    }
}

#[derive(Debug, Clone, Copy)]
struct Style {
    size: f32,
    bold: bool,
    color: TextColor,
}

impl Style {
    const fn new(size: f32, bold: bool, color: TextColor) -> Self {
        Self { size, bold, color }
    }
}

struct LayoutWriter {
    page: usize,
    y: f64,
    lines: Vec<PdfLine>,
}

impl LayoutWriter {
    fn new() -> Self {
        Self {
            page: 0,
            y: TOP_Y,
            lines: Vec::new(),
        }
    }

    fn new_page(&mut self) {
        self.page += 1;
        self.y = TOP_Y;
    }

    /// Start a new page if fewer than the given millimetres remain before the break line.
    fn keep_room(&mut self, limit: f64) {
        if self.y > limit {
            self.new_page();
        }
    }

    fn gap(&mut self, mm: f64) {
        self.y += mm;
    }

    fn line(&mut self, text: impl Into<String>, x: f64, style: Style, advance: f64) {
        self.keep_room(PAGE_BREAK_Y);
        self.lines.push(PdfLine {
            page: self.page,
            x,
            y: self.y,
            size: style.size,
            bold: style.bold,
            color: style.color,
            text: text.into(),
        });
        self.y += advance;
    }

    fn wrapped(&mut self, text: &str, x: f64, max_chars: usize, style: Style, advance: f64) {
        for line in wrap_text(text, max_chars) {
            self.line(line, x, style, advance);
        }
    }

    fn finish(self) -> PdfLayout {
        PdfLayout {
            pages: self.page + 1,
            lines: self.lines,
        }
    }
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    // Words wider than a whole line are cut into line-sized pieces.
    let pieces = text.split_whitespace().flat_map(|word| {
        let chars: Vec<char> = word.chars().collect();
        chars
            .chunks(max_chars.max(1))
            .map(|chunk| chunk.iter().collect::<String>())
            .collect::<Vec<_>>()
    });

    for piece in pieces {
        let width = current.chars().count();
        if width > 0 && width + piece.chars().count() + 1 > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&piece);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn or_na(field: &Option<String>) -> &str {
    non_blank(field).unwrap_or("N/A")
}

pub fn layout_report(inputs: ReportInputs<'_>, generated_at: DateTime<Utc>) -> PdfLayout {
    const BODY: Style = Style::new(10.0, false, TextColor::BLACK);
    const BODY_BOLD: Style = Style::new(10.0, true, TextColor::BLACK);
    const TEXT: Style = Style::new(11.0, false, TextColor::BLACK);
    const TEXT_BOLD: Style = Style::new(11.0, true, TextColor::BLACK);
    const HEADING: Style = Style::new(14.0, true, TextColor::BLACK);

    let ReportInputs {
        analysis,
        profile,
        symptoms,
        answers,
    } = inputs;
    let mut w = LayoutWriter::new();

    w.line(TITLE, LEFT_MARGIN, Style::new(22.0, true, TextColor::BLUE), 10.0);
    w.line(
        format!("Date: {}", generated_at.format("%Y-%m-%d %H:%M UTC")),
        LEFT_MARGIN,
        Style::new(10.0, false, TextColor::GREY),
        15.0,
    );

    w.line(
        DISCLAIMER_HEADLINE,
        LEFT_MARGIN,
        Style::new(9.0, true, TextColor::RED),
        5.0,
    );
    w.line(
        DISCLAIMER_ADVICE,
        LEFT_MARGIN,
        Style::new(9.0, false, TextColor::RED),
        15.0,
    );

    w.line("Patient Information", LEFT_MARGIN, HEADING, 10.0);
    w.wrapped(
        &format!(
            "Name: {} | Age: {} | Gender: {}",
            profile.display_name(),
            or_na(&profile.age),
            or_na(&profile.gender)
        ),
        LEFT_MARGIN,
        WRAP_CHARS,
        TEXT,
        LINE_HEIGHT,
    );
    if non_blank(&profile.contact).is_some() || non_blank(&profile.location).is_some() {
        w.wrapped(
            &format!(
                "Contact: {} | Location: {}",
                or_na(&profile.contact),
                or_na(&profile.location)
            ),
            LEFT_MARGIN,
            WRAP_CHARS,
            TEXT,
            LINE_HEIGHT,
        );
    }
    w.gap(5.0);

    w.line("Reported Symptoms", LEFT_MARGIN, TEXT_BOLD, 8.0);
    w.wrapped(
        &format!("Description: {}", symptoms.description),
        LEFT_MARGIN,
        WRAP_CHARS,
        BODY,
        5.0,
    );
    w.gap(5.0);
    w.wrapped(
        &format!(
            "Duration: {} | Severity: {}",
            symptoms.duration, symptoms.severity
        ),
        LEFT_MARGIN,
        WRAP_CHARS,
        BODY,
        5.0,
    );
    w.gap(5.0);

    if !answers.is_empty() {
        w.line(
            "Clarifying Questions & Answers",
            LEFT_MARGIN,
            Style::new(12.0, true, TextColor::BLACK),
            8.0,
        );
        for qa in answers {
            w.wrapped(
                &format!("Q: {}", qa.question_text),
                LEFT_MARGIN,
                WRAP_CHARS,
                BODY,
                5.0,
            );
            w.wrapped(
                &format!("A: {}", qa.answer),
                INDENT,
                WRAP_CHARS_INDENTED,
                Style::new(10.0, false, TextColor::BLUE),
                LINE_HEIGHT,
            );
        }
        w.gap(10.0);
    }

    w.keep_room(250.0);
    w.line("Analysis Summary", LEFT_MARGIN, HEADING, 10.0);
    w.wrapped(&analysis.executive_summary, LEFT_MARGIN, WRAP_CHARS, TEXT, 6.0);
    w.gap(10.0);

    w.line(
        format!("Risk Assessment: {}", analysis.risk_score),
        LEFT_MARGIN,
        TEXT_BOLD,
        LINE_HEIGHT,
    );
    w.wrapped(&analysis.risk_explanation, LEFT_MARGIN, WRAP_CHARS, TEXT, 6.0);
    w.gap(10.0);

    w.line("Possible Considerations", LEFT_MARGIN, TEXT_BOLD, 8.0);
    for condition in &analysis.conditions {
        w.wrapped(
            &format!("- {} ({})", condition.name, condition.likelihood),
            LEFT_MARGIN,
            WRAP_CHARS,
            BODY_BOLD,
            5.0,
        );
        w.wrapped(&condition.relevance, INDENT, WRAP_CHARS_INDENTED, BODY, 5.0);
        w.gap(5.0);
    }

    w.keep_room(220.0);
    w.gap(5.0);
    w.line("Immediate Actions & Red Flags", LEFT_MARGIN, TEXT_BOLD, 8.0);
    for flag in &analysis.red_flags {
        w.wrapped(
            &format!("[!] {flag}"),
            LEFT_MARGIN,
            WRAP_CHARS,
            Style::new(11.0, false, TextColor::RED),
            6.0,
        );
    }
    w.gap(5.0);
    for step in &analysis.self_care_steps {
        w.wrapped(
            &format!("[+] {step}"),
            LEFT_MARGIN,
            WRAP_CHARS,
            Style::new(11.0, false, TextColor::GREEN),
            6.0,
        );
    }

    if !analysis.medication_caution.is_empty() {
        w.gap(5.0);
        w.line("Medication Caution", LEFT_MARGIN, TEXT_BOLD, 8.0);
        for caution in &analysis.medication_caution {
            w.wrapped(
                &format!("[!] {caution}"),
                LEFT_MARGIN,
                WRAP_CHARS,
                Style::new(11.0, false, TextColor::AMBER),
                6.0,
            );
        }
    }

    w.finish()
}

pub fn report_file_name(generated_at: DateTime<Utc>) -> String {
    format!("HealthAware_Report_{}.pdf", generated_at.format("%Y-%m-%d"))
}

/// Render the report and return the PDF bytes.
pub fn render_pdf(inputs: ReportInputs<'_>, generated_at: DateTime<Utc>) -> Result<Vec<u8>, PdfError> {
    let layout = layout_report(inputs, generated_at);
    let unsupported = layout.unsupported_lines();
    if unsupported > 0 {
        warn!(
            lines = unsupported,
            "Report text outside Latin-1 cannot be drawn with the builtin PDF font"
        );
    }

    let (doc, first_page, first_layer) =
        PdfDocument::new(TITLE, Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "Layer 1");
    let font: IndirectFontRef = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| PdfError::Font(e.to_string()))?;
    let bold: IndirectFontRef = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| PdfError::Font(e.to_string()))?;

    let mut layers: Vec<PdfLayerReference> = vec![doc.get_page(first_page).get_layer(first_layer)];
    for page in 1..layout.pages {
        let (page_index, layer_index) = doc.add_page(
            Mm(PAGE_WIDTH as f32),
            Mm(PAGE_HEIGHT as f32),
            format!("Layer {}", page + 1),
        );
        layers.push(doc.get_page(page_index).get_layer(layer_index));
    }

    for line in &layout.lines {
        let layer = &layers[line.page];
        layer.set_fill_color(line.color.to_pdf());
        layer.use_text(
            line.text.as_str(),
            line.size,
            Mm(line.x as f32),
            Mm((PAGE_HEIGHT - line.y) as f32),
            if line.bold { &bold } else { &font },
        );
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| PdfError::Save(e.to_string()))?;
    buf.into_inner()
        .map_err(|e| PdfError::Save(e.to_string()))
}
