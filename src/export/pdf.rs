//! Drawn A4 PDF.
//!
//! Coordinates are millimetres from the bottom-left corner, as printpdf
//! expects. Text is set in the bundled DejaVu Sans pair (or a configured
//! TTF) and measured with ttf-parser for right alignment. The built-in
//! Helvetica pair is an explicit fallback that only covers WinAnsi, so it
//! uses an average-width estimate and spells out currency codes.

use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rgb,
};

use crate::currency::currency_symbol;
use crate::error::{InvoiceError, InvoiceResult};
use crate::render::{InvoiceLayout, PartyBlock, TextBlock, ITEM_COLUMNS};

use super::{pdf_file_name, ExportKind, Exporter};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_X: f32 = 15.0;
const MARGIN_TOP: f32 = 15.0;
const MARGIN_BOTTOM: f32 = 18.0;
const CONTENT_RIGHT: f32 = PAGE_W - MARGIN_X;
const CONTENT_W: f32 = CONTENT_RIGHT - MARGIN_X;

const PT_TO_MM: f32 = 25.4 / 72.0;
const LOGO_DPI: f32 = 300.0;
const LOGO_BOX_W: f32 = 50.0;
const LOGO_BOX_H: f32 = 22.0;

const BODY_SIZE: f32 = 9.0;
const BODY_LINE_H: f32 = 4.2;

// Item table: description is left-aligned, the numeric columns right-aligned.
const COL_DESC_X: f32 = MARGIN_X + 2.0;
const COL_DESC_W: f32 = 88.0;
const COL_QTY_RIGHT: f32 = 128.0;
const COL_RATE_RIGHT: f32 = 160.0;
const COL_AMOUNT_RIGHT: f32 = CONTENT_RIGHT - 2.0;
const TABLE_HEADER_H: f32 = 8.0;

const TOTALS_LABEL_X: f32 = 130.0;

// Unicode coverage for every currency symbol but the rial sign.
static REGULAR_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");
static BOLD_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans-Bold.ttf");

fn export_err(e: impl std::fmt::Display) -> InvoiceError {
    InvoiceError::Export(e.to_string())
}

/// Where PDF text glyphs come from.
#[derive(Debug, Clone, Default)]
pub enum PdfFont {
    /// DejaVu Sans and DejaVu Sans Bold, compiled into the binary.
    #[default]
    Bundled,
    /// A user TTF, used for both weights.
    Custom(Arc<Vec<u8>>),
    /// PDF base-14 Helvetica. Nothing is embedded and only WinAnsi text draws.
    Helvetica,
}

/// Cheap to clone; a custom font is shared.
#[derive(Debug, Clone, Default)]
pub struct PdfExporter {
    font: PdfFont,
}

impl PdfExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn helvetica() -> Self {
        Self {
            font: PdfFont::Helvetica,
        }
    }

    pub fn font(&self) -> &PdfFont {
        &self.font
    }

    pub fn with_font_bytes(bytes: Vec<u8>) -> InvoiceResult<Self> {
        ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| InvoiceError::Config(format!("invalid PDF font: {e}")))?;
        Ok(Self {
            font: PdfFont::Custom(Arc::new(bytes)),
        })
    }

    pub fn with_font_file(path: &Path) -> InvoiceResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| InvoiceError::Config(format!("cannot read PDF font {}: {e}", path.display())))?;
        Self::with_font_bytes(bytes)
    }

    pub fn from_font_path(path: Option<&Path>) -> InvoiceResult<Self> {
        match path {
            Some(p) => Self::with_font_file(p),
            None => Ok(Self::new()),
        }
    }
}

impl Exporter for PdfExporter {
    fn kind(&self) -> ExportKind {
        ExportKind::Pdf
    }

    fn file_name(&self, invoice_number: &str) -> String {
        pdf_file_name(invoice_number)
    }

    fn render(&self, layout: &InvoiceLayout) -> InvoiceResult<Vec<u8>> {
        generate_pdf_bytes(layout, &self.font).map(|(bytes, _pages)| bytes)
    }
}

enum Metrics<'a> {
    Ttf {
        regular: ttf_parser::Face<'a>,
        bold: ttf_parser::Face<'a>,
    },
    Estimate,
}

impl Metrics<'_> {
    fn width_mm(&self, text: &str, font_size_pt: f32, bold: bool) -> f32 {
        match self {
            Metrics::Ttf { regular, bold: heavy } => {
                text_width_mm_ttf(if bold { heavy } else { regular }, text, font_size_pt)
            }
            Metrics::Estimate => (text.chars().count() as f32) * font_size_pt * 0.52 * PT_TO_MM,
        }
    }

    /// Whether every char of `text` has a glyph in both weights.
    fn covers(&self, text: &str) -> bool {
        match self {
            Metrics::Ttf { regular, bold } => text
                .chars()
                .all(|ch| regular.glyph_index(ch).is_some() && bold.glyph_index(ch).is_some()),
            Metrics::Estimate => text.chars().all(is_win_ansi),
        }
    }
}

fn is_win_ansi(ch: char) -> bool {
    (' '..='~').contains(&ch) || ('\u{a0}'..='\u{ff}').contains(&ch) || ch == '€'
}

fn parse_face(bytes: &[u8]) -> InvoiceResult<ttf_parser::Face<'_>> {
    ttf_parser::Face::parse(bytes, 0)
        .map_err(|_| InvoiceError::Export("failed to parse PDF font for measurement".to_string()))
}

/// Money values as the active font can draw them: `₹100.00`, or
/// `INR 100.00` when the symbol has no glyph.
struct MoneyText {
    symbol: &'static str,
    replacement: Option<String>,
}

impl MoneyText {
    fn new(metrics: &Metrics<'_>, currency: &str) -> Self {
        let symbol = currency_symbol(currency);
        let replacement = (!symbol.is_empty() && !metrics.covers(symbol)).then(|| format!("{} ", currency.trim()));
        Self { symbol, replacement }
    }

    fn show<'v>(&self, value: &'v str) -> Cow<'v, str> {
        match &self.replacement {
            Some(code) => Cow::Owned(value.replacen(self.symbol, code, 1)),
            None => Cow::Borrowed(value),
        }
    }
}

fn text_width_mm_ttf(face: &ttf_parser::Face<'_>, text: &str, font_size_pt: f32) -> f32 {
    let units_per_em = face.units_per_em() as f32;
    if units_per_em <= 0.0 {
        return 0.0;
    }

    let mut width_units: i32 = 0;
    for ch in text.chars() {
        let Some(gid) = face.glyph_index(ch) else {
            continue;
        };
        width_units += face.glyph_hor_advance(gid).unwrap_or(0) as i32;
    }

    (width_units as f32 / units_per_em) * font_size_pt * PT_TO_MM
}

fn wrap_text_by_width(
    metrics: &Metrics<'_>,
    input: &str,
    font_size: f32,
    max_width_mm: f32,
    bold: bool,
) -> Vec<String> {
    let fits = |s: &str| metrics.width_mm(s, font_size, bold) <= max_width_mm;
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in input.split_whitespace() {
        if !current.is_empty() {
            let candidate = format!("{current} {word}");
            if fits(&candidate) {
                current = candidate;
                continue;
            }
            out.push(std::mem::take(&mut current));
        }

        if fits(word) {
            current.push_str(word);
            continue;
        }

        // Split a single too-long word into chunks.
        for ch in word.chars() {
            let mut candidate = current.clone();
            candidate.push(ch);
            if current.is_empty() || fits(&candidate) {
                current = candidate;
            } else {
                out.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn hex_to_rgb(hex: &str) -> (f32, f32, f32) {
    let h = hex.trim().trim_start_matches('#');
    let channel = |i: usize| {
        h.get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .map(|v| v as f32 / 255.0)
            .unwrap_or(0.0)
    };
    if h.len() != 6 {
        return (0.0, 0.0, 0.0);
    }
    (channel(0), channel(2), channel(4))
}

fn rgb(c: (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(c.0, c.1, c.2, None))
}

const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
const LIGHT_GRAY: (f32, f32, f32) = (0.9, 0.91, 0.92);

/// Logos stored as `data:image/*;base64,...`. Anything else is skipped.
fn decode_data_url_logo(raw: &str) -> Option<printpdf::image_crate::DynamicImage> {
    let s = raw.trim();
    if !s.to_ascii_lowercase().starts_with("data:") {
        return None;
    }
    let comma = s.find(',')?;
    let (meta, data) = s.split_at(comma);
    if !meta.to_ascii_lowercase().contains(";base64") {
        return None;
    }
    let bytes = base64::engine::general_purpose::STANDARD.decode(data[1..].trim()).ok()?;
    printpdf::image_crate::load_from_memory(&bytes).ok()
}

/// Drawing state for the current page.
struct Canvas<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    metrics: Metrics<'a>,
    y: f32,
    pages: usize,
}

impl Canvas<'_> {
    fn text(&self, text: &str, size: f32, x: f32, y: f32, bold: bool, color: (f32, f32, f32)) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.set_fill_color(rgb(color));
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
        self.layer.set_fill_color(rgb(BLACK));
    }

    fn text_right(&self, text: &str, size: f32, x_right: f32, y: f32, bold: bool, color: (f32, f32, f32)) {
        let x = (x_right - self.metrics.width_mm(text, size, bold)).max(0.0);
        self.text(text, size, x, y, bold, color);
    }

    fn rule(&self, x1: f32, x2: f32, y: f32, thickness: f32, color: (f32, f32, f32)) {
        self.layer.set_outline_color(rgb(color));
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(printpdf::Line {
            points: vec![
                (printpdf::Point::new(Mm(x1), Mm(y)), false),
                (printpdf::Point::new(Mm(x2), Mm(y)), false),
            ],
            is_closed: false,
        });
        self.layer.set_outline_color(rgb(BLACK));
    }

    fn fill_rect(&self, x: f32, y_top: f32, w: f32, h: f32, color: (f32, f32, f32)) {
        use printpdf::{path::PaintMode, Rect};

        self.layer.set_fill_color(rgb(color));
        let rect = Rect::new(Mm(x), Mm(y_top - h), Mm(x + w), Mm(y_top)).with_mode(PaintMode::Fill);
        self.layer.add_rect(rect);
        self.layer.set_fill_color(rgb(BLACK));
    }

    /// Starts a new page when `needed` millimetres no longer fit. Returns whether it did.
    fn ensure_space(&mut self, needed: f32) -> bool {
        if self.y - needed >= MARGIN_BOTTOM {
            return false;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_H - MARGIN_TOP;
        self.pages += 1;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PartyStyle {
    Heading,
    Name,
    Body,
}

impl PartyStyle {
    fn size(self) -> f32 {
        match self {
            PartyStyle::Heading => 8.0,
            PartyStyle::Name => 11.0,
            PartyStyle::Body => BODY_SIZE,
        }
    }

    fn advance(self) -> f32 {
        match self {
            PartyStyle::Heading => 5.5,
            PartyStyle::Name => 5.0,
            PartyStyle::Body => BODY_LINE_H,
        }
    }
}

/// A party column broken into drawable lines, name and address wrapped to `width`.
fn party_lines(metrics: &Metrics<'_>, party: &PartyBlock, width: f32) -> Vec<(PartyStyle, String)> {
    let mut out = vec![(PartyStyle::Heading, party.heading.to_uppercase())];
    let name_size = PartyStyle::Name.size();
    out.extend(
        wrap_text_by_width(metrics, &party.name, name_size, width, true)
            .into_iter()
            .map(|l| (PartyStyle::Name, l)),
    );
    for line in &party.lines {
        out.extend(
            wrap_text_by_width(metrics, line, BODY_SIZE, width, false)
                .into_iter()
                .map(|l| (PartyStyle::Body, l)),
        );
    }
    out
}

/// From and To side by side, one row at a time so long addresses break
/// onto the next page.
fn draw_parties(c: &mut Canvas<'_>, from: &PartyBlock, to: &PartyBlock, secondary: (f32, f32, f32)) {
    let col_w = (CONTENT_W - 10.0) / 2.0;
    let columns = [
        (MARGIN_X, party_lines(&c.metrics, from, col_w)),
        (MARGIN_X + col_w + 10.0, party_lines(&c.metrics, to, col_w)),
    ];
    let rows = columns.iter().map(|(_, lines)| lines.len()).max().unwrap_or(0);

    for i in 0..rows {
        let advance = columns
            .iter()
            .filter_map(|(_, lines)| lines.get(i))
            .map(|(style, _)| style.advance())
            .fold(0.0_f32, f32::max);
        c.ensure_space(advance);
        for (x, lines) in &columns {
            if let Some((style, text)) = lines.get(i) {
                let (bold, color) = match style {
                    PartyStyle::Heading => (true, secondary),
                    PartyStyle::Name => (true, BLACK),
                    PartyStyle::Body => (false, BLACK),
                };
                c.text(text, style.size(), *x, c.y, bold, color);
            }
        }
        c.y -= advance;
    }
}

fn draw_table_header(c: &mut Canvas<'_>, primary: (f32, f32, f32), accent: (f32, f32, f32)) {
    let top = c.y;
    c.fill_rect(MARGIN_X, top, CONTENT_W, TABLE_HEADER_H, accent);
    let baseline = top - 5.5;
    c.text(ITEM_COLUMNS[0], BODY_SIZE, COL_DESC_X, baseline, true, primary);
    c.text_right(ITEM_COLUMNS[1], BODY_SIZE, COL_QTY_RIGHT, baseline, true, primary);
    c.text_right(ITEM_COLUMNS[2], BODY_SIZE, COL_RATE_RIGHT, baseline, true, primary);
    c.text_right(ITEM_COLUMNS[3], BODY_SIZE, COL_AMOUNT_RIGHT, baseline, true, primary);
    c.y -= TABLE_HEADER_H;
}

fn draw_text_block(c: &mut Canvas<'_>, block: &TextBlock, secondary: (f32, f32, f32)) {
    c.ensure_space(5.5 + BODY_LINE_H);
    c.text(&block.heading.to_uppercase(), 8.0, MARGIN_X, c.y, true, secondary);
    c.y -= 5.5;
    for line in &block.lines {
        let wrapped = wrap_text_by_width(&c.metrics, line, BODY_SIZE, CONTENT_W, false);
        if wrapped.is_empty() {
            // Blank line in the source text.
            c.y -= BODY_LINE_H;
            continue;
        }
        for w in wrapped {
            c.ensure_space(BODY_LINE_H);
            c.text(&w, BODY_SIZE, MARGIN_X, c.y, false, BLACK);
            c.y -= BODY_LINE_H;
        }
    }
    c.y -= 4.0;
}

/// Returns the PDF bytes and the number of pages drawn.
pub fn generate_pdf_bytes(layout: &InvoiceLayout, font: &PdfFont) -> InvoiceResult<(Vec<u8>, usize)> {
    let colors = layout.theme.colors();
    let primary = hex_to_rgb(colors.primary);
    let secondary = hex_to_rgb(colors.secondary);
    let accent = hex_to_rgb(colors.accent);

    let title = format!("Invoice {}", layout.header.invoice_number.trim());
    let (doc, page1, layer1) = PdfDocument::new(&title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");

    let (regular, bold, metrics) = match font {
        PdfFont::Bundled => (
            doc.add_external_font(Cursor::new(REGULAR_FONT)).map_err(export_err)?,
            doc.add_external_font(Cursor::new(BOLD_FONT)).map_err(export_err)?,
            Metrics::Ttf {
                regular: parse_face(REGULAR_FONT)?,
                bold: parse_face(BOLD_FONT)?,
            },
        ),
        PdfFont::Custom(bytes) => {
            let bytes = bytes.as_slice();
            let font = doc.add_external_font(Cursor::new(bytes)).map_err(export_err)?;
            (
                font.clone(),
                font,
                Metrics::Ttf {
                    regular: parse_face(bytes)?,
                    bold: parse_face(bytes)?,
                },
            )
        }
        PdfFont::Helvetica => (
            doc.add_builtin_font(BuiltinFont::Helvetica).map_err(export_err)?,
            doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(export_err)?,
            Metrics::Estimate,
        ),
    };
    let money = MoneyText::new(&metrics, &layout.currency);

    let pages = {
        let mut c = Canvas {
            doc: &doc,
            layer: doc.get_page(page1).get_layer(layer1),
            regular,
            bold,
            metrics,
            y: PAGE_H - MARGIN_TOP,
            pages: 1,
        };

        // Header: title block left, logo top-right.
        let header_top = c.y;
        let mut logo_bottom = header_top;
        if let Some(img) = layout.header.logo.as_deref().and_then(decode_data_url_logo) {
            let natural_w = img.width().max(1) as f32 / LOGO_DPI * 25.4;
            let natural_h = img.height().max(1) as f32 / LOGO_DPI * 25.4;
            let scale = (LOGO_BOX_W / natural_w).min(LOGO_BOX_H / natural_h).max(0.01);
            let w = natural_w * scale;
            let h = natural_h * scale;
            logo_bottom = header_top - h;

            Image::from_dynamic_image(&img).add_to_layer(
                c.layer.clone(),
                ImageTransform {
                    translate_x: Some(Mm(CONTENT_RIGHT - w)),
                    translate_y: Some(Mm(logo_bottom)),
                    rotate: None,
                    scale_x: Some(scale),
                    scale_y: Some(scale),
                    dpi: Some(LOGO_DPI),
                },
            );
        }

        c.y -= 8.0;
        c.text(&layout.header.title, 24.0, MARGIN_X, c.y, true, primary);
        c.y -= 7.0;
        c.text(&format!("#{}", layout.header.invoice_number), 11.0, MARGIN_X, c.y, false, secondary);
        c.y -= 6.0;
        c.text(&format!("Date: {}", layout.header.date), BODY_SIZE, MARGIN_X, c.y, false, BLACK);
        if let Some(due) = layout.header.due_date.as_deref() {
            c.y -= BODY_LINE_H;
            c.text(&format!("Due Date: {}", due), BODY_SIZE, MARGIN_X, c.y, false, BLACK);
        }
        c.y = c.y.min(logo_bottom) - 6.0;
        c.rule(MARGIN_X, CONTENT_RIGHT, c.y, 0.6, secondary);
        c.y -= 8.0;

        // From / To
        draw_parties(&mut c, &layout.from, &layout.to, secondary);
        c.y -= 6.0;

        // Items
        c.ensure_space(TABLE_HEADER_H + 8.0);
        draw_table_header(&mut c, primary, accent);
        for row in &layout.rows {
            let mut lines = wrap_text_by_width(&c.metrics, &row.description, BODY_SIZE, COL_DESC_W, false);
            if lines.is_empty() {
                lines.push(String::new());
            }
            let row_h = lines.len() as f32 * BODY_LINE_H + 3.2;
            if c.ensure_space(row_h) {
                draw_table_header(&mut c, primary, accent);
            }

            let baseline = c.y - 4.5;
            let mut line_y = baseline;
            for line in &lines {
                c.text(line, BODY_SIZE, COL_DESC_X, line_y, false, BLACK);
                line_y -= BODY_LINE_H;
            }
            c.text_right(&row.quantity, BODY_SIZE, COL_QTY_RIGHT, baseline, false, BLACK);
            c.text_right(&money.show(&row.rate), BODY_SIZE, COL_RATE_RIGHT, baseline, false, BLACK);
            c.text_right(&money.show(&row.amount), BODY_SIZE, COL_AMOUNT_RIGHT, baseline, false, BLACK);

            c.y -= row_h;
            c.rule(MARGIN_X, CONTENT_RIGHT, c.y, 0.2, LIGHT_GRAY);
        }

        // Totals
        c.ensure_space(layout.totals.len() as f32 * 6.0 + 10.0);
        c.y -= 2.0;
        for line in &layout.totals {
            if line.emphasized() {
                c.y -= 2.0;
                c.rule(TOTALS_LABEL_X, CONTENT_RIGHT, c.y, 0.8, primary);
                c.y -= 6.0;
                c.text(&line.label, 12.0, TOTALS_LABEL_X, c.y, true, primary);
                c.text_right(&money.show(&line.value), 12.0, COL_AMOUNT_RIGHT, c.y, true, primary);
            } else {
                c.y -= 5.5;
                c.text(&line.label, BODY_SIZE, TOTALS_LABEL_X, c.y, false, secondary);
                c.text_right(&money.show(&line.value), BODY_SIZE, COL_AMOUNT_RIGHT, c.y, false, BLACK);
            }
        }
        c.y -= 12.0;

        // Notes, then terms
        for block in [&layout.notes, &layout.terms].into_iter().flatten() {
            draw_text_block(&mut c, block, secondary);
        }

        c.pages
    };

    let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer).map_err(export_err)?;
    let bytes = writer.into_inner().map_err(export_err)?;
    Ok((bytes, pages))
}
