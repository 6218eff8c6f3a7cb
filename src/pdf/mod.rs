use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::BillingError;
use crate::models::{ClinicInfo, Invoice, LineItem};

// A4 portrait. All geometry is in millimetres from the bottom-left
// corner of the page.
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 10.0;
const CONTENT_W: f32 = PAGE_W - 2.0 * MARGIN;

const LOGO_BOX: f32 = 28.0;

const RECEIPT_BOX_W: f32 = 80.0;
const RECEIPT_BOX_H: f32 = 36.0;

const CUSTOMER_BOX_H: f32 = 28.0;

// Item table: one bold header row, then fixed-height body rows.
// Column widths sum to CONTENT_W.
const TABLE_H: f32 = 160.0;
const HEADER_ROW_H: f32 = 8.0;
const ROW_H: f32 = 10.0;
const CELL_PAD: f32 = 2.0;
const COLUMNS: [(&str, f32); 5] = [
    ("Item #", 22.0),
    ("Product Description", 95.0),
    ("Qty", 15.0),
    ("Price Per Unit", 28.0),
    ("Cost", 30.0),
];

const COMMENTS_BOX_W: f32 = 120.0;
const COMMENTS_BOX_H: f32 = 35.0;
const TOTAL_BOX_W: f32 = 60.0;

/// Body rows that fit on the single page. Items beyond this are not
/// drawn; the invoice total still covers them.
pub fn row_capacity() -> usize {
    ((TABLE_H - HEADER_ROW_H) / ROW_H) as usize
}

/// Renders the invoice to a single fixed-layout A4 page at `path`.
/// Deterministic for a given input apart from embedded PDF metadata.
/// A missing or unreadable logo is skipped without error; any other
/// failure is fatal to the save and surfaces as `RenderFailure`.
pub fn render_invoice(
    path: &Path,
    invoice: &Invoice,
    items: &[LineItem],
    clinic: &ClinicInfo,
    logo_path: Option<&Path>,
) -> Result<(), BillingError> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Receipt {}", invoice.receipt_number),
        Mm(PAGE_W),
        Mm(PAGE_H),
        "Page 1",
    );
    let layer = doc.get_page(page).get_layer(layer);

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| BillingError::RenderFailure(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| BillingError::RenderFailure(e.to_string()))?;

    let top = PAGE_H - MARGIN;

    // Header band: logo plus clinic identity, left-aligned
    if let Some(logo) = logo_path {
        embed_logo(&layer, logo);
    }
    draw_text(&layer, &bold, &clinic.name, 18.0, MARGIN + 35.0, top - 10.0);
    draw_text(&layer, &regular, &clinic.tagline, 10.0, MARGIN + 35.0, top - 18.0);
    draw_text(&layer, &regular, &clinic.address, 9.0, MARGIN + 35.0, top - 25.0);
    draw_text(&layer, &regular, &clinic.phone, 9.0, MARGIN + 35.0, top - 30.0);

    // Receipt metadata box, right-aligned in the header band
    let meta_x = PAGE_W - MARGIN - RECEIPT_BOX_W;
    let meta_y = top - 5.0 - RECEIPT_BOX_H;
    let label_x = meta_x + 4.0;
    let value_x = meta_x + 45.0;
    draw_box(&layer, meta_x, meta_y, RECEIPT_BOX_W, RECEIPT_BOX_H);
    draw_text(&layer, &bold, "Receipt Number :", 10.0, label_x, meta_y + RECEIPT_BOX_H - 8.0);
    draw_text(&layer, &regular, &invoice.receipt_number, 10.0, value_x, meta_y + RECEIPT_BOX_H - 8.0);
    draw_text(&layer, &bold, "Date :", 10.0, label_x, meta_y + RECEIPT_BOX_H - 16.0);
    draw_text(&layer, &regular, &invoice.date, 10.0, value_x, meta_y + RECEIPT_BOX_H - 16.0);
    draw_text(&layer, &bold, "Payment Method :", 10.0, label_x, meta_y + RECEIPT_BOX_H - 24.0);
    draw_text(&layer, &regular, invoice.payment_method.as_str(), 10.0, value_x, meta_y + RECEIPT_BOX_H - 24.0);

    // Customer box: left half name/address, right half phone/e-mail
    let cust_top = meta_y - 6.0;
    draw_box(&layer, MARGIN, cust_top - CUSTOMER_BOX_H, CONTENT_W, CUSTOMER_BOX_H);
    draw_text(&layer, &bold, "Customer Name :", 10.0, MARGIN + 4.0, cust_top - 8.0);
    draw_text(&layer, &regular, &invoice.customer_name, 10.0, MARGIN + 40.0, cust_top - 8.0);
    draw_text(&layer, &bold, "Address :", 10.0, MARGIN + 4.0, cust_top - 16.0);
    draw_text(&layer, &regular, or_dash(invoice.address.as_deref()), 10.0, MARGIN + 40.0, cust_top - 16.0);
    draw_text(&layer, &bold, "Tele :", 10.0, MARGIN + 120.0, cust_top - 8.0);
    draw_text(&layer, &regular, &invoice.telephone, 10.0, MARGIN + 140.0, cust_top - 8.0);
    draw_text(&layer, &bold, "E-mail :", 10.0, MARGIN + 120.0, cust_top - 16.0);
    draw_text(&layer, &regular, or_dash(invoice.email.as_deref()), 10.0, MARGIN + 140.0, cust_top - 16.0);

    // Line-item table frame, header row and grid
    let table_top = cust_top - 34.0;
    let table_bottom = table_top - TABLE_H;
    draw_box(&layer, MARGIN, table_bottom, CONTENT_W, TABLE_H);

    let mut x = MARGIN;
    let mut col_edges = vec![MARGIN];
    for (label, width) in COLUMNS {
        draw_box(&layer, x, table_top - HEADER_ROW_H, width, HEADER_ROW_H);
        draw_text(&layer, &bold, label, 10.0, x + CELL_PAD, table_top - 6.0);
        x += width;
        col_edges.push(x);
    }

    let capacity = row_capacity();
    for row in 1..=capacity {
        draw_hline(&layer, MARGIN, MARGIN + CONTENT_W, table_top - HEADER_ROW_H - ROW_H * row as f32);
    }
    for edge in &col_edges {
        draw_vline(&layer, *edge, table_bottom, table_top);
    }

    // Body rows, entry order, capped to what fits on the page
    if items.len() > capacity {
        warn!(
            items = items.len(),
            capacity, "invoice exceeds one page; extra items omitted from the document"
        );
    }
    let mut row_y = table_top - HEADER_ROW_H - ROW_H + 3.0;
    for item in items.iter().take(capacity) {
        draw_text(&layer, &regular, &item.item_number, 9.0, col_edges[0] + CELL_PAD, row_y);
        draw_text(&layer, &regular, &item.description, 9.0, col_edges[1] + CELL_PAD, row_y);
        draw_text_right(&layer, &regular, &format_quantity(item.quantity), 9.0, col_edges[3] - CELL_PAD, row_y);
        draw_text_right(&layer, &regular, &format_money(item.unit_price), 9.0, col_edges[4] - CELL_PAD, row_y);
        draw_text_right(&layer, &regular, &format_money(item.line_total), 9.0, col_edges[5] - CELL_PAD, row_y);
        row_y -= ROW_H;
    }

    // Comments and total boxes beneath the table
    let boxes_top = table_bottom - 4.0;
    let boxes_y = boxes_top - COMMENTS_BOX_H;
    draw_box(&layer, MARGIN, boxes_y, COMMENTS_BOX_W, COMMENTS_BOX_H);
    draw_text(&layer, &bold, "Comments :", 10.0, MARGIN + 3.0, boxes_top - 6.0);

    let total_x = PAGE_W - MARGIN - TOTAL_BOX_W;
    draw_box(&layer, total_x, boxes_y, TOTAL_BOX_W, COMMENTS_BOX_H);
    draw_text(&layer, &bold, "Total", 10.0, total_x + 3.0, boxes_top - 8.0);
    draw_text_right(&layer, &bold, &format_money(invoice.total), 10.0, total_x + TOTAL_BOX_W - CELL_PAD, boxes_top - 8.0);

    // Signature line near the page bottom
    draw_hline(&layer, PAGE_W - MARGIN - 70.0, PAGE_W - MARGIN, MARGIN + 18.0);
    draw_text(&layer, &regular, "Signature", 9.0, PAGE_W - MARGIN - 42.0, MARGIN + 12.0);

    let file = File::create(path).map_err(|e| {
        BillingError::RenderFailure(format!("cannot write {}: {e}", path.display()))
    })?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer)
        .map_err(|e| BillingError::RenderFailure(e.to_string()))?;

    Ok(())
}

/// Places the clinic logo in the top-left corner of the header band.
/// Never fails the render: a missing or undecodable image only logs.
fn embed_logo(layer: &PdfLayerReference, path: &Path) {
    use printpdf::image_crate::codecs::png::PngDecoder;
    use printpdf::{Image, ImageTransform};

    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!(logo = %path.display(), error = %e, "logo not embedded");
            return;
        }
    };
    let decoder = match PngDecoder::new(&mut file) {
        Ok(decoder) => decoder,
        Err(e) => {
            warn!(logo = %path.display(), error = %e, "logo not embedded");
            return;
        }
    };
    let image = match Image::try_from(decoder) {
        Ok(image) => image,
        Err(e) => {
            warn!(logo = %path.display(), error = %e, "logo not embedded");
            return;
        }
    };

    // Scale the larger edge to the logo box, preserving aspect ratio
    let width_px = image.image.width.0.max(1) as f32;
    let height_px = image.image.height.0.max(1) as f32;
    let dpi = width_px.max(height_px) * 25.4 / LOGO_BOX;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(MARGIN)),
            translate_y: Some(Mm(PAGE_H - MARGIN - LOGO_BOX)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.is_empty() => text,
        _ => "—",
    }
}

fn draw_text(layer: &PdfLayerReference, font: &IndirectFontRef, text: &str, size: f32, x: f32, y: f32) {
    layer.use_text(text, size, Mm(x), Mm(y), font);
}

fn draw_text_right(layer: &PdfLayerReference, font: &IndirectFontRef, text: &str, size: f32, x_right: f32, y: f32) {
    draw_text(layer, font, text, size, x_right - text_width(text, size), y);
}

/// Width of `text` in millimetres using Helvetica advance widths
/// (thousandths of an em). Exact for the digit strings drawn in
/// right-aligned cells; anything else falls back to the digit width.
fn text_width(text: &str, size: f32) -> f32 {
    const PT_TO_MM: f32 = 0.352_778;
    let units: u32 = text
        .chars()
        .map(|c| match c {
            '.' | ',' | ' ' => 278,
            '-' => 333,
            _ => 556,
        })
        .sum();
    units as f32 / 1000.0 * size * PT_TO_MM
}

fn draw_hline(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn draw_vline(layer: &PdfLayerReference, x: f32, y1: f32, y2: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x), Mm(y1)), false),
            (Point::new(Mm(x), Mm(y2)), false),
        ],
        is_closed: false,
    });
}

fn draw_box(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x), Mm(y)), false),
            (Point::new(Mm(x + w), Mm(y)), false),
            (Point::new(Mm(x + w), Mm(y + h)), false),
            (Point::new(Mm(x), Mm(y + h)), false),
        ],
        is_closed: true,
    });
}

/// Monetary amounts always render with exactly two decimals.
fn format_money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Quantities render in shortest exact form: `3`, not `3.00`.
fn format_quantity(value: Decimal) -> String {
    value.normalize().to_string()
}
