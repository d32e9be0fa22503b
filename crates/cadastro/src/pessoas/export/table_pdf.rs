use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rect, Rgb,
};

use super::{first_unencodable, pdf_error, ExportError};
use crate::pessoas::domain::Pessoa;

pub const TABLE_HEADER: [&str; 4] = ["Nome", "CPF", "Celular", "E-mail"];

// US letter, one inch margins.
const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 25.4;
const COLUMN_WIDTHS: [f32; 4] = [55.0, 32.0, 32.0, 46.1];
const HEADER_HEIGHT: f32 = 10.0;
const ROW_HEIGHT: f32 = 7.0;
const FONT_SIZE: f32 = 10.0;
const CELL_PADDING: f32 = 1.5;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// Fixed look of the bulk report table.
#[derive(Debug, Clone, Copy)]
struct TableStyle {
    header_background: (f32, f32, f32),
    header_text: (f32, f32, f32),
    body_backgrounds: [(f32, f32, f32); 2],
    body_text: (f32, f32, f32),
    grid: (f32, f32, f32),
    grid_thickness: f32,
}

const STYLE: TableStyle = TableStyle {
    // grey / whitesmoke
    header_background: (0.5, 0.5, 0.5),
    header_text: (0.96, 0.96, 0.96),
    // beige, alternating with a lighter tint
    body_backgrounds: [(0.96, 0.96, 0.86), (0.99, 0.99, 0.94)],
    body_text: (0.0, 0.0, 0.0),
    grid: (0.0, 0.0, 0.0),
    grid_thickness: 1.0,
};

fn rgb((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn cells(pessoa: &Pessoa) -> [&str; 4] {
    [
        pessoa.nome.as_str(),
        pessoa.cpf.as_str(),
        pessoa.celular.as_str(),
        pessoa.email.as_str(),
    ]
}

/// Render the `Nome / CPF / Celular / E-mail` table for every record, in
/// list order, repeating the header on each page.
///
/// Fails with [`ExportError::Pdf`] when a cell holds a character the
/// built-in Helvetica encoding cannot represent.
pub fn render_table_pdf(pessoas: &[Pessoa]) -> Result<Vec<u8>, ExportError> {
    for pessoa in pessoas {
        for cell in cells(pessoa) {
            if let Some(unsupported) = first_unencodable(cell) {
                return Err(ExportError::Pdf(format!(
                    "{unsupported:?} in {cell:?} cannot be encoded by the built-in font"
                )));
            }
        }
    }

    let (doc, page, layer) = PdfDocument::new(
        "Cadastros",
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Tabela",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    let mut layer = doc.get_page(page).get_layer(layer);
    let mut top = PAGE_HEIGHT - MARGIN;
    draw_header(&layer, &bold, top);
    top -= HEADER_HEIGHT;

    for (index, pessoa) in pessoas.iter().enumerate() {
        if top - ROW_HEIGHT < MARGIN {
            layer = new_page(&doc);
            top = PAGE_HEIGHT - MARGIN;
            draw_header(&layer, &bold, top);
            top -= HEADER_HEIGHT;
        }

        let background = STYLE.body_backgrounds[index % STYLE.body_backgrounds.len()];
        draw_row(
            &layer,
            &regular,
            top,
            ROW_HEIGHT,
            &cells(pessoa),
            background,
            STYLE.body_text,
        );
        top -= ROW_HEIGHT;
    }

    doc.save_to_bytes().map_err(pdf_error)
}

fn new_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Tabela");
    doc.get_page(page).get_layer(layer)
}

fn draw_header(layer: &PdfLayerReference, font: &IndirectFontRef, top: f32) {
    draw_row(
        layer,
        font,
        top,
        HEADER_HEIGHT,
        &TABLE_HEADER,
        STYLE.header_background,
        STYLE.header_text,
    );
}

fn draw_row(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    top: f32,
    height: f32,
    cells: &[&str],
    background: (f32, f32, f32),
    text: (f32, f32, f32),
) {
    let table_width: f32 = COLUMN_WIDTHS.iter().sum();
    let mut left = (PAGE_WIDTH - table_width) / 2.0;

    for (cell, width) in cells.iter().zip(COLUMN_WIDTHS) {
        layer.set_fill_color(rgb(background));
        layer.set_outline_color(rgb(STYLE.grid));
        layer.set_outline_thickness(STYLE.grid_thickness);
        layer.add_rect(
            Rect::new(Mm(left), Mm(top - height), Mm(left + width), Mm(top))
                .with_mode(PaintMode::FillStroke),
        );

        let content = fit_to_width(cell, width - 2.0 * CELL_PADDING);
        let text_width = estimated_width(&content);
        let x = left + (width - text_width) / 2.0;
        let baseline = top - height + (height - FONT_SIZE * PT_TO_MM) / 2.0 + 0.6;
        layer.set_fill_color(rgb(text));
        layer.use_text(content, FONT_SIZE, Mm(x), Mm(baseline), font);

        left += width;
    }
}

fn estimated_width(text: &str) -> f32 {
    text.chars().count() as f32 * FONT_SIZE * AVG_GLYPH_WIDTH * PT_TO_MM
}

/// Truncate with an ellipsis so the text stays inside its cell.
fn fit_to_width(text: &str, width: f32) -> String {
    let max_chars = (width / (FONT_SIZE * AVG_GLYPH_WIDTH * PT_TO_MM)).floor() as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
