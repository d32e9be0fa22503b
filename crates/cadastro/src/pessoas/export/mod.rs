//! Downloadable artifacts built from the full record set.
//!
//! Every export reads records and produces bytes; none of them writes to the
//! store.

mod csv;
mod html_pdf;
mod table_pdf;

pub use self::csv::{csv_bytes, write_csv, CSV_HEADER, UTF8_BOM};
pub use html_pdf::{HtmlToPdf, PrintPdfConverter};
pub use table_pdf::{render_table_pdf, TABLE_HEADER};

/// Bytes plus the metadata needed to serve them as a file download.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: mime::Mime,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv export failed: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("io error while exporting: {0}")]
    Io(#[from] std::io::Error),
    #[error("pdf rendering failed: {0}")]
    Pdf(String),
    #[error("html to pdf conversion failed: {0}")]
    Conversion(String),
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

pub(crate) fn pdf_error(err: printpdf::Error) -> ExportError {
    ExportError::Pdf(format!("{err:?}"))
}

// WinAnsiEncoding code points outside Latin-1.
const WIN_ANSI_EXTRAS: [char; 27] = [
    '\u{20ac}', '\u{201a}', '\u{0192}', '\u{201e}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02c6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{017d}', '\u{2018}',
    '\u{2019}', '\u{201c}', '\u{201d}', '\u{2022}', '\u{2013}', '\u{2014}', '\u{02dc}',
    '\u{2122}', '\u{0161}', '\u{203a}', '\u{0153}', '\u{017e}', '\u{0178}',
];

/// First character the built-in PDF fonts cannot encode. printpdf drops
/// such characters without reporting them.
pub(crate) fn first_unencodable(text: &str) -> Option<char> {
    text.chars().find(|&c| {
        !matches!(c, ' '..='~' | '\u{a0}'..='\u{ff}') && !WIN_ANSI_EXTRAS.contains(&c)
    })
}
