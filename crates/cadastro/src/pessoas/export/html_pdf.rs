use std::io::Write;

use printpdf::{BuiltinFont, Mm, PdfDocument};

use super::{first_unencodable, pdf_error, ExportError};

/// Converts rendered markup into a PDF written to `dest`.
///
/// Implementations report malformed or empty markup as
/// [`ExportError::Conversion`] and write nothing in that case.
pub trait HtmlToPdf: Send + Sync {
    fn convert(&self, html: &str, dest: &mut dyn Write) -> Result<(), ExportError>;
}

/// Lays out block-level text (`h1`-`h3`, `p`, `li`, `dt`, `dd`) on A4 pages
/// using the built-in Helvetica faces. Styling and images are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintPdfConverter;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const PT_TO_MM: f32 = 0.3528;
const AVG_GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Title,
    Heading,
    Subheading,
    Paragraph,
    ListItem,
}

impl BlockKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "h1" => Some(Self::Title),
            "h2" => Some(Self::Heading),
            "h3" => Some(Self::Subheading),
            "p" | "dt" | "dd" | "div" => Some(Self::Paragraph),
            "li" => Some(Self::ListItem),
            _ => None,
        }
    }

    fn font_size(self) -> f32 {
        match self {
            Self::Title => 18.0,
            Self::Heading => 14.0,
            Self::Subheading => 12.0,
            Self::Paragraph | Self::ListItem => 11.0,
        }
    }

    fn bold(self) -> bool {
        matches!(self, Self::Title | Self::Heading | Self::Subheading)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    kind: BlockKind,
    text: String,
}

const VOID_TAGS: [&str; 6] = ["br", "hr", "img", "meta", "link", "input"];
const SKIPPED_TAGS: [&str; 4] = ["head", "style", "script", "title"];

/// Split markup into text blocks, checking that tags are balanced.
fn parse_blocks(html: &str) -> Result<Vec<Block>, ExportError> {
    let mut blocks = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut current: Option<Block> = None;
    let mut rest = html;

    while !rest.is_empty() {
        let Some(start) = rest.find('<') else {
            push_text(&mut current, &open, rest);
            break;
        };
        push_text(&mut current, &open, &rest[..start]);

        let after = &rest[start + 1..];
        let end = after
            .find('>')
            .ok_or_else(|| ExportError::Conversion("unterminated tag".to_string()))?;
        let raw = after[..end].trim();
        rest = &after[end + 1..];

        if raw.starts_with('!') || raw.starts_with('?') {
            continue;
        }

        if let Some(name) = raw.strip_prefix('/') {
            let name = tag_name(name);
            match open.pop() {
                Some(expected) if expected == name => {}
                Some(expected) => {
                    return Err(ExportError::Conversion(format!(
                        "closing </{name}> does not match <{expected}>"
                    )))
                }
                None => {
                    return Err(ExportError::Conversion(format!(
                        "closing </{name}> without opening tag"
                    )))
                }
            }
            if BlockKind::from_tag(&name).is_some() {
                if let Some(block) = current.take() {
                    if !block.text.trim().is_empty() {
                        blocks.push(Block {
                            kind: block.kind,
                            text: collapse_whitespace(&block.text),
                        });
                    }
                }
            }
            continue;
        }

        let self_closing = raw.ends_with('/');
        let name = tag_name(raw.trim_end_matches('/'));
        if name == "br" {
            push_text(&mut current, &open, " ");
        }
        if self_closing || VOID_TAGS.contains(&name.as_str()) {
            continue;
        }
        if let Some(kind) = BlockKind::from_tag(&name) {
            current = Some(Block {
                kind,
                text: String::new(),
            });
        }
        open.push(name);
    }

    if let Some(unclosed) = open.last() {
        return Err(ExportError::Conversion(format!("unclosed <{unclosed}>")));
    }
    if blocks.is_empty() {
        return Err(ExportError::Conversion("no printable content".to_string()));
    }
    if let Some(unsupported) = blocks
        .iter()
        .find_map(|block| first_unencodable(&block.text))
    {
        return Err(ExportError::Conversion(format!(
            "{unsupported:?} cannot be encoded by the built-in font"
        )));
    }
    Ok(blocks)
}

fn tag_name(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn push_text(current: &mut Option<Block>, open: &[String], text: &str) {
    if open
        .iter()
        .any(|tag| SKIPPED_TAGS.contains(&tag.as_str()))
    {
        return;
    }
    if let Some(block) = current.as_mut() {
        block.text.push_str(&decode_entities(text));
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn wrap(text: &str, font_size: f32, width: f32) -> Vec<String> {
    let max_chars = ((width / (font_size * AVG_GLYPH_WIDTH * PT_TO_MM)) as usize).max(1);
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let needed = line.chars().count() + usize::from(!line.is_empty()) + word.chars().count();
        if !line.is_empty() && needed > max_chars {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

impl HtmlToPdf for PrintPdfConverter {
    fn convert(&self, html: &str, dest: &mut dyn Write) -> Result<(), ExportError> {
        let blocks = parse_blocks(html)?;

        let (doc, page, layer) =
            PdfDocument::new("Resumo", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Conteudo");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;

        let mut layer = doc.get_page(page).get_layer(layer);
        let mut cursor = PAGE_HEIGHT - MARGIN;
        let text_width = PAGE_WIDTH - 2.0 * MARGIN;

        for block in &blocks {
            let size = block.kind.font_size();
            let line_height = size * 1.4 * PT_TO_MM;
            let font = if block.kind.bold() { &bold } else { &regular };
            let (indent, text) = match block.kind {
                BlockKind::ListItem => (5.0, format!("- {}", block.text)),
                _ => (0.0, block.text.clone()),
            };

            for line in wrap(&text, size, text_width - indent) {
                if cursor - line_height < MARGIN {
                    let (page, next) =
                        doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Conteudo");
                    layer = doc.get_page(page).get_layer(next);
                    cursor = PAGE_HEIGHT - MARGIN;
                }
                cursor -= line_height;
                layer.use_text(line, size, Mm(MARGIN + indent), Mm(cursor), font);
            }
            cursor -= line_height * 0.5;
        }

        let bytes = doc.save_to_bytes().map_err(pdf_error)?;
        dest.write_all(&bytes)?;
        Ok(())
    }
}
