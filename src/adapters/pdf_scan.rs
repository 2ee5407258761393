//! Page tree and document information of PDF files.
//!
//! Parsing goes through `lopdf`, so cross-reference streams and objects
//! packed in object streams resolve like any other object. Only the parts
//! needed to page through a file are read: each page's media box and the
//! document information dictionary.

use chrono::NaiveDate;
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::document::{DocumentMetadata, PageSize};

/// Limit on `/Parent` hops when looking for an inherited media box
const MAX_TREE_DEPTH: usize = 32;

/// What was read from a file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScannedDocument {
    /// Media box of every page, in page order
    pub pages: Vec<PageSize>,
    pub metadata: DocumentMetadata,
}

impl ScannedDocument {
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Size of a 1-indexed page, or `None` when out of range
    pub fn page_size(&self, page: u32) -> Option<PageSize> {
        let index = (page as usize).checked_sub(1)?;
        self.pages.get(index).copied()
    }
}

/// Read a PDF file held in memory
pub fn scan(bytes: &[u8]) -> Result<ScannedDocument, String> {
    let document = Document::load_mem(bytes).map_err(|e| format!("not a readable PDF: {}", e))?;

    let pages: Vec<PageSize> = document
        .get_pages()
        .values()
        .map(|id| inherited_media_box(&document, *id).unwrap_or_default())
        .collect();

    if pages.is_empty() {
        return Err("no pages found".to_string());
    }

    let metadata = info_dictionary(&document)
        .map(|info| DocumentMetadata {
            title: string_entry(&document, info, b"Title"),
            author: string_entry(&document, info, b"Author"),
            creator: string_entry(&document, info, b"Creator"),
            producer: string_entry(&document, info, b"Producer"),
            keywords: string_entry(&document, info, b"Keywords"),
            creation_date: string_entry(&document, info, b"CreationDate")
                .as_deref()
                .and_then(parse_pdf_date),
        })
        .unwrap_or_default();

    Ok(ScannedDocument { pages, metadata })
}

/// Parse the date part of a PDF date string (`D:YYYYMMDDHHmmSS...`)
pub fn parse_pdf_date(value: &str) -> Option<NaiveDate> {
    let digits = value.strip_prefix("D:").unwrap_or(value);
    let year = digits.get(0..4)?.parse().ok()?;
    let month = digits.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day = digits.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    NaiveDate::from_ymd_opt(year, month, day)
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Media box of a page, walking up the page tree when the page has none
fn inherited_media_box(document: &Document, page: ObjectId) -> Option<PageSize> {
    let mut node = document.get_dictionary(page).ok()?;

    for _ in 0..MAX_TREE_DEPTH {
        let size = node
            .get(b"MediaBox")
            .ok()
            .and_then(|o| resolve(document, o))
            .and_then(|o| media_box(document, o));
        if size.is_some() {
            return size;
        }

        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = document.get_dictionary(parent).ok()?;
    }

    None
}

fn media_box(document: &Document, object: &Object) -> Option<PageSize> {
    let values: Vec<f32> = object
        .as_array()
        .ok()?
        .iter()
        .filter_map(|o| resolve(document, o).and_then(number))
        .collect();

    match values.as_slice() {
        [x0, y0, x1, y1] => {
            let size = PageSize {
                width: (x1 - x0).abs(),
                height: (y1 - y0).abs(),
            };
            (size.width > 0.0 && size.height > 0.0).then_some(size)
        }
        _ => None,
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    let info = document.trailer.get(b"Info").ok()?;
    resolve(document, info)?.as_dict().ok()
}

fn string_entry(document: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    let raw = match resolve(document, dict.get(key).ok()?)? {
        Object::String(bytes, _) => bytes,
        _ => return None,
    };

    let text = decode_text(raw);
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// PDF text strings are UTF-16BE with a BOM, or PDFDocEncoding (read as Latin-1)
fn decode_text(raw: &[u8]) -> String {
    if raw.starts_with(&[0xfe, 0xff]) {
        let units: Vec<u16> = raw[2..]
            .chunks(2)
            .map(|c| u16::from_be_bytes([c[0], c.get(1).copied().unwrap_or(0)]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        raw.iter().map(|b| char::from(*b)).collect()
    }
}
