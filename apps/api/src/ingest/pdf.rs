//! PDF ingestion.
//!
//! Simple-font PDFs are read span by span from the content streams with `lopdf`, keeping each
//! span's font, size and bold/italic flags. Anything the span reader cannot decode reliably
//! (composite fonts, unreadable streams) falls back to `pdf-extract` plain lines.

use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::document::{Attributes, Delta, Run, Size};
use crate::ingest::{IngestError, IngestedDocument};

/// `TJ` adjustments below this (thousandths of an em) are read as a word gap.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// Bound on `Parent` hops when looking up inherited resources.
const MAX_TREE_DEPTH: usize = 32;

pub fn ingest_pdf(bytes: &[u8]) -> Result<IngestedDocument, IngestError> {
    match styled_spans(bytes) {
        Some(doc) => Ok(doc),
        None => {
            let text = pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| IngestError::Pdf(e.to_string()))?;
            Ok(from_extracted_text(&text))
        }
    }
}

/// One plain run per non-blank line; the raw text is the same lines joined with `\n`.
fn from_extracted_text(text: &str) -> IngestedDocument {
    let mut raw_text = String::new();
    let mut delta = Delta::new();

    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        raw_text.push_str(line);
        raw_text.push('\n');
        delta.push(Run::plain(format!("{line}\n")));
    }

    IngestedDocument { raw_text, delta }
}

#[derive(Debug, Clone, PartialEq)]
struct SpanStyle {
    font: String,
    size: f64,
}

impl SpanStyle {
    fn attributes(&self) -> Attributes {
        let lower = self.font.to_ascii_lowercase();
        let bold = ["bold", "black", "heavy", "semibold", "demi"]
            .iter()
            .any(|k| lower.contains(k));
        let italic = lower.contains("italic") || lower.contains("oblique");
        Attributes {
            bold: bold.then_some(true),
            italic: italic.then_some(true),
            size: Some(Size::Absolute(self.size.round())),
            font: (!self.font.is_empty()).then(|| self.font.clone()),
        }
    }
}

/// Accumulates spans into lines of styled runs.
#[derive(Default)]
struct SpanCollector {
    lines: Vec<Vec<(SpanStyle, String)>>,
    current: Vec<(SpanStyle, String)>,
}

impl SpanCollector {
    fn push(&mut self, style: &SpanStyle, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.current.last_mut() {
            Some((last, buf)) if last == style => buf.push_str(text),
            _ => self.current.push((style.clone(), text.to_string())),
        }
    }

    fn break_line(&mut self) {
        if self.current.iter().any(|(_, t)| !t.trim().is_empty()) {
            self.lines.push(std::mem::take(&mut self.current));
        } else {
            self.current.clear();
        }
    }

    fn finish(mut self) -> IngestedDocument {
        self.break_line();
        let mut raw_text = String::new();
        let mut delta = Delta::new();

        for line in self.lines {
            let count = line.len();
            for (i, (style, text)) in line.into_iter().enumerate() {
                let text = if i + 1 == count {
                    format!("{}\n", text.trim_end())
                } else {
                    text
                };
                raw_text.push_str(&text);
                delta.push(Run::styled(text, style.attributes()));
            }
        }

        IngestedDocument { raw_text, delta }
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj)?.as_dict().ok()
}

/// Font resources of a page, following inherited `Resources` up the page tree.
fn page_fonts<'a>(doc: &'a Document, page_id: ObjectId) -> BTreeMap<Vec<u8>, &'a Dictionary> {
    let mut fonts = BTreeMap::new();
    let mut node = doc.get_object(page_id).ok().and_then(|o| o.as_dict().ok());

    for _ in 0..MAX_TREE_DEPTH {
        let Some(dict) = node else {
            break;
        };
        if let Some(font_dict) = dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve_dict(doc, r))
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|f| resolve_dict(doc, f))
        {
            for (name, obj) in font_dict.iter() {
                if let Some(font) = resolve_dict(doc, obj) {
                    fonts.entry(name.clone()).or_insert(font);
                }
            }
        }
        node = dict.get(b"Parent").ok().and_then(|p| resolve_dict(doc, p));
    }
    fonts
}

/// Base font name without the `ABCDEF+` subset prefix.
fn base_font_name(font: &Dictionary) -> String {
    let name = font
        .get(b"BaseFont")
        .ok()
        .and_then(|n| n.as_name().ok())
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .unwrap_or_default();
    match name.split_once('+') {
        Some((prefix, rest)) if prefix.len() == 6 => rest.to_string(),
        _ => name,
    }
}

fn is_composite(font: &Dictionary) -> bool {
    font.get(b"Subtype")
        .ok()
        .and_then(|s| s.as_name().ok())
        .is_some_and(|s| s == b"Type0")
}

/// Single-byte string decoding: UTF-16BE when marked, else WinAnsi.
fn decode_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes
        .iter()
        .map(|&b| match b {
            0x80 => '€',
            0x85 => '…',
            0x91 => '‘',
            0x92 => '’',
            0x93 => '“',
            0x94 => '”',
            0x95 => '•',
            0x96 => '–',
            0x97 => '—',
            b => b as char,
        })
        .collect()
}

fn number(obj: Option<&Object>) -> Option<f64> {
    obj.and_then(|o| o.as_float().ok()).map(f64::from)
}

/// Text state needed to split spans into lines and scale font sizes.
struct TextState {
    /// Text matrix `[a b c d e f]`.
    matrix: [f64; 6],
    font_key: Vec<u8>,
    font_size: f64,
    leading: f64,
    last_y: Option<f64>,
}

impl TextState {
    fn new() -> Self {
        Self {
            matrix: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            font_key: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
            last_y: None,
        }
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        let [a, b, c, d, e, f] = self.matrix;
        self.matrix[4] = e + tx * a + ty * c;
        self.matrix[5] = f + tx * b + ty * d;
    }

    fn scaled_size(&self) -> f64 {
        let [a, b, ..] = self.matrix;
        let scale = (a * a + b * b).sqrt();
        self.font_size * if scale > 0.0 { scale } else { 1.0 }
    }
}

/// Span-level extraction. `None` means the fallback reader should be used.
fn styled_spans(bytes: &[u8]) -> Option<IngestedDocument> {
    let doc = Document::load_mem(bytes).ok()?;
    let mut collector = SpanCollector::default();

    for (_, page_id) in doc.get_pages() {
        let fonts = page_fonts(&doc, page_id);
        if fonts.values().any(|f| is_composite(f)) {
            debug!("PDF uses composite fonts, falling back to plain text extraction");
            return None;
        }
        let content = doc.get_page_content(page_id).ok()?;
        let operations = Content::decode(&content).ok()?.operations;
        let mut state = TextState::new();

        for op in operations {
            let operands = &op.operands;
            let mut shown: Option<String> = None;

            match op.operator.as_str() {
                "BT" => state.matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
                "Tf" => {
                    if let Some(name) = operands.first().and_then(|n| n.as_name().ok()) {
                        state.font_key = name.to_vec();
                    }
                    state.font_size = number(operands.get(1)).unwrap_or(state.font_size);
                }
                "TL" => state.leading = number(operands.first()).unwrap_or(0.0),
                "Tm" => {
                    for (i, slot) in state.matrix.iter_mut().enumerate() {
                        *slot = number(operands.get(i)).unwrap_or(*slot);
                    }
                }
                "Td" | "TD" => {
                    let tx = number(operands.first()).unwrap_or(0.0);
                    let ty = number(operands.get(1)).unwrap_or(0.0);
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.translate(tx, ty);
                }
                "T*" => state.translate(0.0, -state.leading),
                "Tj" | "TJ" => shown = operands.first().map(text_of),
                "'" => {
                    state.translate(0.0, -state.leading);
                    shown = operands.first().map(text_of);
                }
                "\"" => {
                    state.translate(0.0, -state.leading);
                    shown = operands.get(2).map(text_of);
                }
                _ => {}
            }

            if let Some(text) = shown {
                let y = state.matrix[5];
                if state.last_y.is_some_and(|last| (last - y).abs() > 0.5) {
                    collector.break_line();
                }
                state.last_y = Some(y);
                let style = SpanStyle {
                    font: fonts
                        .get(&state.font_key)
                        .map(|f| base_font_name(f))
                        .unwrap_or_default(),
                    size: state.scaled_size(),
                };
                collector.push(&style, &text);
            }
        }
        collector.break_line();
    }

    let ingested = collector.finish();
    if ingested.raw_text.trim().is_empty() || !looks_like_text(&ingested.raw_text) {
        return None;
    }
    Some(ingested)
}

/// Text of a `Tj` string or a `TJ` array.
fn text_of(operand: &Object) -> String {
    match operand {
        Object::String(bytes, _) => decode_string(bytes),
        Object::Array(items) => {
            let mut text = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => text.push_str(&decode_string(bytes)),
                    other => {
                        if other
                            .as_float()
                            .is_ok_and(|adjust| adjust < TJ_SPACE_THRESHOLD)
                        {
                            text.push(' ');
                        }
                    }
                }
            }
            text
        }
        _ => String::new(),
    }
}

/// Rejects decodes that are mostly control characters (custom encodings without a map).
fn looks_like_text(text: &str) -> bool {
    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return false;
    }
    let readable = text
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .count();
    readable as f64 / total as f64 >= 0.9
}
