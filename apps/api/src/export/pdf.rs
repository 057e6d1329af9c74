//! Delta → PDF. Lays runs out as word-wrapped lines on US-letter pages using the base-14
//! Helvetica/Times/Courier families, so no font files are embedded.
//!
//! Each run picks its face from `font` (Times*/Courier*/anything else → Helvetica) and its
//! bold/italic flags; size comes from `size` (numeric points or a named size).

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::document::{Attributes, Delta, NamedSize, Size};
use crate::export::ExportError;

const DEFAULT_SIZE: f32 = 12.0;
const LEADING: f32 = 1.2;

#[derive(Debug, Clone, Copy)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Default for PageSetup {
    /// US letter, 1" margins.
    fn default() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            margin: 72.0,
        }
    }
}

impl PageSetup {
    fn text_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Helvetica,
    Times,
    Courier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Face {
    family: Family,
    bold: bool,
    italic: bool,
}

impl Face {
    fn from_attributes(attrs: &Attributes) -> Self {
        let family = match attrs.font.as_deref() {
            Some(f) if f.contains("Times") => Family::Times,
            Some(f) if f.contains("Courier") => Family::Courier,
            _ => Family::Helvetica,
        };
        Self {
            family,
            bold: attrs.is_bold(),
            italic: attrs.is_italic(),
        }
    }

    /// Position in the page resource dictionary (`F1`..`F12`).
    fn index(self) -> usize {
        let family = match self.family {
            Family::Helvetica => 0,
            Family::Times => 1,
            Family::Courier => 2,
        };
        family * 4 + usize::from(self.bold) + 2 * usize::from(self.italic)
    }

    fn resource_name(self) -> String {
        format!("F{}", self.index() + 1)
    }

    fn base_font(self) -> &'static str {
        match (self.family, self.bold, self.italic) {
            (Family::Helvetica, false, false) => "Helvetica",
            (Family::Helvetica, true, false) => "Helvetica-Bold",
            (Family::Helvetica, false, true) => "Helvetica-Oblique",
            (Family::Helvetica, true, true) => "Helvetica-BoldOblique",
            (Family::Times, false, false) => "Times-Roman",
            (Family::Times, true, false) => "Times-Bold",
            (Family::Times, false, true) => "Times-Italic",
            (Family::Times, true, true) => "Times-BoldItalic",
            (Family::Courier, false, false) => "Courier",
            (Family::Courier, true, false) => "Courier-Bold",
            (Family::Courier, false, true) => "Courier-Oblique",
            (Family::Courier, true, true) => "Courier-BoldOblique",
        }
    }

    fn all() -> impl Iterator<Item = Face> {
        [Family::Helvetica, Family::Times, Family::Courier]
            .into_iter()
            .flat_map(|family| {
                [(false, false), (true, false), (false, true), (true, true)]
                    .into_iter()
                    .map(move |(bold, italic)| Face {
                        family,
                        bold,
                        italic,
                    })
            })
    }

    /// Approximate advance width in ems. Good enough for wrapping; not for justification.
    fn char_width(self, c: char) -> f32 {
        if self.family == Family::Courier {
            return 0.6;
        }
        let base = match c {
            ' ' => 0.28,
            'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => 0.25,
            'm' | 'w' | 'M' | 'W' | '@' => 0.85,
            c if c.is_ascii_uppercase() || c.is_ascii_digit() => 0.62,
            _ => 0.5,
        };
        if self.bold {
            base * 1.06
        } else {
            base
        }
    }

    fn measure(self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c)).sum::<f32>() * size
    }
}

fn point_size(attrs: &Attributes) -> f32 {
    match attrs.size {
        Some(Size::Absolute(v)) => (v as f32).clamp(4.0, 96.0),
        Some(Size::Named(NamedSize::Small)) => 9.0,
        Some(Size::Named(NamedSize::Large)) => 16.0,
        Some(Size::Named(NamedSize::Huge)) => 22.0,
        None => DEFAULT_SIZE,
    }
}

#[derive(Debug, Clone)]
struct Segment {
    text: String,
    face: Face,
    size: f32,
    width: f32,
}

#[derive(Debug, Clone, Default)]
struct Line {
    segments: Vec<Segment>,
    width: f32,
}

impl Line {
    fn height(&self) -> f32 {
        self.segments
            .iter()
            .map(|s| s.size)
            .fold(0.0_f32, f32::max)
            .max(DEFAULT_SIZE)
            * LEADING
    }

    fn push_word(&mut self, word: &str, face: Face, size: f32) {
        let width = face.measure(word, size);
        match self.segments.last_mut() {
            Some(last) if last.face == face && last.size == size => {
                last.text.push_str(word);
                last.width += width;
            }
            _ => self.segments.push(Segment {
                text: word.to_string(),
                face,
                size,
                width,
            }),
        }
        self.width += width;
    }

    fn trim_trailing_space(&mut self) {
        if let Some(last) = self.segments.last_mut() {
            let trimmed = last.text.trim_end().len();
            if trimmed < last.text.len() {
                let removed = last.face.measure(&last.text[trimmed..], last.size);
                last.text.truncate(trimmed);
                last.width -= removed;
                self.width -= removed;
            }
        }
    }
}

/// Breaks the delta into wrapped lines. Every `\n` ends a line, so blank lines survive.
fn layout_lines(delta: &Delta, max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = Line::default();

    for run in delta {
        let attrs = run.attrs();
        let face = Face::from_attributes(&attrs);
        let size = point_size(&attrs);

        let mut parts = run.text.split('\n').peekable();
        while let Some(part) = parts.next() {
            let part = part.replace('\t', "    ");
            for word in part.split_inclusive(' ') {
                let width = face.measure(word.trim_end(), size);
                if !current.segments.is_empty() && current.width + width > max_width {
                    current.trim_trailing_space();
                    lines.push(std::mem::take(&mut current));
                    if word.trim().is_empty() {
                        continue;
                    }
                }
                current.push_word(word, face, size);
            }
            if parts.peek().is_some() {
                current.trim_trailing_space();
                lines.push(std::mem::take(&mut current));
            }
        }
    }

    if !current.segments.is_empty() {
        current.trim_trailing_space();
        lines.push(current);
    }
    lines
}

/// Maps text to WinAnsiEncoding bytes; characters outside it become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

fn page_operations(lines: &[Line], setup: &PageSetup) -> Vec<Operation> {
    let mut ops = Vec::new();
    let mut y = setup.height - setup.margin;

    for line in lines {
        y -= line.height();
        let mut x = setup.margin;
        for seg in &line.segments {
            if !seg.text.is_empty() {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![
                        Object::Name(seg.face.resource_name().into_bytes()),
                        Object::Real(seg.size),
                    ],
                ));
                ops.push(Operation::new(
                    "Td",
                    vec![Object::Real(x), Object::Real(y)],
                ));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(
                        encode_win_ansi(&seg.text),
                        StringFormat::Literal,
                    )],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            x += seg.width;
        }
    }
    ops
}

/// Splits lines into pages by cumulative line height.
fn paginate(lines: Vec<Line>, setup: &PageSetup) -> Vec<Vec<Line>> {
    let usable = setup.height - 2.0 * setup.margin;
    let mut pages = Vec::new();
    let mut page = Vec::new();
    let mut used = 0.0_f32;

    for line in lines {
        let h = line.height();
        if !page.is_empty() && used + h > usable {
            pages.push(std::mem::take(&mut page));
            used = 0.0;
        }
        used += h;
        page.push(line);
    }
    if !page.is_empty() {
        pages.push(page);
    }
    pages
}

fn font_resources(doc: &mut Document) -> Dictionary {
    let mut fonts = Dictionary::new();
    for face in Face::all() {
        let font = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(face.base_font().as_bytes().to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]);
        let id = doc.add_object(font);
        fonts.set(face.resource_name(), Object::Reference(id));
    }
    fonts
}

/// Renders the delta to PDF bytes.
pub fn render_pdf(delta: &Delta, setup: &PageSetup) -> Result<Vec<u8>, ExportError> {
    if delta.text().trim().is_empty() {
        return Err(ExportError::Empty);
    }

    let lines = layout_lines(delta, setup.text_width());
    let pages = paginate(lines, setup);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let fonts = font_resources(&mut doc);
    let resources_id = doc.add_object(Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(fonts),
    )]));

    let mut page_ids: Vec<ObjectId> = Vec::with_capacity(pages.len());
    for page_lines in &pages {
        let content = Content {
            operations: page_operations(page_lines, setup),
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(setup.width),
                    Object::Real(setup.height),
                ]),
            ),
            ("Resources", Object::Reference(resources_id)),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}
