//! DOCX ingestion. Reads `word/document.xml` out of the OOXML zip container and maps each
//! `<w:r>` run to a delta run, keeping bold/italic/size/font from its `<w:rPr>`.

use std::io::{Cursor, Read};

use lazy_static::lazy_static;
use regex::Regex;

use crate::document::{Attributes, Delta, Run, Size};
use crate::ingest::{IngestError, IngestedDocument};

const DOCUMENT_PART: &str = "word/document.xml";

lazy_static! {
    static ref PARAGRAPH: Regex = Regex::new(r"(?s)<w:p(?:\s[^>/]*)?(?:/>|>(.*?)</w:p>)").unwrap();
    static ref RUN: Regex = Regex::new(r"(?s)<w:r(?:\s[^>]*)?>(.*?)</w:r>").unwrap();
    static ref RUN_PROPS: Regex = Regex::new(r"(?s)<w:rPr>(.*?)</w:rPr>").unwrap();
    static ref BOLD: Regex = Regex::new(r#"<w:b(?:\s+w:val="([^"]*)")?\s*/>"#).unwrap();
    static ref ITALIC: Regex = Regex::new(r#"<w:i(?:\s+w:val="([^"]*)")?\s*/>"#).unwrap();
    static ref SIZE: Regex = Regex::new(r#"<w:sz\s+w:val="(\d+)""#).unwrap();
    static ref FONT: Regex = Regex::new(r#"<w:rFonts[^>]*\sw:ascii="([^"]*)""#).unwrap();
    static ref CONTENT: Regex =
        Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab\s*/>|<w:(?:br|cr)(?:\s[^>]*)?/>")
            .unwrap();
    static ref ENTITY: Regex = Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|lt|gt|amp|quot|apos);").unwrap();
}

pub fn ingest_docx(bytes: &[u8]) -> Result<IngestedDocument, IngestError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| IngestError::Docx(e.to_string()))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| IngestError::Docx(format!("{DOCUMENT_PART}: {e}")))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| IngestError::Docx(e.to_string()))?;
    Ok(parse_document_xml(&xml))
}

/// Paragraph-by-paragraph walk. Each paragraph ends with `\n`, appended to its last run so the
/// line break carries that run's styling.
pub fn parse_document_xml(xml: &str) -> IngestedDocument {
    let mut raw_text = String::new();
    let mut delta = Delta::new();

    for para in PARAGRAPH.captures_iter(xml) {
        let body = para.get(1).map(|m| m.as_str()).unwrap_or("");
        let mut runs: Vec<Run> = RUN
            .captures_iter(body)
            .filter_map(|run| {
                let inner = run.get(1).map(|m| m.as_str()).unwrap_or("");
                let text = run_text(inner);
                if text.is_empty() {
                    return None;
                }
                let attrs = run_attributes(inner);
                Some(if attrs.has_styling() {
                    Run::styled(text, attrs)
                } else {
                    Run::plain(text)
                })
            })
            .collect();

        for run in &runs {
            raw_text.push_str(&run.text);
        }
        raw_text.push('\n');

        match runs.last_mut() {
            Some(last) => last.text.push('\n'),
            None => runs.push(Run::plain("\n")),
        }
        for run in runs {
            delta.push(run);
        }
    }

    IngestedDocument { raw_text, delta }
}

fn run_text(inner: &str) -> String {
    let mut text = String::new();
    for token in CONTENT.captures_iter(inner) {
        match token.get(1) {
            Some(t) => text.push_str(&unescape_xml(t.as_str())),
            None => {
                let whole = token.get(0).map(|m| m.as_str()).unwrap_or("");
                if whole.starts_with("<w:tab") {
                    text.push('\t');
                } else {
                    text.push('\n');
                }
            }
        }
    }
    text
}

fn run_attributes(inner: &str) -> Attributes {
    let Some(props) = RUN_PROPS.captures(inner).and_then(|c| c.get(1)) else {
        return Attributes::default();
    };
    let props = props.as_str();

    let toggle = |re: &Regex| {
        re.captures(props).map(|c| {
            c.get(1)
                .map(|v| !matches!(v.as_str(), "false" | "0" | "off"))
                .unwrap_or(true)
        })
    };

    Attributes {
        bold: toggle(&*BOLD).filter(|b| *b),
        italic: toggle(&*ITALIC).filter(|i| *i),
        // w:sz is in half-points.
        size: SIZE
            .captures(props)
            .and_then(|c| c[1].parse::<f64>().ok())
            .filter(|half| *half > 0.0)
            .map(|half| Size::Absolute(half / 2.0)),
        font: FONT
            .captures(props)
            .map(|c| c[1].to_string())
            .filter(|f| !f.is_empty()),
    }
}

fn unescape_xml(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            match entity {
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "amp" => "&".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                _ => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        entity[1..].parse::<u32>().ok()
                    };
                    code.and_then(char::from_u32)
                        .map(String::from)
                        .unwrap_or_default()
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>
<w:p w:rsidR="00A1"><w:pPr><w:jc w:val="center"/></w:pPr>
  <w:r><w:rPr><w:rFonts w:ascii="Arial" w:hAnsi="Arial"/><w:b/><w:sz w:val="32"/></w:rPr><w:t>Jane Doe</w:t></w:r>
</w:p>
<w:p/>
<w:p>
  <w:r><w:t xml:space="preserve">Rust &amp; Go </w:t></w:r>
  <w:r><w:rPr><w:i/><w:b w:val="false"/><w:bCs/></w:rPr><w:t>expert</w:t><w:tab/><w:t>2020</w:t></w:r>
</w:p>
</w:body>
</w:document>"#;

    #[test]
    fn test_paragraphs_and_runs() {
        let doc = parse_document_xml(SAMPLE);
        assert_eq!(doc.raw_text, "Jane Doe\n\nRust & Go expert\t2020\n");
        assert_eq!(doc.delta.text(), doc.raw_text);
        assert_eq!(doc.delta.len(), 4);
    }

    #[test]
    fn test_run_styling() {
        let doc = parse_document_xml(SAMPLE);

        let heading = doc.delta.runs[0].attrs();
        assert!(heading.is_bold());
        assert_eq!(heading.size, Some(Size::Absolute(16.0)));
        assert_eq!(heading.font.as_deref(), Some("Arial"));

        assert!(doc.delta.runs[2].attributes.is_none());

        let italic = doc.delta.runs[3].attrs();
        assert!(italic.is_italic());
        assert!(!italic.is_bold());
    }

    #[test]
    fn test_unescape_numeric_entities() {
        assert_eq!(unescape_xml("caf&#233; &#x2014; &lt;b&gt;"), "café — <b>");
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(ingest_docx(b"plain bytes"), Err(IngestError::Docx(_))));
    }
}
