//! Document ingestion: turns an uploaded file into raw text plus an initial delta.
//!
//! PDF text comes from `pdf-extract` (no span styling survives, one plain run per line).
//! DOCX keeps run-level bold/italic/size/font from `word/document.xml`.
//! Plain text becomes a single run.

pub mod docx;
pub mod handlers;
pub mod pdf;

use thiserror::Error;

use crate::document::{Delta, Run};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file type. Expected PDF, DOCX, or TXT. Got: filename=\"{filename}\", content_type=\"{content_type}\"")]
    UnsupportedType {
        filename: String,
        content_type: String,
    },

    #[error("Legacy .doc files are not supported; save the document as .docx and try again")]
    LegacyDoc,

    #[error("Failed to process file: {0}")]
    Pdf(String),

    #[error("Failed to process file: {0}")]
    Docx(String),

    #[error("Failed to process file: text is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Failed to process file: document is empty")]
    Empty,

    #[error("Failed to process file: the parser stopped unexpectedly")]
    Crashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DOC_MIME: &str = "application/msword";
const TEXT_MIME: &str = "text/plain";

impl DocumentKind {
    /// Classifies by extension first, then by declared content type.
    pub fn detect(filename: &str, content_type: Option<&str>) -> Result<Self, IngestError> {
        let lower = filename.to_ascii_lowercase();
        let content_type = content_type
            .map(|c| c.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .unwrap_or_default();

        if lower.ends_with(".pdf") || content_type == PDF_MIME {
            Ok(DocumentKind::Pdf)
        } else if lower.ends_with(".docx") || content_type == DOCX_MIME {
            Ok(DocumentKind::Docx)
        } else if lower.ends_with(".doc") || content_type == DOC_MIME {
            Err(IngestError::LegacyDoc)
        } else if lower.ends_with(".txt") || content_type.starts_with(TEXT_MIME) {
            Ok(DocumentKind::Text)
        } else {
            Err(IngestError::UnsupportedType {
                filename: filename.to_string(),
                content_type,
            })
        }
    }
}

/// Output of ingestion: the text fed to field extraction and the delta shown in the editor.
#[derive(Debug, Clone)]
pub struct IngestedDocument {
    pub raw_text: String,
    pub delta: Delta,
}

/// Extracts text and an initial delta from file bytes. CPU-bound: call via `spawn_blocking`.
pub fn ingest(kind: DocumentKind, bytes: &[u8]) -> Result<IngestedDocument, IngestError> {
    let doc = match kind {
        DocumentKind::Pdf => pdf::ingest_pdf(bytes)?,
        DocumentKind::Docx => docx::ingest_docx(bytes)?,
        DocumentKind::Text => ingest_text(bytes)?,
    };
    if doc.raw_text.trim().is_empty() {
        return Err(IngestError::Empty);
    }
    Ok(doc)
}

fn ingest_text(bytes: &[u8]) -> Result<IngestedDocument, IngestError> {
    let raw_text = String::from_utf8(bytes.to_vec())?;
    Ok(IngestedDocument {
        delta: Delta::from(vec![Run::plain(raw_text.clone())]),
        raw_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(DocumentKind::detect("CV.PDF", None).unwrap(), DocumentKind::Pdf);
        assert_eq!(
            DocumentKind::detect("cv.docx", Some("application/octet-stream")).unwrap(),
            DocumentKind::Docx
        );
        assert_eq!(DocumentKind::detect("notes.txt", None).unwrap(), DocumentKind::Text);
    }

    #[test]
    fn test_detect_by_content_type() {
        assert_eq!(
            DocumentKind::detect("upload", Some("application/pdf")).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::detect("upload", Some("text/plain; charset=utf-8")).unwrap(),
            DocumentKind::Text
        );
    }

    #[test]
    fn test_legacy_doc_rejected() {
        assert!(matches!(
            DocumentKind::detect("old.doc", None),
            Err(IngestError::LegacyDoc)
        ));
    }

    #[test]
    fn test_unknown_type_message_names_file() {
        let err = DocumentKind::detect("photo.png", Some("image/png")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("photo.png"), "{msg}");
        assert!(msg.contains("image/png"), "{msg}");
    }

    #[test]
    fn test_text_ingest_single_run() {
        let doc = ingest(DocumentKind::Text, "Jane Doe\njane@x.com\n".as_bytes()).unwrap();
        assert_eq!(doc.delta.len(), 1);
        assert_eq!(doc.delta.text(), doc.raw_text);
    }

    #[test]
    fn test_blank_document_rejected() {
        assert!(matches!(
            ingest(DocumentKind::Text, b"  \n "),
            Err(IngestError::Empty)
        ));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert!(matches!(
            ingest(DocumentKind::Text, &[0xff, 0xfe, 0x00]),
            Err(IngestError::Encoding(_))
        ));
    }
}
