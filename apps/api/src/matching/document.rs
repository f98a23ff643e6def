//! Resume text extraction.

use docx_rs::{DocumentChild, ParagraphChild, RunChild};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    /// Office Open XML. Legacy binary `.doc` is not readable.
    Docx,
    PlainText,
}

const PDF_MAGIC: &[u8] = b"%PDF";
const TEXT_EXTENSIONS: [&str; 3] = ["txt", "text", "md"];
const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Content sniffing wins over the declared name or type.
pub fn detect_kind(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> Option<DocumentKind> {
    if bytes.starts_with(PDF_MAGIC) {
        return Some(DocumentKind::Pdf);
    }
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => return Some(DocumentKind::Pdf),
        Some("docx") => return Some(DocumentKind::Docx),
        Some(e) if TEXT_EXTENSIONS.contains(&e) => return Some(DocumentKind::PlainText),
        _ => {}
    }
    match content_type {
        Some("application/pdf") => Some(DocumentKind::Pdf),
        Some(DOCX_CONTENT_TYPE) => Some(DocumentKind::Docx),
        Some(ct) if ct.starts_with("text/") => Some(DocumentKind::PlainText),
        _ => None,
    }
}

/// Extracts plain text from an uploaded resume. CPU-bound for PDFs; call from
/// a blocking thread.
pub fn extract_text(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> Result<String, AppError> {
    let kind = detect_kind(file_name, content_type, bytes).ok_or_else(|| {
        AppError::UnsupportedDocumentFormat(format!(
            "'{file_name}' is not a PDF, DOCX or plain-text document"
        ))
    })?;

    let text = match kind {
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
            AppError::UnsupportedDocumentFormat(format!("Could not read PDF '{file_name}': {e}"))
        })?,
        DocumentKind::Docx => docx_text(bytes).map_err(|e| {
            AppError::UnsupportedDocumentFormat(format!("Could not read DOCX '{file_name}': {e}"))
        })?,
        DocumentKind::PlainText => String::from_utf8(bytes.to_vec()).map_err(|_| {
            AppError::UnsupportedDocumentFormat(format!("'{file_name}' is not valid UTF-8 text"))
        })?,
    };

    Ok(normalize_whitespace(&text))
}

/// Concatenates the text runs of every top-level paragraph, one line each.
fn docx_text(bytes: &[u8]) -> Result<String, docx_rs::ReaderError> {
    let docx = docx_rs::read_docx(bytes)?;
    let mut text = String::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(p) = child {
            for run in p.children.iter().filter_map(|c| match c {
                ParagraphChild::Run(run) => Some(run),
                _ => None,
            }) {
                for rc in &run.children {
                    if let RunChild::Text(t) = rc {
                        text.push_str(&t.text);
                    }
                }
            }
            text.push('\n');
        }
    }
    Ok(text)
}

/// Collapses runs of whitespace; PDF extraction leaves a lot of it.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_kind() {
        assert_eq!(detect_kind("cv.bin", None, b"%PDF-1.7 ..."), Some(DocumentKind::Pdf));
        assert_eq!(detect_kind("CV.PDF", None, b"garbage"), Some(DocumentKind::Pdf));
        assert_eq!(detect_kind("cv.md", None, b"# Ana"), Some(DocumentKind::PlainText));
        assert_eq!(
            detect_kind("upload", Some("text/plain"), b"Ana"),
            Some(DocumentKind::PlainText)
        );
        assert_eq!(detect_kind("cv.docx", None, b"PK\x03\x04"), Some(DocumentKind::Docx));
        assert_eq!(
            detect_kind("upload", Some(DOCX_CONTENT_TYPE), b"PK\x03\x04"),
            Some(DocumentKind::Docx)
        );
        assert_eq!(detect_kind("cv.doc", Some("application/msword"), b"\xd0\xcf"), None);
    }

    #[test]
    fn test_plain_text_is_normalized() {
        let text = extract_text("cv.txt", None, b"Python\n\n  Machine   Learning\t").unwrap();
        assert_eq!(text, "Python Machine Learning");
    }

    fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
        use docx_rs::{Docx, Paragraph, Run};
        let docx = paragraphs.iter().fold(Docx::new(), |docx, text| {
            docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)))
        });
        let mut out = std::io::Cursor::new(Vec::new());
        docx.build().pack(&mut out).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_docx_paragraphs_are_extracted() {
        let bytes = docx_bytes(&["Python developer", "REST  API design"]);
        let text = extract_text("cv.docx", None, &bytes).unwrap();
        assert_eq!(text, "Python developer REST API design");
    }

    #[test]
    fn test_broken_docx_and_legacy_doc_are_unsupported() {
        let err = extract_text("cv.docx", None, b"PK\x03\x04").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedDocumentFormat(_)));

        let err = extract_text("cv.doc", Some("application/msword"), b"\xd0\xcf\x11\xe0").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedDocumentFormat(_)));
    }

    #[test]
    fn test_invalid_utf8_is_unsupported() {
        let err = extract_text("cv.txt", None, &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedDocumentFormat(_)));
    }
}
