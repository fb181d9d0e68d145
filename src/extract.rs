//! Per-format text extraction for the ingestion pipeline.
//!
//! Dispatch is by lowercase file extension. An unsupported extension is a
//! skip (logged, `Ok(None)`), not an error; a failed extraction for a
//! supported type is a parse error for that file only.

use std::{io::Read, path::Path};

use quick_xml::events::Event;
use tracing::warn;

use crate::error::{Error, Result};

/// File extensions the ingestion pipeline knows how to extract.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt", "md"];

/// Extract plain text from a file, dispatching on its extension.
///
/// Returns `Ok(None)` for unsupported extensions.
pub fn extract_text(path: &Path) -> Result<Option<String>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => extract_pdf(path).map(Some),
        Some("docx") => extract_docx(path).map(Some),
        Some("txt") | Some("md") => extract_plain(path).map(Some),
        _ => {
            warn!(path = %path.display(), "unsupported file type, skipping");
            Ok(None)
        }
    }
}

fn extract_pdf(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path)
        .map_err(|e| Error::parse(path, e.to_string()))
}

/// Pull the paragraph text out of a DOCX container.
///
/// A DOCX file is a zip archive; the document body lives in
/// `word/document.xml` with text runs in `<w:t>` elements grouped into
/// `<w:p>` paragraphs. Paragraphs are joined with blank lines so the
/// chunker can snap to them.
fn extract_docx(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::parse(path, format!("not a zip archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::parse(path, format!("missing document body: {e}")))?
        .read_to_string(&mut xml)?;

    let mut reader = quick_xml::Reader::from_str(&xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => {
                in_text_run = true;
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:t" => {
                in_text_run = false;
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => {
                if !current.trim().is_empty() {
                    paragraphs.push(current.trim().to_string());
                }
                current.clear();
            }
            Ok(Event::Text(t)) if in_text_run => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| Error::parse(path, e.to_string()))?;
                current.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::parse(path, e.to_string())),
        }
    }

    if !current.trim().is_empty() {
        paragraphs.push(current.trim().to_string());
    }

    Ok(paragraphs.join("\n\n"))
}

/// Read a text or markdown file as UTF-8, falling back to Latin-1 when the
/// bytes are not valid UTF-8.
fn extract_plain(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            Ok(e.into_bytes().iter().map(|&b| b as char).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn plain_utf8_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("note.txt");
        std::fs::write(&path, "hello world").unwrap();

        let text = extract_text(&path).unwrap().unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn markdown_is_supported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.md");
        std::fs::write(&path, "# Title\n\nBody.").unwrap();

        let text = extract_text(&path).unwrap().unwrap();
        assert!(text.contains("# Title"));
    }

    #[test]
    fn latin1_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("legacy.txt");
        // "café" encoded as Latin-1 (0xE9 is not valid UTF-8 on its own).
        std::fs::write(&path, [0x63, 0x61, 0x66, 0xE9]).unwrap();

        let text = extract_text(&path).unwrap().unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn unsupported_extension_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("image.png");
        std::fs::write(&path, "binary").unwrap();

        assert!(extract_text(&path).unwrap().is_none());
    }

    #[test]
    fn uppercase_extension_is_recognized() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("NOTE.TXT");
        std::fs::write(&path, "shouting").unwrap();

        assert_eq!(extract_text(&path).unwrap().unwrap(), "shouting");
    }

    #[test]
    fn docx_paragraphs_extracted() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.docx");

        let document = concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "<w:document><w:body>",
            "<w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Second </w:t></w:r><w:r><w:t>paragraph.</w:t></w:r></w:p>",
            "<w:p></w:p>",
            "</w:body></w:document>",
        );

        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(
                "word/document.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
        writer.write_all(document.as_bytes()).unwrap();
        writer.finish().unwrap();

        let text = extract_text(&path).unwrap().unwrap();
        assert_eq!(text, "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn corrupt_docx_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.docx");
        std::fs::write(&path, "definitely not a zip").unwrap();

        assert!(matches!(
            extract_text(&path),
            Err(Error::Parse { .. })
        ));
    }
}
