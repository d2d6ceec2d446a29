//! Turns files and uploads into [`Document`]s.
//!
//! Plain text and markdown are read as UTF-8. PDFs go through the `pdftotext`
//! binary (poppler), whose form feeds become page markers.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::Document;

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Text,
    Pdf,
}

impl DocumentFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            Some(DocumentFormat::Text)
        } else if ext == "pdf" {
            Some(DocumentFormat::Pdf)
        } else {
            None
        }
    }
}

/// Load a document from disk. The file name becomes the document source.
pub fn load_path(path: &Path) -> Result<Document> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| Error::DocumentLoad(format!("{} has no file name", path.display())))?;
    let bytes = fs::read(path).map_err(|e| Error::DocumentLoad(format!("{}: {}", path.display(), e)))?;
    load_bytes(&name, &bytes)
}

/// Load an uploaded file by name and content.
pub fn load_bytes(name: &str, bytes: &[u8]) -> Result<Document> {
    match DocumentFormat::from_name(name) {
        Some(DocumentFormat::Text) => {
            let text = std::str::from_utf8(bytes).map_err(|e| Error::DocumentLoad(format!("{name} is not valid UTF-8: {e}")))?;
            Ok(Document::new(name, text))
        }
        Some(DocumentFormat::Pdf) => {
            let text = extract_pdf_text(name, bytes)?;
            Ok(Document::from_paged_text(name, text))
        }
        None => Err(Error::DocumentLoad(format!("unsupported document format: {name}"))),
    }
}

fn extract_pdf_text(name: &str, bytes: &[u8]) -> Result<String> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| Error::DocumentLoad(format!("failed to stage {name}: {e}")))?;
    tmp.write_all(bytes).map_err(|e| Error::DocumentLoad(format!("failed to stage {name}: {e}")))?;

    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(tmp.path())
        .arg("-")
        .output()
        .map_err(|e| Error::DocumentLoad(format!("pdftotext could not run for {name}: {e} (is poppler installed?)")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(document = %name, "pdftotext failed: {}", stderr.trim());
        return Err(Error::DocumentLoad(format!("{name} is not a readable PDF: {}", stderr.trim())));
    }
    let text = String::from_utf8(output.stdout).map_err(|e| Error::DocumentLoad(format!("pdftotext produced invalid UTF-8 for {name}: {e}")))?;
    if text.trim().is_empty() {
        return Err(Error::DocumentLoad(format!("{name} contains no extractable text")));
    }
    info!(document = %name, chars = text.chars().count(), "extracted PDF text");
    Ok(text)
}

/// Supported files under `root`, sorted for deterministic ingestion order.
pub fn discover(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.file_name().and_then(|n| n.to_str()).and_then(DocumentFormat::from_name).is_some())
        .collect();
    files.sort();
    files
}
