//! PDF text extraction stage.
//!
//! Lists a directory, pulls the text out of every `*.pdf` entry, and writes
//! one combined text file in which each document is introduced by a
//! `File: {name}` header line. A file that fails to extract is logged and
//! skipped; only an unreadable input directory aborts the run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::RagError;

/// Turns one file into plain UTF-8 text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, RagError>;
}

/// [`TextExtractor`] backed by `pdf-extract`.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor {
    max_file_bytes: Option<u64>,
}

impl PdfExtractor {
    pub fn new(max_file_bytes: Option<u64>) -> Self {
        Self { max_file_bytes }
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String, RagError> {
        let name = display_name(path);

        if let Some(limit) = self.max_file_bytes {
            let size = std::fs::metadata(path)
                .map_err(|e| RagError::extraction(&name, e.to_string()))?
                .len();
            if size > limit {
                return Err(RagError::extraction(
                    &name,
                    format!("file is {} bytes, limit is {}", size, limit),
                ));
            }
        }

        let bytes = std::fs::read(path).map_err(|e| RagError::extraction(&name, e.to_string()))?;
        extract_pdf_bytes(&name, &bytes)
    }
}

/// Extract text from an in-memory PDF. Parser panics become errors.
pub fn extract_pdf_bytes(name: &str, bytes: &[u8]) -> Result<String, RagError> {
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(RagError::extraction(name, e.to_string())),
        Err(_) => Err(RagError::extraction(name, "PDF parser panicked")),
    }
}

/// A file the extractor gave up on.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

/// Outcome of [`process_pdfs`].
#[derive(Debug, Clone)]
pub struct ExtractReport {
    pub output_path: PathBuf,
    /// File names that made it into the output, in output order.
    pub extracted: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

/// Extract every `*.pdf` in `pdf_dir` and write the combined text to `output_path`.
///
/// Entries are visited in lexicographic file-name order so the output is
/// stable across filesystems. The directory is not descended into.
///
/// # Errors
///
/// [`RagError::DirectoryRead`] if `pdf_dir` cannot be listed, or an I/O
/// error if the output cannot be written. Per-file failures are reported in
/// [`ExtractReport::skipped`] instead.
pub fn process_pdfs(
    pdf_dir: &Path,
    output_path: &Path,
    extractor: &dyn TextExtractor,
) -> Result<ExtractReport> {
    // Surfaces missing directories and non-directories before walking.
    std::fs::read_dir(pdf_dir).map_err(|source| RagError::DirectoryRead {
        path: pdf_dir.to_path_buf(),
        source,
    })?;

    let mut combined = String::new();
    let mut extracted = Vec::new();
    let mut skipped = Vec::new();

    let walker = WalkDir::new(pdf_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                return Err(RagError::DirectoryRead {
                    path: pdf_dir.to_path_buf(),
                    source,
                }
                .into());
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        let filename = entry.file_name().to_string_lossy().to_string();
        if !filename.ends_with(".pdf") {
            continue;
        }

        match extractor.extract(entry.path()) {
            Ok(text) => {
                combined.push_str(&format!("File: {}\n{}\n", filename, text));
                tracing::info!(file = %filename, chars = text.chars().count(), "extracted text");
                extracted.push(filename);
            }
            Err(e) => {
                tracing::warn!(file = %filename, error = %e, "skipping file");
                skipped.push(SkippedFile {
                    file: filename,
                    reason: e.to_string(),
                });
            }
        }
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    std::fs::write(output_path, &combined)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    tracing::info!(path = %output_path.display(), "saved combined extracted text");

    Ok(ExtractReport {
        output_path: output_path.to_path_buf(),
        extracted,
        skipped,
    })
}

/// `rag extract`: run [`process_pdfs`] with the configured paths and print a summary.
pub fn run_extract(config: &Config) -> Result<ExtractReport> {
    let extractor = PdfExtractor::new(config.extract.max_file_bytes);
    let report = process_pdfs(
        &config.paths.pdf_dir,
        &config.paths.output_file,
        &extractor,
    )?;

    println!("extract {}", config.paths.pdf_dir.display());
    println!("  files extracted: {}", report.extracted.len());
    println!("  extraction skipped: {}", report.skipped.len());
    for s in &report.skipped {
        println!("    {}: {}", s.file, s.reason);
    }
    println!("  output: {}", report.output_path.display());

    Ok(report)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Treats files as UTF-8 text; anything starting with "BROKEN" fails.
    struct PlainTextExtractor;

    impl TextExtractor for PlainTextExtractor {
        fn extract(&self, path: &Path) -> Result<String, RagError> {
            let name = display_name(path);
            let text =
                fs::read_to_string(path).map_err(|e| RagError::extraction(&name, e.to_string()))?;
            if text.starts_with("BROKEN") {
                return Err(RagError::extraction(&name, "corrupt"));
            }
            Ok(text)
        }
    }

    fn write_files(dir: &Path, files: &[(&str, &str)]) {
        for (name, body) in files {
            fs::write(dir.join(name), body).unwrap();
        }
    }

    #[test]
    fn one_header_per_pdf_and_none_for_other_files() {
        let tmp = TempDir::new().unwrap();
        let pdfs = tmp.path().join("pdfs");
        fs::create_dir(&pdfs).unwrap();
        write_files(
            &pdfs,
            &[
                ("b.pdf", "bravo"),
                ("a.pdf", "alpha"),
                ("notes.txt", "ignored"),
                ("scan.PDF", "ignored, suffix is case-sensitive"),
            ],
        );
        let out = tmp.path().join("out/combined.txt");

        let report = process_pdfs(&pdfs, &out, &PlainTextExtractor).unwrap();
        let combined = fs::read_to_string(&out).unwrap();

        assert_eq!(combined, "File: a.pdf\nalpha\nFile: b.pdf\nbravo\n");
        assert_eq!(report.extracted, vec!["a.pdf", "b.pdf"]);
        assert!(report.skipped.is_empty());
        assert_eq!(combined.matches("File: ").count(), 2);
    }

    #[test]
    fn failing_file_is_skipped_and_others_survive() {
        let tmp = TempDir::new().unwrap();
        write_files(
            tmp.path(),
            &[
                ("1.pdf", "first"),
                ("2.pdf", "BROKEN bytes"),
                ("3.pdf", "third"),
            ],
        );
        let out = tmp.path().join("combined.txt");

        let report = process_pdfs(tmp.path(), &out, &PlainTextExtractor).unwrap();
        let combined = fs::read_to_string(&out).unwrap();

        assert!(combined.contains("File: 1.pdf\nfirst\n"));
        assert!(combined.contains("File: 3.pdf\nthird\n"));
        assert!(!combined.contains("2.pdf"));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].file, "2.pdf");
    }

    #[test]
    fn missing_directory_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = process_pdfs(
            &tmp.path().join("nope"),
            &tmp.path().join("out.txt"),
            &PlainTextExtractor,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::DirectoryRead { .. })
        ));
        assert!(!tmp.path().join("out.txt").exists());
    }

    #[test]
    fn empty_directory_writes_empty_file() {
        let tmp = TempDir::new().unwrap();
        let pdfs = tmp.path().join("pdfs");
        fs::create_dir(&pdfs).unwrap();
        let out = tmp.path().join("combined.txt");

        let report = process_pdfs(&pdfs, &out, &PlainTextExtractor).unwrap();
        assert!(report.extracted.is_empty());
        assert_eq!(fs::read_to_string(&out).unwrap(), "");
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_pdf_bytes("bad.pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, RagError::Extraction { .. }));
    }

    #[test]
    fn oversized_pdf_is_rejected_before_parsing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.pdf");
        fs::write(&path, vec![0u8; 2000]).unwrap();

        let err = PdfExtractor::new(Some(1000)).extract(&path).unwrap_err();
        assert!(err.to_string().contains("limit is 1000"));
    }
}
