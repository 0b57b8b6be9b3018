//! Input validation: the `Init` stage of the conversion.
//!
//! These are the only checks that abort the state machine before any page
//! is touched. We validate the `.pdf` extension and the `%PDF` magic bytes
//! so callers get a meaningful error rather than a pdfium crash.

use crate::error::Paper2EpubError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` names a readable PDF file.
pub fn validate_input(path: &Path) -> Result<PathBuf, Paper2EpubError> {
    if !path.exists() {
        return Err(Paper2EpubError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(Paper2EpubError::InputFormat {
            path: path.to_path_buf(),
            detail: "not a regular file".into(),
        });
    }

    let has_pdf_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if !has_pdf_extension {
        return Err(Paper2EpubError::InputFormat {
            path: path.to_path_buf(),
            detail: "expected a .pdf extension".into(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
                return Err(Paper2EpubError::InputFormat {
                    path: path.to_path_buf(),
                    detail: format!("missing %PDF header, first bytes: {magic:?}"),
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Paper2EpubError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(Paper2EpubError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Validated input PDF: {}", path.display());
    Ok(path.to_path_buf())
}

/// Default book path: the input with an `.epub` extension.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("epub")
}

/// Path of the intermediate Markdown artifact written next to the input.
pub fn markdown_path(input: &Path) -> PathBuf {
    input.with_extension("md")
}

/// Title and author guessed from a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameMetadata {
    pub title: String,
    pub author: Option<String>,
}

/// Guess metadata from a file name of the form `"Author - Title.pdf"`.
///
/// Without a `" - "` separator the whole stem is the title.
pub fn metadata_from_filename(path: &Path) -> FilenameMetadata {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match stem.split_once(" - ") {
        Some((author, title)) if !author.trim().is_empty() && !title.trim().is_empty() => {
            FilenameMetadata {
                title: title.trim().to_string(),
                author: Some(author.trim().to_string()),
            }
        }
        _ => FilenameMetadata {
            title: stem,
            author: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = validate_input(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, Paper2EpubError::InputNotFound { .. }));
    }

    #[test]
    fn wrong_extension_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("document.txt");
        std::fs::write(&path, b"%PDF-1.7").unwrap();
        let err = validate_input(&path).unwrap_err();
        assert!(matches!(err, Paper2EpubError::InputFormat { .. }));
    }

    #[test]
    fn wrong_magic_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"PK\x03\x04 not a pdf").unwrap();
        let err = validate_input(&path).unwrap_err();
        assert!(matches!(err, Paper2EpubError::InputFormat { .. }));
    }

    #[test]
    fn valid_pdf_header_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.PDF");
        std::fs::write(&path, b"%PDF-1.4\n%%EOF\n").unwrap();
        assert_eq!(validate_input(&path).unwrap(), path);
    }

    #[test]
    fn output_paths() {
        let input = Path::new("/tmp/paper.pdf");
        assert_eq!(default_output_path(input), PathBuf::from("/tmp/paper.epub"));
        assert_eq!(markdown_path(input), PathBuf::from("/tmp/paper.md"));
    }

    #[test]
    fn filename_metadata_simple() {
        let m = metadata_from_filename(Path::new("paper.pdf"));
        assert_eq!(m.title, "paper");
        assert_eq!(m.author, None);
    }

    #[test]
    fn filename_metadata_with_author() {
        let m = metadata_from_filename(Path::new("John Doe - Research Paper.pdf"));
        assert_eq!(m.title, "Research Paper");
        assert_eq!(m.author.as_deref(), Some("John Doe"));
    }
}
