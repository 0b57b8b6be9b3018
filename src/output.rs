//! Output types returned by a conversion.

use crate::error::{AssetSkip, PageError};
use crate::pipeline::references::FigureReference;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Stage of the conversion state machine.
///
/// ```text
/// Init → TextExtracting → FiguresExtracting → Binding → Packaging → Done
/// ```
///
/// `FiguresExtracting` and `Binding` are skipped when figure extraction is
/// disabled. Any stage may end the run with a fatal error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStage {
    Init,
    TextExtracting,
    FiguresExtracting,
    Binding,
    Packaging,
    Done,
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConversionStage::Init => "init",
            ConversionStage::TextExtracting => "text extraction",
            ConversionStage::FiguresExtracting => "figure extraction",
            ConversionStage::Binding => "figure binding",
            ConversionStage::Packaging => "packaging",
            ConversionStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// One packaged asset: synthesized filename plus encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedAsset {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Title/author/page count read from the PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub page_count: usize,
}

/// Timings and counts for a finished conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages that yielded text.
    pub processed_pages: usize,
    /// Pages attempted but failed.
    pub failed_pages: usize,
    /// Figures bound into the book.
    pub figures: usize,
    /// Embedded images dropped because they could not be decoded.
    pub skipped_figures: usize,
    pub render_duration_ms: u64,
    pub recognition_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a successful conversion.
///
/// Success may be partial: inspect `page_failures` and `asset_skips`.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    /// Recognized text with the trailing figures section appended.
    pub body_text: String,
    /// Assets in the order they were handed to the packager.
    #[serde(skip)]
    pub assets: Vec<NamedAsset>,
    /// Non-fatal per-page failures, in page order.
    pub page_failures: Vec<PageError>,
    /// Embedded images that could not be decoded.
    pub asset_skips: Vec<AssetSkip>,
    /// Figure citations found in the recognized text (diagnostic only).
    pub figure_references: Vec<FigureReference>,
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
    /// Path of the written book.
    pub output_path: PathBuf,
    /// Path of the intermediate Markdown file, when one was written.
    pub markdown_path: Option<PathBuf>,
}

impl ConversionResult {
    /// Asset filenames in packaging order.
    pub fn asset_names(&self) -> Vec<&str> {
        self.assets.iter().map(|a| a.filename.as_str()).collect()
    }

    /// `(page, reason)` pairs for the failed pages.
    pub fn failure_summary(&self) -> Vec<(usize, String)> {
        self.page_failures
            .iter()
            .map(|e| (e.page(), e.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display() {
        assert_eq!(ConversionStage::FiguresExtracting.to_string(), "figure extraction");
        assert_eq!(ConversionStage::Done.to_string(), "done");
    }

    #[test]
    fn result_serialises_without_bytes() {
        let result = ConversionResult {
            body_text: "Result".into(),
            assets: vec![NamedAsset {
                filename: "figure_001.png".into(),
                bytes: vec![1, 2, 3],
            }],
            page_failures: vec![PageError::EmptyOutput { page: 1 }],
            asset_skips: vec![],
            figure_references: vec![],
            metadata: DocumentMetadata::default(),
            stats: ConversionStats::default(),
            output_path: PathBuf::from("out.epub"),
            markdown_path: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"body_text\":\"Result\""));
        assert!(!json.contains("\"assets\""));
        assert_eq!(result.asset_names(), vec!["figure_001.png"]);
        assert_eq!(result.failure_summary()[0].0, 1);
    }
}
