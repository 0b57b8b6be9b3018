//! Figure binding: number extracted figures and attach them to the text.
//!
//! Numbers follow extraction order, `(page_number, index_on_page)`
//! ascending, starting at 1. Citations in the text are never consulted.
//! Figures are placed in one trailing section, not inline.

use crate::config::ImageFormat;
use crate::output::NamedAsset;
use crate::pipeline::figures::RasterAsset;

/// Heading of the appended figures section.
pub const FIGURES_HEADING: &str = "## Figures";

/// A figure with its final number and file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundFigure {
    pub assigned_number: u32,
    pub asset_filename: String,
    pub encoded_bytes: Vec<u8>,
    /// Page of origin, kept for diagnostics.
    pub page_number: usize,
    pub index_on_page: usize,
}

impl From<BoundFigure> for NamedAsset {
    fn from(figure: BoundFigure) -> Self {
        NamedAsset {
            filename: figure.asset_filename,
            bytes: figure.encoded_bytes,
        }
    }
}

/// `figure_007.png` for figure 7 in PNG.
pub fn figure_filename(number: u32, format: ImageFormat) -> String {
    format!("figure_{:03}.{}", number, format.extension())
}

/// Number assets in extraction order. The input order does not matter.
pub fn assign_numbers(mut assets: Vec<RasterAsset>) -> Vec<BoundFigure> {
    assets.sort_by_key(|a| (a.page_number, a.index_on_page));
    assets
        .into_iter()
        .zip(1u32..)
        .map(|(asset, n)| BoundFigure {
            assigned_number: n,
            asset_filename: figure_filename(n, asset.format),
            encoded_bytes: asset.encoded_bytes,
            page_number: asset.page_number,
            index_on_page: asset.index_on_page,
        })
        .collect()
}

/// Render the trailing figures section for already-numbered figures.
///
/// Returns an empty string when there are no figures.
pub fn figures_section(figures: &[BoundFigure], path_prefix: &str) -> String {
    if figures.is_empty() {
        return String::new();
    }
    let mut section = format!("\n\n{}\n\n", FIGURES_HEADING);
    for fig in figures {
        section.push_str(&format!(
            "![Figure {}]({}{})\n\n",
            fig.assigned_number, path_prefix, fig.asset_filename
        ));
    }
    section
}

/// Append a figures section to `text` and return the assets to package.
///
/// With no assets the text comes back unchanged and the list is empty.
pub fn bind(text: &str, assets: Vec<RasterAsset>, path_prefix: &str) -> (String, Vec<NamedAsset>) {
    let figures = assign_numbers(assets);
    let mut augmented = String::with_capacity(text.len() + figures.len() * 40);
    augmented.push_str(text);
    augmented.push_str(&figures_section(&figures, path_prefix));
    let named = figures.into_iter().map(NamedAsset::from).collect();
    (augmented, named)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(page: usize, index: usize, byte: u8) -> RasterAsset {
        RasterAsset {
            page_number: page,
            index_on_page: index,
            pixel_width: 200,
            pixel_height: 200,
            encoded_bytes: vec![byte],
            format: ImageFormat::Png,
            source_format: "DCTDecode".into(),
        }
    }

    #[test]
    fn filename_is_zero_padded() {
        assert_eq!(figure_filename(1, ImageFormat::Png), "figure_001.png");
        assert_eq!(figure_filename(42, ImageFormat::Jpeg), "figure_042.jpeg");
        assert_eq!(figure_filename(1234, ImageFormat::Png), "figure_1234.png");
    }

    #[test]
    fn empty_assets_leave_text_unchanged() {
        let (text, assets) = bind("Body text\n", Vec::new(), "images/");
        assert_eq!(text, "Body text\n");
        assert!(assets.is_empty());
    }

    #[test]
    fn numbering_ignores_input_order() {
        let figures = assign_numbers(vec![asset(3, 0, 30), asset(1, 0, 10)]);
        let page3 = figures.iter().find(|f| f.page_number == 3).unwrap();
        let page1 = figures.iter().find(|f| f.page_number == 1).unwrap();
        assert_eq!(page3.asset_filename, "figure_002.png");
        assert_eq!(page1.asset_filename, "figure_001.png");
        assert_eq!(page1.encoded_bytes, vec![10]);
    }

    #[test]
    fn index_on_page_breaks_ties() {
        let figures = assign_numbers(vec![asset(2, 1, 21), asset(2, 0, 20), asset(1, 4, 14)]);
        let order: Vec<(usize, usize, u32)> = figures
            .iter()
            .map(|f| (f.page_number, f.index_on_page, f.assigned_number))
            .collect();
        assert_eq!(order, vec![(1, 4, 1), (2, 0, 2), (2, 1, 3)]);
    }

    #[test]
    fn two_pages_one_section() {
        let (text, assets) = bind("Intro", vec![asset(1, 0, 1), asset(2, 0, 2)], "images/");
        assert_eq!(text.matches(FIGURES_HEADING).count(), 1);
        let first = text.find("![Figure 1](images/figure_001.png)").unwrap();
        let second = text.find("![Figure 2](images/figure_002.png)").unwrap();
        assert!(first < second);
        assert!(text.starts_with("Intro\n\n## Figures\n\n"));
        let names: Vec<&str> = assets.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["figure_001.png", "figure_002.png"]);
    }

    #[test]
    fn prefix_is_used_verbatim() {
        let (text, _) = bind("", vec![asset(1, 0, 1)], "");
        assert!(text.contains("![Figure 1](figure_001.png)"));
    }
}
