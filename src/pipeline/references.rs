//! Figure citations in recognized text.
//!
//! Several lexical patterns are applied independently and merged. The
//! result is a diagnostic: figure numbering in the book comes from
//! extraction order (see [`crate::pipeline::binder`]), never from these
//! citations, so a missed or miscounted citation cannot break a conversion.
//!
//! The converter matches on cleaned page text, where
//! [`clean_page`](crate::pipeline::postprocess::clean_page) has already
//! turned model-invented image links into italic alt text. Inside a
//! conversion an image-markup citation is therefore caught by the bare
//! `Figure N` pattern; the image-markup pattern fires on uncleaned text.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// One figure citation found in the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureReference {
    /// Number as written in the text.
    pub figure_number: u32,
    /// Offset of the match start in characters, not bytes.
    pub char_offset: usize,
    /// The literal matched text.
    pub matched_span: String,
}

/// Citation patterns in priority order. Group 1 is the figure number.
///
/// When two patterns match at the same offset the earlier one wins.
const FIGURE_PATTERNS: &[&str] = &[
    r"Figure\s+(\d+)",
    r"Fig\.\s*(\d+)",
    r"FIG\.\s*(\d+)",
    r"\[Figure\s+(\d+)\]",
    r"!\[[^\]]*?Figure\s+(\d+)[^\]]*?\]",
];

static COMPILED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    FIGURE_PATTERNS
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .unwrap()
        })
        .collect()
});

/// Find all figure citations, ordered by offset, at most one per offset.
pub fn find_references(text: &str) -> Vec<FigureReference> {
    let mut references: Vec<FigureReference> = COMPILED_PATTERNS
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let figure_number = caps[1].parse::<u32>().ok().filter(|n| *n > 0)?;
            Some(FigureReference {
                figure_number,
                char_offset: whole.start(),
                matched_span: whole.as_str().to_string(),
            })
        })
        .collect();

    // Stable sort keeps pattern-declaration order among equal offsets.
    references.sort_by_key(|r| r.char_offset);
    references.dedup_by_key(|r| r.char_offset);

    // Offsets were collected as byte positions; count characters up to each.
    let (mut last_byte, mut chars) = (0, 0);
    for reference in &mut references {
        chars += text[last_byte..reference.char_offset].chars().count();
        last_byte = reference.char_offset;
        reference.char_offset = chars;
    }
    references
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(refs: &[FigureReference]) -> Vec<u32> {
        refs.iter().map(|r| r.figure_number).collect()
    }

    #[test]
    fn mixed_spellings_in_offset_order() {
        let refs = find_references("Figure 1 and Fig. 2 and FIG. 2");
        assert_eq!(numbers(&refs), vec![1, 2, 2]);
        let offsets: Vec<usize> = refs.iter().map(|r| r.char_offset).collect();
        assert_eq!(offsets, vec![0, 13, 24]);
        assert_eq!(refs[1].matched_span, "Fig. 2");
    }

    #[test]
    fn no_citations_is_empty() {
        assert!(find_references("").is_empty());
        assert!(find_references("A figure without a number.").is_empty());
    }

    #[test]
    fn case_insensitive_and_optional_space() {
        let refs = find_references("see figure 4, fig.5 and FIGURE 6");
        assert_eq!(numbers(&refs), vec![4, 5, 6]);
    }

    #[test]
    fn bracketed_and_image_forms_keep_their_own_offset() {
        let text = "[Figure 3] then ![Figure 7: overview](a.png)";
        let refs = find_references(text);
        // "[Figure 3]" starts at 0, bare "Figure 3" at 1; image form at 16,
        // bare "Figure 7" inside it at 18.
        let offsets: Vec<usize> = refs.iter().map(|r| r.char_offset).collect();
        assert_eq!(offsets, vec![0, 1, 16, 18]);
        assert_eq!(refs[0].matched_span, "[Figure 3]");
        assert!(refs[2].matched_span.starts_with("![Figure 7"));
    }

    #[test]
    fn offsets_are_unique() {
        let text = "Fig. 1, FIG. 1, Figure 2 [Figure 2] ![Figure 2](x) fig.3";
        let refs = find_references(text);
        let mut offsets: Vec<usize> = refs.iter().map(|r| r.char_offset).collect();
        let before = offsets.len();
        offsets.dedup();
        assert_eq!(offsets.len(), before);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn same_offset_keeps_first_pattern() {
        // "Fig. 9" is caught by both the Fig. and FIG. patterns at offset 0.
        let refs = find_references("Fig. 9");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].matched_span, "Fig. 9");
    }

    #[test]
    fn idempotent() {
        let text = "Figure 2 shows it; compare Fig. 1 and [Figure 3].";
        assert_eq!(find_references(text), find_references(text));
    }

    #[test]
    fn zero_and_overflow_are_ignored() {
        assert!(find_references("Figure 0").is_empty());
        assert!(find_references("Figure 99999999999999").is_empty());
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let refs = find_references("Über Figure 1");
        assert_eq!(refs[0].char_offset, 5);

        let refs = find_references("Ω≈ Fig. 2 - see Figure 3");
        let offsets: Vec<usize> = refs.iter().map(|r| r.char_offset).collect();
        assert_eq!(offsets, vec![3, 16]);
    }

    #[test]
    fn image_citation_survives_page_cleanup() {
        let raw = "See ![Figure 3: overview](fig3.png) here.";
        assert_eq!(numbers(&find_references(raw)), vec![3, 3]);

        let cleaned = crate::pipeline::postprocess::clean_page(raw);
        let refs = find_references(&cleaned);
        assert_eq!(numbers(&refs), vec![3]);
        assert_eq!(refs[0].matched_span, "Figure 3");
    }
}
