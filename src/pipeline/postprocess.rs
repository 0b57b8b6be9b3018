//! Post-processing: deterministic cleanup of recognized page text.
//!
//! Vision models occasionally wrap their answer in code fences, mix LaTeX
//! delimiter styles, or invent `![...](...)` links for figures they can see
//! but not reproduce. Figures are extracted from the PDF separately, so any
//! image link in recognized text is spurious and becomes its italic caption.
//!
//! Rules run in a fixed order: fences and line endings first so later rules
//! see clean lines; blank-line collapsing last because earlier rules can
//! leave gaps behind.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to one page of recognized text.
///
/// The result has no trailing newline; an all-whitespace page becomes `""`,
/// which the orchestrator treats as an empty recognition.
pub fn clean_page(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = normalise_math_delimiters(&s);
    let s = replace_image_links(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Fences ───────────────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Whitespace ───────────────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'],
        "",
    )
}

// ── Math delimiters ──────────────────────────────────────────────────────────
//
// `\[ ... \]` becomes a `$$` block on its own lines and `\( ... \)` becomes
// `$...$`, the only two forms the packager's math rendering understands.

static RE_DISPLAY_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\\\[(.+?)\\\]").unwrap());
static RE_INLINE_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\\\((.+?)\\\)").unwrap());

fn normalise_math_delimiters(input: &str) -> String {
    let s = RE_DISPLAY_MATH.replace_all(input, |caps: &regex::Captures<'_>| {
        format!("\n$$\n{}\n$$\n", caps[1].trim())
    });
    RE_INLINE_MATH
        .replace_all(&s, |caps: &regex::Captures<'_>| format!("${}$", caps[1].trim()))
        .into_owned()
}

// ── Image links ──────────────────────────────────────────────────────────────

static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").unwrap());

fn replace_image_links(input: &str) -> String {
    RE_IMAGE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let alt = caps[1].trim();
            if alt.is_empty() {
                String::new()
            } else {
                format!("*{}*", alt)
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences() {
        assert_eq!(strip_markdown_fences("```markdown\n# A\nB\n```"), "# A\nB");
        assert_eq!(strip_markdown_fences("```\n# A\n```"), "# A");
        assert_eq!(strip_markdown_fences("# A\nB"), "# A\nB");
    }

    #[test]
    fn normalises_whitespace() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(trim_trailing_whitespace("  a   \nb  "), "  a\nb");
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn removes_invisible_chars() {
        assert_eq!(remove_invisible_chars("a\u{200B}b\u{FEFF}c\u{00AD}d"), "abcd");
    }

    #[test]
    fn converts_latex_delimiters() {
        let out = normalise_math_delimiters(r"Energy \(E = mc^2\) and \[ \int_0^1 x\,dx \]");
        assert!(out.contains("$E = mc^2$"), "got: {out}");
        assert!(out.contains("\n$$\n\\int_0^1 x\\,dx\n$$\n"), "got: {out}");
    }

    #[test]
    fn dollar_math_is_untouched() {
        let input = "Let $x$ be\n$$\ny = x^2\n$$";
        assert_eq!(normalise_math_delimiters(input), input);
    }

    #[test]
    fn image_links_become_captions() {
        assert_eq!(
            replace_image_links("See ![Figure 2: Loss curve](fig2.png) here"),
            "See *Figure 2: Loss curve* here"
        );
        assert_eq!(replace_image_links("![](x.png)"), "");
    }

    #[test]
    fn whitespace_only_page_is_empty() {
        assert_eq!(clean_page("  \n\n \u{200B}\n"), "");
    }

    #[test]
    fn full_pipeline() {
        let input = "```markdown\n## 2 Method\r\n\r\nWe minimise \\(L\\).   \n\n\n\n![plot](p.png)\n```";
        let out = clean_page(input);
        assert_eq!(out, "## 2 Method\n\nWe minimise $L$.\n\n*plot*");
    }
}
