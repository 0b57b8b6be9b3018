//! EPUB 3 writer.
//!
//! ## Container layout
//!
//! ```text
//! mimetype                      stored, always the first entry
//! META-INF/container.xml
//! OEBPS/content.opf             metadata, manifest, spine
//! OEBPS/nav.xhtml               EPUB 3 navigation document
//! OEBPS/toc.ncx                 EPUB 2 table of contents for older readers
//! OEBPS/style/book.css
//! OEBPS/content.xhtml           the whole body as one chapter
//! OEBPS/<prefix><filename>      one entry per asset, in request order
//! ```
//!
//! The body is Markdown. Math survives as `\( \)` / `\[ \]` spans that the
//! MathJax script in `content.xhtml` typesets; raw HTML in the body is
//! escaped so the chapter stays well-formed XHTML. The book is written to a
//! temporary file beside `output` and renamed into place, so a failed run
//! never leaves a truncated book.

use crate::config::ImageFormat;
use crate::error::PackagingError;
use crate::output::NamedAsset;
use crate::package::{PackageRequest, Packager};
use html_escape::{encode_double_quoted_attribute, encode_text};
use once_cell::sync::Lazy;
use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// MathJax build loaded by `content.xhtml`.
pub const MATHJAX_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/mathjax/3.2.0/es5/tex-mml-chtml.js";

const BOOK_CSS: &str = r#"body {
    font-family: Georgia, serif;
    line-height: 1.6;
    margin: 2em;
}
h1, h2, h3, h4, h5, h6 {
    font-family: Arial, sans-serif;
    margin-top: 1.5em;
    margin-bottom: 0.5em;
}
table {
    border-collapse: collapse;
    width: 100%;
    margin: 1em 0;
}
th, td {
    border: 1px solid #ddd;
    padding: 8px;
    text-align: left;
}
th {
    background-color: #f2f2f2;
}
code {
    background-color: #f4f4f4;
    padding: 2px 5px;
    border-radius: 3px;
}
pre {
    background-color: #f4f4f4;
    padding: 1em;
    border-radius: 5px;
    overflow-x: auto;
}
img {
    max-width: 100%;
    height: auto;
}
.math.display {
    display: block;
    text-align: center;
    margin: 1em 0;
}
"#;

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// [`Packager`] that writes an EPUB 3 book.
#[derive(Debug, Clone)]
pub struct EpubPackager {
    mathjax: bool,
}

impl Default for EpubPackager {
    fn default() -> Self {
        Self { mathjax: true }
    }
}

impl EpubPackager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave the MathJax script out; math stays as raw LaTeX.
    pub fn without_mathjax(mut self) -> Self {
        self.mathjax = false;
        self
    }
}

impl Packager for EpubPackager {
    fn package(
        &self,
        request: &PackageRequest<'_>,
        output: &Path,
    ) -> Result<PathBuf, PackagingError> {
        validate_request(request)?;

        let body = render_body(request.body_text);
        let book = BookParts {
            request,
            identifier: format!("paper2epub_{}", request.title),
            modified: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            body,
            mathjax: self.mathjax,
        };

        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|source| PackagingError::Io {
            path: parent.clone(),
            source,
        })?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".paper2epub-")
            .suffix(".epub.tmp")
            .tempfile_in(&parent)
            .map_err(|source| PackagingError::Io {
                path: parent.clone(),
                source,
            })?;
        let tmp_path = tmp.path().to_path_buf();

        write_container(tmp.as_file_mut(), &book).map_err(|e| match e {
            WriteError::Zip(z) => PackagingError::Zip(z),
            WriteError::Io(source) => PackagingError::Io {
                path: tmp_path.clone(),
                source,
            },
        })?;

        tmp.persist(output).map_err(|e| PackagingError::Io {
            path: output.to_path_buf(),
            source: e.error,
        })?;

        info!(
            "EPUB written: {} ({} assets)",
            output.display(),
            request.assets.len()
        );
        Ok(output.to_path_buf())
    }
}

// ── Validation ───────────────────────────────────────────────────────────────

static RE_IMAGE_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\(([^)\s]+)\)").unwrap());

fn validate_request(request: &PackageRequest<'_>) -> Result<(), PackagingError> {
    if request.title.trim().is_empty() {
        return Err(PackagingError::InvalidRequest("title is empty".into()));
    }
    if request.language.trim().is_empty() {
        return Err(PackagingError::InvalidRequest("language is empty".into()));
    }
    let prefix = request.image_path_prefix;
    if !is_plain_prefix(prefix) {
        return Err(PackagingError::InvalidRequest(format!(
            "image path prefix '{prefix}' must be a relative path inside the book \
             without '.', '..' or empty segments"
        )));
    }

    let mut seen = HashSet::with_capacity(request.assets.len());
    for asset in request.assets {
        let name = asset.filename.as_str();
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(PackagingError::InvalidRequest(format!(
                "invalid asset filename '{name}'"
            )));
        }
        if !seen.insert(name) {
            return Err(PackagingError::InvalidRequest(format!(
                "duplicate asset filename '{name}'"
            )));
        }
    }

    for caps in RE_IMAGE_TARGET.captures_iter(request.body_text) {
        let target = &caps[1];
        if target.contains("://") || target.starts_with("data:") {
            continue;
        }
        if let Some(name) = target.strip_prefix(prefix) {
            if !seen.contains(name) {
                return Err(PackagingError::MissingAsset(name.to_string()));
            }
        }
    }
    Ok(())
}

/// Zip entry names are not normalised by readers, so every directory
/// segment of the prefix must be a real name: `images/` and `a/b/` pass,
/// `./images/`, `a//b/` and `/images/` do not.
fn is_plain_prefix(prefix: &str) -> bool {
    if prefix.contains('\\') {
        return false;
    }
    // Text after the last '/' is prepended to the filename itself.
    let directories = prefix.rsplit_once('/').map_or("", |(dirs, _)| dirs);
    !prefix.contains('/')
        || directories
            .split('/')
            .all(|segment| !matches!(segment, "" | "." | ".."))
}

/// Media type for an asset, from its extension. Unknown extensions are
/// declared as PNG.
pub fn media_type(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if let Ok(format) = ext.parse::<ImageFormat>() {
        return format.mime_type();
    }
    match ext.as_str() {
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "image/png",
    }
}

// ── Markdown → XHTML ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct TocEntry {
    anchor: String,
    text: String,
}

#[derive(Debug)]
struct RenderedBody {
    xhtml: String,
    toc: Vec<TocEntry>,
}

fn render_body(markdown: &str) -> RenderedBody {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_MATH;

    let mut events: Vec<Event<'_>> = Vec::new();
    let mut toc = Vec::new();
    let mut heading_count = 0usize;
    // (anchor, text, goes into the TOC)
    let mut open_heading: Option<(String, String, bool)> = None;

    for event in Parser::new_ext(markdown, options) {
        let event = match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                heading_count += 1;
                let anchor = id
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("section-{heading_count}"));
                let listed = matches!(level, HeadingLevel::H1 | HeadingLevel::H2);
                open_heading = Some((anchor.clone(), String::new(), listed));
                Event::Start(Tag::Heading {
                    level,
                    id: Some(CowStr::from(anchor)),
                    classes,
                    attrs,
                })
            }
            Event::End(TagEnd::Heading(level)) => {
                if let Some((anchor, text, true)) = open_heading.take() {
                    toc.push(TocEntry {
                        anchor,
                        text: text.trim().to_string(),
                    });
                }
                Event::End(TagEnd::Heading(level))
            }
            Event::InlineMath(tex) => {
                push_heading_text(&mut open_heading, &tex);
                Event::InlineHtml(CowStr::from(format!(
                    r#"<span class="math inline">\({}\)</span>"#,
                    encode_text(&*tex)
                )))
            }
            Event::DisplayMath(tex) => Event::InlineHtml(CowStr::from(format!(
                r#"<span class="math display">\[{}\]</span>"#,
                encode_text(&*tex)
            ))),
            // Raw HTML from the recognizer is shown as text.
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::Text(t) => {
                push_heading_text(&mut open_heading, &t);
                Event::Text(t)
            }
            Event::Code(t) => {
                push_heading_text(&mut open_heading, &t);
                Event::Code(t)
            }
            other => other,
        };
        events.push(event);
    }

    let mut xhtml = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut xhtml, events.into_iter());
    RenderedBody { xhtml, toc }
}

fn push_heading_text(open: &mut Option<(String, String, bool)>, text: &str) {
    if let Some((_, buf, _)) = open.as_mut() {
        buf.push_str(text);
    }
}

// ── Container ────────────────────────────────────────────────────────────────

struct BookParts<'a> {
    request: &'a PackageRequest<'a>,
    identifier: String,
    modified: String,
    body: RenderedBody,
    mathjax: bool,
}

impl BookParts<'_> {
    /// TOC entries; the book title when the body has no top-level headings.
    fn toc(&self) -> Vec<TocEntry> {
        if self.body.toc.is_empty() {
            vec![TocEntry {
                anchor: String::new(),
                text: self.request.title.to_string(),
            }]
        } else {
            self.body.toc.clone()
        }
    }

    fn asset_href(&self, asset: &NamedAsset) -> String {
        format!("{}{}", self.request.image_path_prefix, asset.filename)
    }

    fn content_opf(&self) -> String {
        let r = self.request;
        let mut manifest = String::new();
        manifest.push_str(
            "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
        );
        manifest.push_str(
            "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
        );
        manifest.push_str(
            "    <item id=\"css\" href=\"style/book.css\" media-type=\"text/css\"/>\n",
        );
        let properties = if self.mathjax {
            " properties=\"scripted remote-resources\""
        } else {
            ""
        };
        manifest.push_str(&format!(
            "    <item id=\"content\" href=\"content.xhtml\" media-type=\"application/xhtml+xml\"{properties}/>\n"
        ));
        for (i, asset) in r.assets.iter().enumerate() {
            manifest.push_str(&format!(
                "    <item id=\"asset-{}\" href=\"{}\" media-type=\"{}\"/>\n",
                i + 1,
                encode_double_quoted_attribute(&self.asset_href(asset)),
                media_type(&asset.filename)
            ));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="book-id" xml:lang="{lang}">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">{id}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:creator>{author}</dc:creator>
    <dc:language>{lang}</dc:language>
    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
    <itemref idref="nav" linear="no"/>
    <itemref idref="content"/>
  </spine>
</package>
"#,
            lang = encode_double_quoted_attribute(r.language),
            id = encode_text(&self.identifier),
            title = encode_text(r.title),
            author = encode_text(r.author),
            modified = self.modified,
            manifest = manifest,
        )
    }

    fn nav_xhtml(&self) -> String {
        let items: String = self
            .toc()
            .iter()
            .map(|e| {
                format!(
                    "      <li><a href=\"{}\">{}</a></li>\n",
                    encode_double_quoted_attribute(&content_link(&e.anchor)),
                    encode_text(&e.text)
                )
            })
            .collect();
        let lang = encode_double_quoted_attribute(self.request.language);
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{lang}" lang="{lang}">
<head>
  <meta charset="UTF-8"/>
  <title>{title}</title>
</head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>{title}</h1>
    <ol>
{items}    </ol>
  </nav>
</body>
</html>
"#,
            title = encode_text(self.request.title),
        )
    }

    fn toc_ncx(&self) -> String {
        let points: String = self
            .toc()
            .iter()
            .enumerate()
            .map(|(i, e)| {
                format!(
                    "    <navPoint id=\"navPoint-{n}\" playOrder=\"{n}\">\n      <navLabel><text>{text}</text></navLabel>\n      <content src=\"{src}\"/>\n    </navPoint>\n",
                    n = i + 1,
                    text = encode_text(&e.text),
                    src = encode_double_quoted_attribute(&content_link(&e.anchor)),
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{id}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>
{points}  </navMap>
</ncx>
"#,
            id = encode_double_quoted_attribute(&self.identifier),
            title = encode_text(self.request.title),
        )
    }

    fn content_xhtml(&self) -> String {
        let script = if self.mathjax {
            format!(
                "\n  <script type=\"text/javascript\" async=\"async\" src=\"{}\"></script>",
                MATHJAX_URL
            )
        } else {
            String::new()
        };
        let lang = encode_double_quoted_attribute(self.request.language);
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{lang}" lang="{lang}">
<head>
  <meta charset="UTF-8"/>
  <title>{title}</title>
  <link rel="stylesheet" type="text/css" href="style/book.css"/>{script}
</head>
<body>
{body}</body>
</html>
"#,
            title = encode_text(self.request.title),
            body = self.body.xhtml,
        )
    }
}

fn content_link(anchor: &str) -> String {
    if anchor.is_empty() {
        "content.xhtml".to_string()
    } else {
        format!("content.xhtml#{anchor}")
    }
}

enum WriteError {
    Io(std::io::Error),
    Zip(zip::result::ZipError),
}

impl From<std::io::Error> for WriteError {
    fn from(e: std::io::Error) -> Self {
        WriteError::Io(e)
    }
}

impl From<zip::result::ZipError> for WriteError {
    fn from(e: zip::result::ZipError) -> Self {
        WriteError::Zip(e)
    }
}

fn write_container(file: &mut std::fs::File, book: &BookParts<'_>) -> Result<(), WriteError> {
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut zip = ZipWriter::new(file);

    // Readers sniff the first entry, so mimetype goes first and uncompressed.
    zip.start_file("mimetype", stored)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    zip.start_file("OEBPS/content.opf", deflated)?;
    zip.write_all(book.content_opf().as_bytes())?;

    zip.start_file("OEBPS/nav.xhtml", deflated)?;
    zip.write_all(book.nav_xhtml().as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", deflated)?;
    zip.write_all(book.toc_ncx().as_bytes())?;

    zip.start_file("OEBPS/style/book.css", deflated)?;
    zip.write_all(BOOK_CSS.as_bytes())?;

    zip.start_file("OEBPS/content.xhtml", deflated)?;
    zip.write_all(book.content_xhtml().as_bytes())?;

    // Images are already compressed.
    for asset in book.request.assets {
        let name = format!("OEBPS/{}", book.asset_href(asset));
        debug!("Adding asset {} ({} bytes)", name, asset.bytes.len());
        zip.start_file(name, stored)?;
        zip.write_all(&asset.bytes)?;
    }

    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Read;
    use zip::ZipArchive;

    fn assets() -> Vec<NamedAsset> {
        vec![
            NamedAsset {
                filename: "figure_001.png".into(),
                bytes: vec![0x89, b'P', b'N', b'G', 1],
            },
            NamedAsset {
                filename: "figure_002.jpeg".into(),
                bytes: vec![0xFF, 0xD8, 2],
            },
        ]
    }

    fn request<'a>(body: &'a str, assets: &'a [NamedAsset]) -> PackageRequest<'a> {
        PackageRequest {
            body_text: body,
            assets,
            title: "Deep Nets & Friends",
            author: "Ada Lovelace",
            language: "en",
            image_path_prefix: "images/",
        }
    }

    fn read_entry(path: &Path, name: &str) -> String {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut s = String::new();
        entry.read_to_string(&mut s).unwrap();
        s
    }

    const BODY: &str = "# Introduction\n\nWe minimise $L$.\n\n## Figures\n\n\
![Figure 1](images/figure_001.png)\n\n![Figure 2](images/figure_002.jpeg)\n";

    #[test]
    fn writes_expected_container() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("book.epub");
        let assets = assets();
        let written = EpubPackager::new()
            .package(&request(BODY, &assets), &out)
            .unwrap();
        assert_eq!(written, out);

        let mut archive = ZipArchive::new(File::open(&out).unwrap()).unwrap();
        {
            let first = archive.by_index(0).unwrap();
            assert_eq!(first.name(), "mimetype");
            assert_eq!(first.compression(), CompressionMethod::Stored);
        }
        for name in [
            "META-INF/container.xml",
            "OEBPS/content.opf",
            "OEBPS/nav.xhtml",
            "OEBPS/toc.ncx",
            "OEBPS/style/book.css",
            "OEBPS/content.xhtml",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing {name}");
        }

        let mut png = Vec::new();
        archive
            .by_name("OEBPS/images/figure_001.png")
            .unwrap()
            .read_to_end(&mut png)
            .unwrap();
        assert_eq!(png, assets[0].bytes);
    }

    #[test]
    fn manifest_keeps_asset_order_and_types() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("book.epub");
        let assets = assets();
        EpubPackager::new()
            .package(&request(BODY, &assets), &out)
            .unwrap();

        let opf = read_entry(&out, "OEBPS/content.opf");
        let first = opf
            .find(r#"href="images/figure_001.png" media-type="image/png""#)
            .unwrap();
        let second = opf
            .find(r#"href="images/figure_002.jpeg" media-type="image/jpeg""#)
            .unwrap();
        assert!(first < second);
        assert!(opf.contains("<dc:title>Deep Nets &amp; Friends</dc:title>"));
        assert!(opf.contains("<dc:creator>Ada Lovelace</dc:creator>"));
        assert!(opf.contains("<dc:language>en</dc:language>"));
        assert!(opf.contains("dcterms:modified"));
    }

    #[test]
    fn content_links_images_and_keeps_math() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("book.epub");
        let assets = assets();
        EpubPackager::new()
            .package(&request(BODY, &assets), &out)
            .unwrap();

        let content = read_entry(&out, "OEBPS/content.xhtml");
        assert!(content.contains(r#"src="images/figure_001.png""#), "{content}");
        assert!(content.contains(r#"<span class="math inline">\(L\)</span>"#), "{content}");
        assert!(content.contains(MATHJAX_URL));
        assert!(content.contains(r#"id="section-1""#));
    }

    #[test]
    fn nav_lists_top_level_headings() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("book.epub");
        let assets = assets();
        EpubPackager::new()
            .package(&request(BODY, &assets), &out)
            .unwrap();

        let nav = read_entry(&out, "OEBPS/nav.xhtml");
        assert!(nav.contains(r##"<a href="content.xhtml#section-1">Introduction</a>"##), "{nav}");
        assert!(nav.contains(r##"<a href="content.xhtml#section-2">Figures</a>"##), "{nav}");
        let ncx = read_entry(&out, "OEBPS/toc.ncx");
        assert!(ncx.contains(r#"playOrder="2""#));
    }

    #[test]
    fn body_without_headings_gets_title_entry() {
        let rendered = render_body("Just a paragraph.");
        assert!(rendered.toc.is_empty());
        assert_eq!(rendered.xhtml, "<p>Just a paragraph.</p>\n");
    }

    #[test]
    fn raw_html_is_escaped() {
        let rendered = render_body("a <b>bold</b> claim");
        assert!(rendered.xhtml.contains("&lt;b&gt;bold&lt;/b&gt;"), "{}", rendered.xhtml);
    }

    #[test]
    fn duplicate_asset_is_rejected_and_nothing_written() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("book.epub");
        let mut assets = assets();
        assets[1].filename = "figure_001.png".into();
        let err = EpubPackager::new()
            .package(&request("text", &assets), &out)
            .unwrap_err();
        assert!(matches!(err, PackagingError::InvalidRequest(msg) if msg.contains("duplicate")));
        assert!(!out.exists());
    }

    #[test]
    fn missing_asset_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("book.epub");
        let err = EpubPackager::new()
            .package(&request("![Figure 1](images/figure_001.png)", &[]), &out)
            .unwrap_err();
        assert!(matches!(err, PackagingError::MissingAsset(name) if name == "figure_001.png"));
    }

    #[test]
    fn prefix_escaping_the_book_is_rejected() {
        let mut req = request("text", &[]);
        req.image_path_prefix = "../images/";
        assert!(matches!(
            validate_request(&req),
            Err(PackagingError::InvalidRequest(_))
        ));
    }

    #[test]
    fn prefix_with_dot_or_empty_segments_is_rejected() {
        for prefix in ["./images/", "images/./", "a//b/", "/images/", "images\\"] {
            let mut req = request("text", &[]);
            req.image_path_prefix = prefix;
            assert!(
                matches!(validate_request(&req), Err(PackagingError::InvalidRequest(_))),
                "{prefix:?} should be rejected"
            );
        }
    }

    #[test]
    fn plain_prefixes_are_accepted() {
        for prefix in ["images/", "assets/figures/", ""] {
            let mut req = request("text", &[]);
            req.image_path_prefix = prefix;
            assert!(validate_request(&req).is_ok(), "{prefix:?} should be accepted");
        }
    }

    #[test]
    fn media_types() {
        assert_eq!(media_type("a.PNG"), "image/png");
        assert_eq!(media_type("a.jpg"), "image/jpeg");
        assert_eq!(media_type("a.jpeg"), "image/jpeg");
        assert_eq!(media_type("a.bin"), "image/png");
    }
}
