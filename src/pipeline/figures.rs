//! Figure extraction: enumerate embedded raster images, filter, re-encode.
//!
//! Pages are visited in ascending order and images in the order the PDF
//! reports them, which is insertion order rather than spatial order.
//! Images drawn inside form XObjects count as images of the page. An image
//! placed several times on one page is extracted once.
//!
//! Per image the scan either produces a [`RasterAsset`], drops it silently
//! because it is below the size threshold, or records an [`AssetSkip`]
//! because it could not be decoded or encoded. One bad image never stops
//! the page, and one unreadable page never stops the document.

use crate::config::{FigureOptions, ImageFormat, PageSelection};
use crate::error::{AssetSkip, Paper2EpubError};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage};
use pdfium_render::prelude::*;
use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Form XObjects nested deeper than this are not searched.
const MAX_FORM_DEPTH: usize = 8;

/// One extracted embedded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterAsset {
    /// 1-based page of origin.
    pub page_number: usize,
    /// Position among the image objects of its page.
    pub index_on_page: usize,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Bytes in `format`.
    pub encoded_bytes: Vec<u8>,
    pub format: ImageFormat,
    /// Encoding the image had inside the PDF, e.g. `DCTDecode`. Informational.
    pub source_format: String,
}

/// Output of a figure scan.
#[derive(Debug, Default)]
pub struct FigureScan {
    pub assets: Vec<RasterAsset>,
    pub skipped: Vec<AssetSkip>,
}

/// An embedded image as a document reports it, before filtering.
pub struct EmbeddedImage {
    pub source_format: String,
    /// Identity of the underlying image data; equal for repeated placements.
    pub fingerprint: Option<u64>,
    /// Decoded pixels, or why decoding failed.
    pub pixels: Result<DynamicImage, String>,
}

/// An opened paged document that can list its embedded images.
pub trait EmbeddedImageSource {
    fn page_count(&self) -> usize;

    /// Images of the 0-based page, in the order the document stores them.
    fn images_on_page(&self, page_index: usize) -> Result<Vec<EmbeddedImage>, String>;
}

/// A page object as the figure walk sees it.
pub trait PageObjectNode: Sized {
    /// The image this object draws, if it is an image object.
    fn embedded_image(&self) -> Option<EmbeddedImage>;

    /// Objects inside a form XObject; empty for every other kind.
    fn children(&self) -> Vec<Self>;
}

/// Images reachable from a page's top-level objects, depth first.
pub fn collect_images<N: PageObjectNode>(
    objects: impl IntoIterator<Item = N>,
) -> Vec<EmbeddedImage> {
    let mut images = Vec::new();
    for object in objects {
        walk_object(&object, 0, &mut images);
    }
    images
}

fn walk_object<N: PageObjectNode>(object: &N, depth: usize, images: &mut Vec<EmbeddedImage>) {
    if let Some(image) = object.embedded_image() {
        images.push(image);
        return;
    }
    if depth >= MAX_FORM_DEPTH {
        debug!("Form XObject nesting deeper than {}, not descending", MAX_FORM_DEPTH);
        return;
    }
    for child in object.children() {
        walk_object(&child, depth + 1, images);
    }
}

/// Hash of raw image data, used to recognise repeated placements.
pub fn fingerprint(data: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

/// Scan every selected page of `source`.
pub fn scan_source(
    source: &dyn EmbeddedImageSource,
    options: &FigureOptions,
    selection: &PageSelection,
) -> FigureScan {
    let mut scan = FigureScan::default();

    for page_index in selection.to_indices(source.page_count()) {
        let page_number = page_index + 1;
        let images = match source.images_on_page(page_index) {
            Ok(images) => images,
            Err(detail) => {
                warn!("Page {}: could not enumerate images: {}", page_number, detail);
                scan.skipped.push(AssetSkip::PageEnumerationFailed {
                    page: page_number,
                    detail,
                });
                continue;
            }
        };

        let mut seen = HashSet::new();
        let unique = images.into_iter().filter(|image| match image.fingerprint {
            Some(fp) if !seen.insert(fp) => {
                debug!("Page {}: skipping repeated placement of an image", page_number);
                false
            }
            _ => true,
        });

        for (index, embedded) in unique.enumerate() {
            match extract_asset(page_number, index, embedded, options) {
                Ok(Some(asset)) => scan.assets.push(asset),
                Ok(None) => {}
                Err(skip) => {
                    warn!("Failed to extract figure: {}", skip);
                    scan.skipped.push(skip);
                }
            }
        }
    }

    scan
}

/// Decode, filter and re-encode one embedded image.
///
/// `Ok(None)` means the image is below the size threshold.
fn extract_asset(
    page_number: usize,
    index: usize,
    embedded: EmbeddedImage,
    options: &FigureOptions,
) -> Result<Option<RasterAsset>, AssetSkip> {
    let skip = |detail: String| AssetSkip::DecodeFailed {
        page: page_number,
        index,
        detail,
    };

    let pixels = embedded.pixels.map_err(skip)?;
    let (width, height) = (pixels.width(), pixels.height());

    if width < options.min_width || height < options.min_height {
        debug!(
            "Skipping small image on page {}: {}x{}",
            page_number, width, height
        );
        return Ok(None);
    }

    let encoded_bytes = encode_figure(&pixels, options).map_err(|e| skip(e.to_string()))?;
    debug!(
        "Extracted image {} from page {}: {}x{} ({})",
        index, page_number, width, height, embedded.source_format
    );

    Ok(Some(RasterAsset {
        page_number,
        index_on_page: index,
        pixel_width: width,
        pixel_height: height,
        encoded_bytes,
        format: options.format,
        source_format: embedded.source_format,
    }))
}

/// Encode pixels in the configured output format.
///
/// JPEG has no alpha channel, so transparent or grey-alpha sources are
/// flattened to opaque RGB first; the alpha values are discarded.
pub fn encode_figure(
    img: &DynamicImage,
    options: &FigureOptions,
) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match options.format {
        ImageFormat::Png => {
            let img = match img.color() {
                ColorType::Rgb32F | ColorType::Rgba32F => {
                    DynamicImage::ImageRgba8(img.to_rgba8())
                }
                _ => img.clone(),
            };
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
        ImageFormat::Jpeg => {
            let rgb = match img.color() {
                ColorType::L8 | ColorType::Rgb8 => img.clone(),
                _ => DynamicImage::ImageRgb8(img.to_rgb8()),
            };
            let quality = options.jpeg_quality.clamp(1, 100);
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
        }
    }
    Ok(buf)
}

// ── pdfium adapter ───────────────────────────────────────────────────────────

/// [`EmbeddedImageSource`] over an open pdfium document.
pub struct PdfiumImageSource<'a, 'b> {
    document: &'b PdfDocument<'a>,
}

impl<'a, 'b> PdfiumImageSource<'a, 'b> {
    pub fn new(document: &'b PdfDocument<'a>) -> Self {
        Self { document }
    }
}

impl EmbeddedImageSource for PdfiumImageSource<'_, '_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn images_on_page(&self, page_index: usize) -> Result<Vec<EmbeddedImage>, String> {
        let page = self
            .document
            .pages()
            .get(page_index as u16)
            .map_err(|e| format!("{:?}", e))?;

        Ok(collect_images(page.objects().iter()))
    }
}

impl PageObjectNode for PdfPageObject<'_> {
    fn embedded_image(&self) -> Option<EmbeddedImage> {
        let image_object = self.as_image_object()?;
        let source_format = image_object
            .filters()
            .iter()
            .map(|f| f.name().to_string())
            .collect::<Vec<_>>()
            .join("+");
        let pixels = image_object
            .get_raw_image()
            .map_err(|e| format!("{:?}", e));
        Some(EmbeddedImage {
            source_format: if source_format.is_empty() {
                "raw".to_string()
            } else {
                source_format
            },
            fingerprint: image_object
                .get_raw_image_data()
                .ok()
                .map(|data| fingerprint(&data)),
            pixels,
        })
    }

    fn children(&self) -> Vec<Self> {
        match self {
            PdfPageObject::XObjectForm(form) => (0..form.len())
                .filter_map(|i| form.get(i).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Open `pdf_path` and scan it for figures.
///
/// Only a failure to open the document is an error.
pub fn scan_pdf(
    pdfium: &Pdfium,
    pdf_path: &Path,
    password: Option<&str>,
    options: &FigureOptions,
    selection: &PageSelection,
) -> Result<FigureScan, Paper2EpubError> {
    let document = crate::pipeline::render::open_document(pdfium, pdf_path, password)?;
    let scan = scan_source(&PdfiumImageSource::new(&document), options, selection);
    info!(
        "Extracted {} figures from {} ({} skipped)",
        scan.assets.len(),
        pdf_path.display(),
        scan.skipped.len()
    );
    Ok(scan)
}
