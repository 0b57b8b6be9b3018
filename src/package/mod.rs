//! Packaging: the seam that turns text plus assets into a book file.
//!
//! The orchestrator only sees [`Packager`]. [`epub::EpubPackager`] is the
//! shipped implementation.

pub mod epub;

pub use epub::EpubPackager;

use crate::error::PackagingError;
use crate::output::NamedAsset;
use std::path::{Path, PathBuf};

/// Everything a packager needs to write one book.
#[derive(Debug, Clone, Copy)]
pub struct PackageRequest<'a> {
    /// Markdown body, figures section included.
    pub body_text: &'a str,
    /// Assets in the order they must appear in the book.
    pub assets: &'a [NamedAsset],
    pub title: &'a str,
    pub author: &'a str,
    pub language: &'a str,
    /// Prefix under which the body references the assets, e.g. `images/`.
    pub image_path_prefix: &'a str,
}

/// Assembles a [`PackageRequest`] into a file at `output`.
///
/// Asset filenames and order are kept verbatim; the body links to them as
/// `image_path_prefix + filename`.
pub trait Packager: Send + Sync {
    fn package(&self, request: &PackageRequest<'_>, output: &Path)
        -> Result<PathBuf, PackagingError>;
}
