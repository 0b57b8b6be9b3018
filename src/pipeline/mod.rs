//! Pipeline stages for PDF-to-EPUB conversion.
//!
//! Each submodule implements exactly one transformation step; the
//! orchestrator in [`crate::convert`] sequences them.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ recognize ──▶ postprocess ─┐
//!   │                                              ├─▶ binder ──▶ package
//!   └────────────▶ figures (embedded images) ──────┘
//!                  references (citations, diagnostic)
//! ```
//!
//! 1. [`input`]     : validate the input path and derive defaults
//! 2. [`backend`]   : the document seam: page count, rendering, figure scan
//! 3. [`render`]    : rasterise pages via pdfium; one `Result` per page
//! 4. [`recognize`] : the recognition seam and its VLM implementation
//! 5. [`postprocess`]: deterministic cleanup of recognized text
//! 6. [`figures`]   : enumerate, filter and re-encode embedded images
//! 7. [`references`]: find figure citations in the text
//! 8. [`binder`]    : number figures and append the figures section

pub mod backend;
pub mod binder;
pub mod figures;
pub mod input;
pub mod postprocess;
pub mod recognize;
pub mod references;
pub mod render;
