//! PDF rasterisation: render every page of a document to a `DynamicImage`.
//!
//! ## Threading
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async contexts.
//! [`render_document`] moves the whole document onto Tokio's blocking pool.
//!
//! With the `thread_safe` feature every pdfium call is serialised behind a
//! global lock, so pages are rendered one after another inside that blocking
//! task. Page order in the output is always document order.

use crate::config::ExtractionConfig;
use crate::error::DocumentError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// One rendered page.
///
/// Owned by whichever worker holds it; dropped once its numbers are extracted.
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// 1-indexed page number within the source document.
    pub page_num: usize,
    /// Document the page was rendered from.
    pub source: PathBuf,
    pub image: DynamicImage,
}

/// Turns a document into its ordered sequence of page images.
///
/// Index 0 of the returned vector is the first page. Implementations are
/// called from a blocking thread and must be `Send + Sync` so one instance
/// can serve every document of a job.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, path: &Path) -> Result<Vec<RasterPage>, DocumentError>;
}

/// Rasterise `path` on the blocking pool.
pub async fn render_document(
    rasterizer: &Arc<dyn PageRasterizer>,
    path: &Path,
) -> Result<Vec<RasterPage>, DocumentError> {
    let rasterizer = Arc::clone(rasterizer);
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || rasterizer.rasterize(&path))
        .await
        .map_err(|e| DocumentError::Internal(format!("Render task panicked: {}", e)))?
}

/// [`PageRasterizer`] backed by a pdfium library loaded from a configured
/// location.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    lib_path: Option<PathBuf>,
    dpi: u32,
    max_pixels: u32,
}

impl PdfiumRasterizer {
    pub fn new(lib_path: Option<PathBuf>, dpi: u32, max_pixels: u32) -> Self {
        Self {
            lib_path,
            dpi,
            max_pixels,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(
            config.pdfium_lib_path.clone(),
            config.dpi,
            config.max_rendered_pixels,
        )
    }

    /// Load pdfium. `lib_path` may name the library file or the directory
    /// containing the platform-specific library.
    fn bind(&self) -> Result<Pdfium, DocumentError> {
        let lib = self
            .lib_path
            .as_ref()
            .ok_or(DocumentError::EngineNotConfigured)?;

        let target = if lib.is_dir() {
            PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(lib))
        } else {
            lib.clone()
        };

        let bindings =
            Pdfium::bind_to_library(&target).map_err(|e| DocumentError::PdfiumBindingFailed {
                path: target.clone(),
                detail: format!("{:?}", e),
            })?;

        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<RasterPage>, DocumentError> {
        let pdfium = self.bind()?;

        let document =
            pdfium
                .load_pdf_from_file(path, None)
                .map_err(|e| DocumentError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: format!("{:?}", e),
                })?;

        let pages = document.pages();
        info!("PDF loaded: {} ({} pages)", path.display(), pages.len());

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut results = Vec::with_capacity(pages.len() as usize);

        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                DocumentError::RasterisationFailed {
                    path: path.to_path_buf(),
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );

            results.push(RasterPage {
                page_num: idx + 1,
                source: path.to_path_buf(),
                image,
            });
        }

        Ok(results)
    }
}
