//! Text recognition: one raster page in, ordered text tokens out.
//!
//! The default backend drives the `tesseract` command-line engine. Building a
//! [`TesseractRecognizer`] probes the binary and its language data once; after
//! that the recognizer is immutable and shared by `Arc` across the page
//! worker pool and across every document of a job.
//!
//! Recognition uses sparse-text page segmentation (`--psm 11`): every text
//! fragment is reported on its own line with no paragraph grouping, which is
//! what the coordinate filter wants.

use crate::error::{PageError, Plan2CsvError};
use crate::pipeline::render::RasterPage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info};

/// Extracts raw text tokens from a single page image.
///
/// Implementations hold no mutable state between calls: the same instance is
/// invoked concurrently from several workers.
pub trait TextRecognizer: Send + Sync {
    /// Return recognised text fragments in reading order.
    ///
    /// A page with no detectable text yields an empty vector, not an error.
    fn recognize(&self, page: &RasterPage) -> Result<Vec<String>, PageError>;
}

/// Where recognition runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OcrDevice {
    /// Portable default.
    #[default]
    Cpu,
    /// Accelerated inference. Only accepted by backends that support it.
    Gpu,
}

/// Settings for the OCR engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizerOptions {
    /// Executable to run. Default: `tesseract` (resolved through `PATH`).
    pub binary: PathBuf,
    /// Recognition language code. Default: `fra`.
    pub language: String,
    /// Page segmentation mode. Default: 11 (sparse text, no layout grouping).
    pub page_segmentation: u8,
    /// OCR engine mode. Default: 1 (LSTM only, the fast path).
    pub engine_mode: u8,
    pub device: OcrDevice,
}

impl Default for RecognizerOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "fra".to_string(),
            page_segmentation: 11,
            engine_mode: 1,
            device: OcrDevice::Cpu,
        }
    }
}

/// [`TextRecognizer`] backed by the `tesseract` CLI.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    options: RecognizerOptions,
}

impl TesseractRecognizer {
    /// Probe the engine and its language data.
    ///
    /// This is the expensive, once-per-job step; a failure here aborts the
    /// whole job.
    pub fn new(options: RecognizerOptions) -> Result<Self, Plan2CsvError> {
        if options.device == OcrDevice::Gpu {
            return Err(Plan2CsvError::RecognizerUnavailable {
                detail: "the tesseract backend runs on CPU only".into(),
            });
        }

        let output = Command::new(&options.binary)
            .arg("--list-langs")
            .output()
            .map_err(|e| Plan2CsvError::RecognizerUnavailable {
                detail: format!("cannot run '{}': {}", options.binary.display(), e),
            })?;

        if !output.status.success() {
            return Err(Plan2CsvError::RecognizerUnavailable {
                detail: format!(
                    "'{} --list-langs' exited with {}",
                    options.binary.display(),
                    output.status
                ),
            });
        }

        // Older releases print the list on stderr.
        let listing = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if !has_language(&listing, &options.language) {
            return Err(Plan2CsvError::RecognizerUnavailable {
                detail: format!("language '{}' is not installed", options.language),
            });
        }

        info!(
            "OCR engine ready: {} (lang={}, psm={}, oem={})",
            options.binary.display(),
            options.language,
            options.page_segmentation,
            options.engine_mode
        );
        Ok(Self { options })
    }

    pub fn options(&self) -> &RecognizerOptions {
        &self.options
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, page: &RasterPage) -> Result<Vec<String>, PageError> {
        let fail = |detail: String| PageError::RecognitionFailed {
            page: page.page_num,
            detail,
        };

        let png = write_png(&page.image).map_err(fail)?;

        let output = Command::new(&self.options.binary)
            .arg(png.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.options.language)
            .arg("--psm")
            .arg(self.options.page_segmentation.to_string())
            .arg("--oem")
            .arg(self.options.engine_mode.to_string())
            // Parallelism comes from the page pool, not from the engine.
            .env("OMP_THREAD_LIMIT", "1")
            .output()
            .map_err(|e| fail(format!("cannot run tesseract: {e}")))?;

        if !output.status.success() {
            return Err(fail(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let tokens = split_tokens(&String::from_utf8_lossy(&output.stdout));
        debug!("Page {}: {} text fragments", page.page_num, tokens.len());
        Ok(tokens)
    }
}

/// Split engine output into trimmed, non-empty lines.
fn split_tokens(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check `--list-langs` output for an exact language code.
fn has_language(listing: &str, language: &str) -> bool {
    // Combined codes like "fra+eng" need every part installed.
    language
        .split('+')
        .all(|wanted| listing.lines().any(|l| l.trim() == wanted))
}

/// Encode a page image into a fresh temporary `.png` file.
fn write_png(image: &image::DynamicImage) -> Result<tempfile::NamedTempFile, String> {
    let mut png = tempfile::Builder::new()
        .prefix("plan2csv-page-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| format!("tempfile: {e}"))?;
    image
        .write_to(png.as_file_mut(), image::ImageFormat::Png)
        .map_err(|e| format!("PNG encoding: {e}"))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tokens_drops_blank_lines() {
        let out = "123456\n\n  654321  \n\x0c\nRN 12\n";
        assert_eq!(split_tokens(out), vec!["123456", "654321", "RN 12"]);
    }

    #[test]
    fn empty_output_is_empty_vector() {
        assert!(split_tokens("").is_empty());
        assert!(split_tokens("\n \n").is_empty());
    }

    #[test]
    fn language_listing_matches_exact_codes() {
        let listing = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\nfra\nosd\n";
        assert!(has_language(listing, "fra"));
        assert!(has_language(listing, "fra+eng"));
        assert!(!has_language(listing, "fr"));
        assert!(!has_language(listing, "deu"));
    }

    #[test]
    fn page_images_are_written_as_png() {
        let image = image::DynamicImage::ImageRgba8(image::RgbaImage::new(4, 3));
        let png = write_png(&image).unwrap();
        let bytes = std::fs::read(png.path()).unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
        assert_eq!(image::open(png.path()).unwrap().width(), 4);
    }

    #[test]
    fn gpu_mode_is_rejected() {
        let opts = RecognizerOptions {
            device: OcrDevice::Gpu,
            ..RecognizerOptions::default()
        };
        let err = TesseractRecognizer::new(opts).unwrap_err();
        assert!(matches!(err, Plan2CsvError::RecognizerUnavailable { .. }));
    }

    #[test]
    fn missing_binary_is_job_fatal() {
        let opts = RecognizerOptions {
            binary: PathBuf::from("/nonexistent/plan2csv-tesseract"),
            ..RecognizerOptions::default()
        };
        let err = TesseractRecognizer::new(opts).unwrap_err();
        assert!(err.to_string().contains("OCR engine unavailable"), "got: {err}");
    }

    #[test]
    fn default_options_follow_reference_tuning() {
        let o = RecognizerOptions::default();
        assert_eq!(o.language, "fra");
        assert_eq!(o.page_segmentation, 11);
        assert_eq!(o.device, OcrDevice::Cpu);
    }
}
