//! Configuration types for coordinate extraction jobs.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. One struct is cloned into every job's
//! background task, so everything in it is either plain data or an `Arc`.

use crate::error::Plan2CsvError;
use crate::pipeline::recognize::{RecognizerOptions, TextRecognizer};
use crate::pipeline::render::PageRasterizer;
use crate::progress::JobProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// File name searched for during discovery (case-insensitive).
pub const DEFAULT_TARGET_FILE_NAME: &str = "plan.pdf";

/// Smallest magnitude a coordinate can have; values must be strictly greater.
pub const DEFAULT_MIN_COORDINATE: f64 = 100_000.0;

/// Worker-pool size used for page-level parallelism: all cores but one,
/// never fewer than one.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// Configuration for an extraction job.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_plan2csv::{DecimalSeparator, ExtractionConfig};
///
/// let config = ExtractionConfig::builder()
///     .pdfium_lib_path("/opt/pdfium/lib")
///     .dpi(300)
///     .workers(4)
///     .decimal_separator(DecimalSeparator::Point)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Location of the pdfium shared library: either the directory holding
    /// the platform library or the library file itself.
    ///
    /// When `None`, every document fails with
    /// [`crate::error::DocumentError::EngineNotConfigured`].
    pub pdfium_lib_path: Option<PathBuf>,

    /// Rendering DPI used when rasterising each page. Range: 72–600. Default: 200.
    ///
    /// Scanned plans carry small printed coordinates; 200 DPI keeps six- and
    /// seven-digit numbers legible to the OCR engine.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 6000.
    pub max_rendered_pixels: u32,

    /// Worker-pool size for page recognition. Default: cores − 1, minimum 1.
    pub workers: usize,

    /// File name matched during discovery, case-insensitively. Default: `plan.pdf`.
    pub target_file_name: String,

    /// Parsed values at or below this threshold are discarded. Default: 100000.
    pub min_coordinate: f64,

    /// Decimal separator written to output tables. Default: [`DecimalSeparator::Comma`].
    pub decimal_separator: DecimalSeparator,

    /// OCR engine settings used to build the job's shared recognizer.
    pub ocr: RecognizerOptions,

    /// Pre-constructed recognizer. Takes precedence over `ocr`.
    pub recognizer: Option<Arc<dyn TextRecognizer>>,

    /// Pre-constructed rasterizer. Takes precedence over `pdfium_lib_path`.
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Optional per-document progress events.
    pub progress_callback: Option<Arc<dyn JobProgressCallback>>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pdfium_lib_path: None,
            dpi: 200,
            max_rendered_pixels: 6000,
            workers: default_worker_count(),
            target_file_name: DEFAULT_TARGET_FILE_NAME.to_string(),
            min_coordinate: DEFAULT_MIN_COORDINATE,
            decimal_separator: DecimalSeparator::default(),
            ocr: RecognizerOptions::default(),
            recognizer: None,
            rasterizer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("workers", &self.workers)
            .field("target_file_name", &self.target_file_name)
            .field("min_coordinate", &self.min_coordinate)
            .field("decimal_separator", &self.decimal_separator)
            .field("ocr", &self.ocr)
            .field(
                "recognizer",
                &self.recognizer.as_ref().map(|_| "<dyn TextRecognizer>"),
            )
            .field(
                "rasterizer",
                &self.rasterizer.as_ref().map(|_| "<dyn PageRasterizer>"),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn JobProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n;
        self
    }

    pub fn target_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.target_file_name = name.into();
        self
    }

    pub fn min_coordinate(mut self, v: f64) -> Self {
        self.config.min_coordinate = v;
        self
    }

    pub fn decimal_separator(mut self, sep: DecimalSeparator) -> Self {
        self.config.decimal_separator = sep;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr.language = lang.into();
        self
    }

    pub fn ocr_binary(mut self, bin: impl Into<PathBuf>) -> Self {
        self.config.ocr.binary = bin.into();
        self
    }

    pub fn ocr(mut self, options: RecognizerOptions) -> Self {
        self.config.ocr = options;
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn JobProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Plan2CsvError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(Plan2CsvError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.workers == 0 {
            return Err(Plan2CsvError::InvalidConfig("Workers must be ≥ 1".into()));
        }
        if c.target_file_name.trim().is_empty() {
            return Err(Plan2CsvError::InvalidConfig(
                "Target file name must not be empty".into(),
            ));
        }
        if !c.min_coordinate.is_finite() || c.min_coordinate < 0.0 {
            return Err(Plan2CsvError::InvalidConfig(format!(
                "Minimum coordinate must be a non-negative number, got {}",
                c.min_coordinate
            )));
        }
        if c.ocr.language.trim().is_empty() {
            return Err(Plan2CsvError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Decimal separator used when writing coordinate values.
///
/// Output tables are semicolon-separated, so a comma decimal separator never
/// collides with the field separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecimalSeparator {
    /// `123456,5`, French locale (default).
    #[default]
    Comma,
    /// `123456.5`
    Point,
}

impl DecimalSeparator {
    pub fn as_char(self) -> char {
        match self {
            DecimalSeparator::Comma => ',',
            DecimalSeparator::Point => '.',
        }
    }
}
