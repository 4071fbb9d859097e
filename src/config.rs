//! Configuration for figure and table extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The same config drives both modes;
//! fields that only matter to one mode say so.

use crate::document::{default_backends, DocumentBackend};
use crate::error::PdfFigError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for an extraction run.
///
/// # Example
/// ```rust
/// use edgequake_pdffig::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .output_dir("images")
///     .prefix("T5")
///     .build()
///     .unwrap();
/// assert_eq!(config.prefix, "T5");
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Directory receiving the PNG files. Created if missing. Default: `images`.
    ///
    /// The path is also what appears inside markdown embeds, so a relative
    /// directory keeps the rewritten article portable.
    pub output_dir: PathBuf,

    /// File-name prefix (`{prefix}_figure1.png`). Empty means none. Default: empty.
    pub prefix: String,

    /// Pixels per PDF point when rasterising. Default: 2.0.
    pub scale: f32,

    /// Re-render images that already exist. Default: false.
    ///
    /// Off by default so an interrupted run can be resumed: existing images
    /// are kept and only the markdown insertion is redone.
    pub overwrite: bool,

    /// Blind mode: file name of the reference list written into
    /// `output_dir`. `None` disables it. Default: `figure_list.md`.
    pub reference_list: Option<String>,

    /// Targeted mode: write the rewritten markdown here instead of in place.
    pub output_markdown: Option<PathBuf>,

    /// Document backends, tried in order. Default: pdfium from
    /// `PDFIUM_LIB_PATH` or the working directory, then system pdfium.
    pub backends: Vec<Arc<dyn DocumentBackend>>,

    /// Optional per-item progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("images"),
            prefix: String::new(),
            scale: 2.0,
            overwrite: false,
            reference_list: Some("figure_list.md".to_string()),
            output_markdown: None,
            backends: default_backends(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("output_dir", &self.output_dir)
            .field("prefix", &self.prefix)
            .field("scale", &self.scale)
            .field("overwrite", &self.overwrite)
            .field("reference_list", &self.reference_list)
            .field("output_markdown", &self.output_markdown)
            .field(
                "backends",
                &self.backends.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
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
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn overwrite(mut self, v: bool) -> Self {
        self.config.overwrite = v;
        self
    }

    pub fn reference_list(mut self, name: Option<String>) -> Self {
        self.config.reference_list = name;
        self
    }

    pub fn output_markdown(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_markdown = Some(path.into());
        self
    }

    /// Replace the backend chain.
    pub fn backends(mut self, backends: Vec<Arc<dyn DocumentBackend>>) -> Self {
        self.config.backends = backends;
        self
    }

    /// Try `backend` before the configured ones.
    pub fn prefer_backend(mut self, backend: Arc<dyn DocumentBackend>) -> Self {
        self.config.backends.insert(0, backend);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, PdfFigError> {
        let c = &self.config;
        if !(c.scale.is_finite() && c.scale > 0.0) {
            return Err(PdfFigError::InvalidConfig(format!(
                "Scale must be a positive number, got {}",
                c.scale
            )));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(PdfFigError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        if c.prefix.contains(['/', '\\']) {
            return Err(PdfFigError::InvalidConfig(format!(
                "Prefix must not contain path separators, got '{}'",
                c.prefix
            )));
        }
        Ok(self.config)
    }
}
