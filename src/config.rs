//! Configuration for an export run.
//!
//! All run behaviour that is legitimately tunable lives in [`ExportConfig`],
//! built via its [`ExportConfigBuilder`]. The page geometry — 210 × 296 mm,
//! two columns by two rows, four cards per page — is deliberately *not* in
//! here: it is part of the output contract and lives as fixed constants in
//! [`crate::pipeline::layout`].
//!
//! # Design choice: builder over constructor
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest, and gives `build()` one place to
//! validate constraints.

use crate::error::ExportError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Configuration for a card export.
///
/// Built via [`ExportConfig::builder()`] or [`ExportConfig::default()`].
///
/// # Example
/// ```rust
/// use cardpress::ExportConfig;
///
/// let config = ExportConfig::builder()
///     .dpi(300)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExportConfig {
    /// Capture resolution in dots per inch. Range: 72–600. Default: 300.
    ///
    /// 300 DPI is the standard for print: a 105 × 148 mm card captures at
    /// roughly 1240 × 1748 px, which keeps QR modules and 4–5 mm text crisp
    /// on paper. Lower it to 150 for fast screen proofs; anything above 600
    /// only inflates the PDF.
    pub dpi: u32,

    /// TTF font used by the built-in card renderer for the three identifier
    /// lines. If `None`, a small set of well-known system font locations is
    /// searched (DejaVu Sans, Liberation Sans, Arial).
    pub font_path: Option<PathBuf>,

    /// Progress callback invoked per card and per page. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            font_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("dpi", &self.dpi)
            .field("font_path", &self.font_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

impl ExportConfig {
    /// Create a new builder for `ExportConfig`.
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExportConfig`].
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExportConfig, ExportError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ExportError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = ExportConfig::default();
        assert_eq!(config.dpi, 300);
        assert!(config.font_path.is_none());
    }

    #[test]
    fn builder_rejects_out_of_range_dpi() {
        assert!(ExportConfig::builder().dpi(50).build().is_err());
        assert!(ExportConfig::builder().dpi(1200).build().is_err());
        assert!(ExportConfig::builder().dpi(150).build().is_ok());
    }

    #[test]
    fn debug_does_not_require_callback_debug() {
        let config = ExportConfig::builder()
            .progress_callback(std::sync::Arc::new(
                crate::progress::NoopProgressCallback,
            ))
            .build()
            .unwrap();
        let dbg = format!("{config:?}");
        assert!(dbg.contains("dyn callback"), "got: {dbg}");
    }
}
