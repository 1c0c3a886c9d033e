//! Scannable code rendering seam
//!
//! Image generation belongs to an external encoder. This module defines the
//! interface the share flow calls and the fallback chain that tries each
//! configured renderer before reporting failure.

use std::fmt;

/// Rendering parameters passed to every renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Image width in pixels
    pub width: u32,
    /// Quiet zone in modules
    pub margin: u32,
    /// Foreground color
    pub dark: String,
    /// Background color
    pub light: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 200,
            margin: 1,
            dark: "#000000".to_string(),
            light: "#ffffff".to_string(),
        }
    }
}

/// Output of a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCode {
    /// Name of the renderer that produced the image
    pub renderer: String,
    /// Media type of `bytes`, e.g. `image/png`
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// One failed rendering attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderAttempt {
    pub renderer: String,
    pub reason: String,
}

impl fmt::Display for RenderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.renderer, self.reason)
    }
}

/// Rendering failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// A single renderer could not produce an image
    #[error("Renderer failed: {reason}")]
    Failed { reason: String },

    /// Every renderer in the chain failed
    #[error("Could not generate the code image after {} attempt(s)", .attempts.len())]
    Exhausted { attempts: Vec<RenderAttempt> },
}

/// Produces a scannable image for a link.
pub trait CodeRenderer {
    /// Short name used in logs and error reports.
    fn name(&self) -> &str;

    /// Renders `url` as an image.
    ///
    /// # Errors
    ///
    /// - `RenderError::Failed` - Renderer could not produce an image
    fn render(&self, url: &str, options: &RenderOptions) -> Result<RenderedCode, RenderError>;
}

/// Ordered list of renderers tried until one succeeds.
#[derive(Default)]
pub struct FallbackRenderer {
    renderers: Vec<Box<dyn CodeRenderer + Send + Sync>>,
    options: RenderOptions,
}

impl fmt::Debug for FallbackRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackRenderer")
            .field(
                "renderers",
                &self.renderers.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("options", &self.options)
            .finish()
    }
}

impl FallbackRenderer {
    /// Creates an empty chain with the given options.
    pub fn new(options: RenderOptions) -> Self {
        Self {
            renderers: Vec::new(),
            options,
        }
    }

    /// Appends a renderer to the end of the chain.
    pub fn with_renderer(mut self, renderer: impl CodeRenderer + Send + Sync + 'static) -> Self {
        self.renderers.push(Box::new(renderer));
        self
    }

    /// Number of renderers in the chain.
    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    /// True when no renderer is configured.
    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    /// Tries each renderer in order and returns the first image produced.
    ///
    /// # Errors
    ///
    /// - `RenderError::Exhausted` - Every renderer failed, or none is configured
    pub fn render(&self, url: &str) -> Result<RenderedCode, RenderError> {
        let mut attempts = Vec::with_capacity(self.renderers.len());

        for renderer in &self.renderers {
            match renderer.render(url, &self.options) {
                Ok(code) => {
                    if !attempts.is_empty() {
                        tracing::debug!(
                            "Renderer {} succeeded after {} failure(s)",
                            renderer.name(),
                            attempts.len()
                        );
                    }
                    return Ok(code);
                }
                Err(e) => {
                    tracing::warn!("Renderer {} failed: {e}", renderer.name());
                    attempts.push(RenderAttempt {
                        renderer: renderer.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(RenderError::Exhausted { attempts })
    }
}
