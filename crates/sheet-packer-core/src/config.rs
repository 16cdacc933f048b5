use serde::{Deserialize, Serialize};

/// Packing configuration.
/// Key notes:
///   - `packer`/`packer_method` are stable names resolved through the registry
///     (`PackerKind::resolve`); unknown saved names fall back to `MaxRects / BestShortSideFit`
///   - `width`/`height` of `None` use the sum of all sprite sizes as a loose upper bound
///   - `parallel` only has an effect for the `Optimal` packer with the `parallel` feature on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PackerConfig {
    /// Requested sheet width in pixels.
    pub width: Option<u32>,
    /// Requested sheet height in pixels.
    pub height: Option<u32>,
    /// Report sheets at exactly the requested size instead of the used bounding box.
    pub fixed_size: bool,
    /// Round sheet sizes up to a power of two (each axis independently).
    pub power_of_two: bool,

    /// Pixels between sprites.
    pub sprite_padding: u32,
    /// Pixels around the whole sheet.
    pub border_padding: u32,

    /// Trim transparent borders (alpha <= alpha_threshold is transparent).
    pub allow_trim: bool,
    pub alpha_threshold: u8,
    /// Allow 90° rotations.
    pub allow_rotation: bool,
    /// Pack byte-identical sprites once and emit clones for the duplicates.
    pub detect_identical: bool,

    /// Packer name (`MaxRects`, `Ordered`, `GridSearch`, `Growing`, `ShelfAllocator`, `Optimal`).
    pub packer: String,
    /// Method name of the selected packer.
    pub packer_method: String,

    /// Evaluate Optimal trials in parallel when feature "parallel" is on.
    pub parallel: bool,
    /// Export order remembered from a previous run.
    pub stored_order: Option<Vec<String>>,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            width: Some(2048),
            height: Some(2048),
            fixed_size: false,
            power_of_two: false,
            sprite_padding: 1,
            border_padding: 0,
            allow_trim: true,
            alpha_threshold: 0,
            allow_rotation: true,
            detect_identical: true,
            packer: crate::packer::DEFAULT_PACKER.into(),
            packer_method: crate::packer::DEFAULT_METHOD.into(),
            parallel: false,
            stored_order: None,
        }
    }
}

impl PackerConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - A requested dimension is zero
    /// - Border padding would leave no usable space
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::SheetPackerError;

        if self.width == Some(0) || self.height == Some(0) {
            return Err(SheetPackerError::InvalidDimensions {
                width: self.width.unwrap_or(0),
                height: self.height.unwrap_or(0),
            });
        }

        let total_border = self.border_padding.saturating_mul(2);
        for (axis, dim) in [("width", self.width), ("height", self.height)] {
            if let Some(d) = dim {
                if total_border >= d {
                    return Err(SheetPackerError::InvalidConfig(format!(
                        "border_padding ({}) * 2 leaves no usable {} in {}",
                        self.border_padding, axis, d
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Builder for `PackerConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PackerConfigBuilder {
    cfg: PackerConfig,
}

impl PackerConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PackerConfig::default(),
        }
    }
    pub fn with_dimensions(mut self, w: u32, h: u32) -> Self {
        self.cfg.width = Some(w);
        self.cfg.height = Some(h);
        self
    }
    /// Let the packer pick the sheet size (sum of all sprite sizes as the bound).
    pub fn unbounded(mut self) -> Self {
        self.cfg.width = None;
        self.cfg.height = None;
        self
    }
    pub fn fixed_size(mut self, v: bool) -> Self {
        self.cfg.fixed_size = v;
        self
    }
    pub fn pow2(mut self, v: bool) -> Self {
        self.cfg.power_of_two = v;
        self
    }
    pub fn sprite_padding(mut self, v: u32) -> Self {
        self.cfg.sprite_padding = v;
        self
    }
    pub fn border_padding(mut self, v: u32) -> Self {
        self.cfg.border_padding = v;
        self
    }
    pub fn allow_trim(mut self, v: bool) -> Self {
        self.cfg.allow_trim = v;
        self
    }
    pub fn alpha_threshold(mut self, v: u8) -> Self {
        self.cfg.alpha_threshold = v;
        self
    }
    pub fn allow_rotation(mut self, v: bool) -> Self {
        self.cfg.allow_rotation = v;
        self
    }
    pub fn detect_identical(mut self, v: bool) -> Self {
        self.cfg.detect_identical = v;
        self
    }
    pub fn packer(mut self, packer: impl Into<String>, method: impl Into<String>) -> Self {
        self.cfg.packer = packer.into();
        self.cfg.packer_method = method.into();
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }
    pub fn stored_order(mut self, v: Option<Vec<String>>) -> Self {
        self.cfg.stored_order = v;
        self
    }
    pub fn build(self) -> PackerConfig {
        self.cfg
    }
}

impl PackerConfig {
    /// Create a fluent builder for `PackerConfig`.
    pub fn builder() -> PackerConfigBuilder {
        PackerConfigBuilder::new()
    }
}
