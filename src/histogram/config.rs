use crate::error::{DqeError, DqeResult};

/// Rectangular region of interest in panel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Roi {
    pub start_x: u16,
    pub start_y: u16,
    pub hsize: u16,
    pub vsize: u16,
}

impl Roi {
    pub const fn new(start_x: u16, start_y: u16, hsize: u16, vsize: u16) -> Self {
        Self {
            start_x,
            start_y,
            hsize,
            vsize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hsize == 0 || self.vsize == 0
    }

    fn fits_in(&self, width: u32, height: u32) -> bool {
        self.start_x as u32 + self.hsize as u32 <= width
            && self.start_y as u32 + self.vsize as u32 <= height
    }
}

/// Per-component luma weights used when binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weights {
    pub weight_r: u16,
    pub weight_g: u16,
    pub weight_b: u16,
}

impl Weights {
    /// BT.709 luma weights in 1/1024 units.
    pub const BT709: Weights = Weights {
        weight_r: 218,
        weight_g: 732,
        weight_b: 74,
    };

    pub fn sum(&self) -> u32 {
        self.weight_r as u32 + self.weight_g as u32 + self.weight_b as u32
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self::BT709
    }
}

/// Where in the pipeline the histogram taps pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgPos {
    /// Before the enhancement stages
    PreDqe,
    /// After the enhancement stages
    #[default]
    PostDqe,
}

impl ProgPos {
    /// Parse from a position string ("pre", "post").
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pre" => Some(Self::PreDqe),
            "post" => Some(Self::PostDqe),
            _ => None,
        }
    }
}

/// Configuration of one histogram channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub roi: Roi,
    pub weights: Weights,
    pub pos: ProgPos,
    /// Pixels below this luma are not binned.
    pub threshold: u32,
    /// Region excluded from binning (e.g. a fingerprint sensor area).
    pub blocked_roi: Option<Roi>,
}

impl ChannelConfig {
    pub fn new(roi: Roi, weights: Weights) -> Self {
        Self {
            roi,
            weights,
            pos: ProgPos::default(),
            threshold: 0,
            blocked_roi: None,
        }
    }

    pub fn with_pos(mut self, pos: ProgPos) -> Self {
        self.pos = pos;
        self
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_blocked_roi(mut self, blocked: Roi) -> Self {
        self.blocked_roi = Some(blocked);
        self
    }

    /// Reject malformed configurations. `panel` is the active panel size,
    /// when known.
    pub fn validate(&self, panel: Option<(u32, u32)>) -> DqeResult<()> {
        if self.roi.is_empty() {
            return Err(DqeError::invalid(format!(
                "histogram roi {}x{} is empty",
                self.roi.hsize, self.roi.vsize
            )));
        }
        if self.weights.sum() == 0 {
            return Err(DqeError::invalid("histogram weights are all zero"));
        }
        if let Some(blocked) = &self.blocked_roi {
            if blocked.is_empty() {
                return Err(DqeError::invalid("blocked roi is empty"));
            }
        }
        if let Some((width, height)) = panel {
            let regions = std::iter::once(&self.roi).chain(self.blocked_roi.as_ref());
            for roi in regions {
                if !roi.fits_in(width, height) {
                    return Err(DqeError::invalid(format!(
                        "roi {:?} exceeds panel {}x{}",
                        roi, width, height
                    )));
                }
            }
        }
        Ok(())
    }
}
