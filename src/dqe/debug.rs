// Debug overrides.
//
// Each programmable stage has one Override. While force_en is set the forced
// value wins over whatever the caller computed; dirty means the forced value
// changed since it was last committed and only matters while force_en is set.

use std::fmt;
use std::sync::Arc;

use log::{debug, info};

use crate::color::{AtcConfig, CgcLut, ColorLut, ColorMatrix, DitherConfig, DitherType, Stage};

/// Operator-forced value for one pipeline stage.
///
/// A forced value of `None` forces the stage to bypass.
pub struct Override<T> {
    stage: Stage,
    force_en: bool,
    verbose: bool,
    dirty: bool,
    value: Option<Arc<T>>,
    announced: bool,
}

impl<T> Override<T> {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            force_en: false,
            verbose: false,
            dirty: false,
            value: None,
            announced: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Set the forced value and enable forcing.
    pub fn force(&mut self, value: Arc<T>) {
        self.set_value(Some(value));
        self.set_force_en(true);
    }

    /// Replace the forced value without touching `force_en`.
    pub fn set_value(&mut self, value: Option<Arc<T>>) {
        self.value = value;
        self.dirty = true;
        self.announced = false;
    }

    pub fn set_force_en(&mut self, force_en: bool) {
        if self.force_en != force_en {
            self.force_en = force_en;
            self.dirty = true;
            self.announced = false;
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Stop forcing and forget the forced value.
    pub fn clear(&mut self) {
        self.force_en = false;
        self.value = None;
        self.dirty = false;
        self.announced = false;
    }

    pub fn is_forced(&self) -> bool {
        self.force_en
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn value(&self) -> Option<&Arc<T>> {
        self.value.as_ref()
    }

    /// Effective value for the stage: the forced value while `force_en` is
    /// set, `computed` otherwise.
    pub fn resolve(&mut self, computed: Option<Arc<T>>) -> Option<Arc<T>> {
        if !self.force_en {
            return computed;
        }
        if !self.announced {
            self.announced = true;
            let what = if self.value.is_some() { "forced value" } else { "forced bypass" };
            if self.verbose {
                info!("dqe {}: using {what}", self.stage.as_str());
            } else {
                debug!("dqe {}: using {what}", self.stage.as_str());
            }
        }
        self.value.clone()
    }

    pub(crate) fn mark_committed(&mut self) {
        self.dirty = false;
    }
}

impl<T> fmt::Debug for Override<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Override")
            .field("stage", &self.stage)
            .field("force_en", &self.force_en)
            .field("verbose", &self.verbose)
            .field("dirty", &self.dirty)
            .field("has_value", &self.value.is_some())
            .finish()
    }
}

/// Every debug override held by a device.
#[derive(Debug)]
pub struct DebugOverrides {
    pub degamma: Override<ColorLut>,
    pub regamma: Override<ColorLut>,
    pub cgc: Override<CgcLut>,
    pub linear_matrix: Override<ColorMatrix>,
    pub gamma_matrix: Override<ColorMatrix>,
    pub disp_dither: Override<DitherConfig>,
    pub cgc_dither: Override<DitherConfig>,
    pub atc: Override<AtcConfig>,
}

impl DebugOverrides {
    pub fn new() -> Self {
        Self {
            degamma: Override::new(Stage::Degamma),
            regamma: Override::new(Stage::Regamma),
            cgc: Override::new(Stage::Cgc),
            linear_matrix: Override::new(Stage::LinearMatrix),
            gamma_matrix: Override::new(Stage::GammaMatrix),
            disp_dither: Override::new(Stage::Dither(DitherType::Disp)),
            cgc_dither: Override::new(Stage::Dither(DitherType::Cgc)),
            atc: Override::new(Stage::Atc),
        }
    }

    pub fn dither(&mut self, kind: DitherType) -> &mut Override<DitherConfig> {
        match kind {
            DitherType::Disp => &mut self.disp_dither,
            DitherType::Cgc => &mut self.cgc_dither,
        }
    }
}

impl Default for DebugOverrides {
    fn default() -> Self {
        Self::new()
    }
}
