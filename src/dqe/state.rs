// Enhancement state store.
//
// Callers hand in an EnhancementState per commit. Every field is a shared
// reference to a value the caller owns; a `None` field leaves the stage at
// whatever was stored last. The store remembers both the last computed value
// and the value actually programmed, so a commit writes a stage only when the
// effective value changed.

use std::sync::Arc;

use super::debug::{DebugOverrides, Override};
use crate::color::{AtcConfig, CgcLut, ColorLut, ColorMatrix, DitherConfig, LPD_ATC_REG_CNT};

/// Values computed by the color-management layer for one commit.
#[derive(Debug, Clone, Default)]
pub struct EnhancementState {
    pub enabled: bool,
    pub rcd_enabled: bool,
    pub degamma_lut: Option<Arc<ColorLut>>,
    pub regamma_lut: Option<Arc<ColorLut>>,
    pub cgc_lut: Option<Arc<CgcLut>>,
    pub linear_matrix: Option<Arc<ColorMatrix>>,
    pub gamma_matrix: Option<Arc<ColorMatrix>>,
    pub disp_dither: Option<Arc<DitherConfig>>,
    pub cgc_dither: Option<Arc<DitherConfig>>,
    pub atc: Option<Arc<AtcConfig>>,
}

impl EnhancementState {
    /// State with the block enabled and every stage left unchanged.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

/// Computed and programmed value of one stage.
#[derive(Debug)]
pub(crate) struct StageSlot<T> {
    computed: Option<Arc<T>>,
    programmed: Option<Arc<T>>,
    programmed_forced: bool,
}

impl<T> Default for StageSlot<T> {
    fn default() -> Self {
        Self {
            computed: None,
            programmed: None,
            programmed_forced: false,
        }
    }
}

impl<T> StageSlot<T> {
    /// Store a newly computed value; `None` keeps the previous one.
    pub(crate) fn record(&mut self, computed: Option<&Arc<T>>) {
        if let Some(value) = computed {
            self.computed = Some(Arc::clone(value));
        }
    }

    #[cfg(test)]
    pub(crate) fn computed(&self) -> Option<&Arc<T>> {
        self.computed.as_ref()
    }

    pub(crate) fn programmed(&self) -> Option<&Arc<T>> {
        self.programmed.as_ref()
    }

    /// Resolve the effective value through `ov` and hand it to `write` when
    /// it differs from what the hardware holds. Returns whether it wrote.
    pub(crate) fn commit(
        &mut self,
        ov: &mut Override<T>,
        full: bool,
        write: impl FnOnce(Option<&T>),
    ) -> bool {
        let forced = ov.is_forced();
        let forced_dirty = forced && ov.is_dirty();
        let effective = ov.resolve(self.computed.clone());
        let changed = !same_value(effective.as_ref(), self.programmed.as_ref())
            || forced != self.programmed_forced;
        if !(full || changed || forced_dirty) {
            return false;
        }
        write(effective.as_deref());
        self.programmed = effective;
        self.programmed_forced = forced;
        ov.mark_committed();
        true
    }

    /// Forget what the hardware holds; the next commit rewrites the stage.
    pub(crate) fn invalidate(&mut self) {
        self.programmed = None;
        self.programmed_forced = false;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

fn same_value<T>(a: Option<&Arc<T>>, b: Option<&Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Everything guarded by the enhancement lock.
#[derive(Debug)]
pub(crate) struct EnhanceStore {
    pub(crate) degamma: StageSlot<ColorLut>,
    pub(crate) regamma: StageSlot<ColorLut>,
    pub(crate) cgc: StageSlot<CgcLut>,
    pub(crate) linear_matrix: StageSlot<ColorMatrix>,
    pub(crate) gamma_matrix: StageSlot<ColorMatrix>,
    pub(crate) disp_dither: StageSlot<DitherConfig>,
    pub(crate) cgc_dither: StageSlot<DitherConfig>,
    pub(crate) atc: StageSlot<AtcConfig>,
    pub(crate) overrides: DebugOverrides,

    pub(crate) requested_enabled: bool,
    pub(crate) requested_rcd: bool,
    pub(crate) requested_size: Option<(u32, u32)>,
    pub(crate) hw_enabled: Option<bool>,
    pub(crate) hw_rcd: Option<bool>,
    pub(crate) hw_size: Option<(u32, u32)>,

    /// Registers may be written. Cleared while hibernating.
    pub(crate) programmable: bool,
    /// Next commit rewrites every stage.
    pub(crate) full_commit: bool,
    pub(crate) lpd_snapshot: Option<[u32; LPD_ATC_REG_CNT]>,
    pub(crate) lpd_restore_pending: bool,
    pub(crate) dstep_changed: bool,
    pub(crate) commits: u64,
}

impl EnhanceStore {
    pub(crate) fn new() -> Self {
        Self {
            degamma: StageSlot::default(),
            regamma: StageSlot::default(),
            cgc: StageSlot::default(),
            linear_matrix: StageSlot::default(),
            gamma_matrix: StageSlot::default(),
            disp_dither: StageSlot::default(),
            cgc_dither: StageSlot::default(),
            atc: StageSlot::default(),
            overrides: DebugOverrides::new(),
            requested_enabled: false,
            requested_rcd: false,
            requested_size: None,
            hw_enabled: None,
            hw_rcd: None,
            hw_size: None,
            programmable: true,
            full_commit: true,
            lpd_snapshot: None,
            lpd_restore_pending: false,
            dstep_changed: false,
            commits: 0,
        }
    }

    pub(crate) fn record(&mut self, state: &EnhancementState, width: u32, height: u32) {
        self.requested_enabled = state.enabled;
        self.requested_rcd = state.rcd_enabled;
        self.requested_size = Some((width, height));
        self.degamma.record(state.degamma_lut.as_ref());
        self.regamma.record(state.regamma_lut.as_ref());
        self.cgc.record(state.cgc_lut.as_ref());
        self.linear_matrix.record(state.linear_matrix.as_ref());
        self.gamma_matrix.record(state.gamma_matrix.as_ref());
        self.disp_dither.record(state.disp_dither.as_ref());
        self.cgc_dither.record(state.cgc_dither.as_ref());
        self.atc.record(state.atc.as_ref());
    }

    /// Hardware content is gone; schedule a full rewrite.
    pub(crate) fn invalidate_hw(&mut self) {
        self.degamma.invalidate();
        self.regamma.invalidate();
        self.cgc.invalidate();
        self.linear_matrix.invalidate();
        self.gamma_matrix.invalidate();
        self.disp_dither.invalidate();
        self.cgc_dither.invalidate();
        self.atc.invalidate();
        self.hw_enabled = None;
        self.hw_rcd = None;
        self.hw_size = None;
        self.full_commit = true;
    }

    /// Drop every computed value. Overrides are kept.
    pub(crate) fn clear_computed(&mut self) {
        self.degamma.clear();
        self.regamma.clear();
        self.cgc.clear();
        self.linear_matrix.clear();
        self.gamma_matrix.clear();
        self.disp_dither.clear();
        self.cgc_dither.clear();
        self.atc.clear();
        self.requested_enabled = false;
        self.requested_rcd = false;
        self.dstep_changed = false;
    }
}
