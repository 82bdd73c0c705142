use super::*;

use log::warn;

use super::state::StageSlot;
use crate::color::{AtcConfig, DitherConfig, DitherType};

impl<P: HardwareRegisterPort> DqeDevice<P> {
    /// Replace the computed enhancement state and commit it.
    ///
    /// `None` fields keep the value stored by an earlier update. While the
    /// block is hibernating the values are only stored; they are programmed
    /// by the full commit on [`hibernation_exit`](Self::hibernation_exit).
    pub fn update(&self, state: &EnhancementState, width: u32, height: u32) -> DqeResult<()> {
        self.ensure_ready()?;
        if width == 0 || height == 0 {
            warn!("dqe: update rejected, panel size {width}x{height}");
            return Err(DqeError::invalid(format!(
                "panel size {width}x{height} is empty"
            )));
        }

        let mut store = self.enhance();
        store.record(state, width, height);
        if !store.programmable {
            debug!("dqe: update stored, block not programmable");
            return Ok(());
        }
        let full = store.full_commit;
        self.commit(&mut store, full);
        Ok(())
    }

    /// Drop every computed value and program the disabled baseline.
    /// Debug overrides survive a reset.
    pub fn reset(&self) -> DqeResult<()> {
        self.ensure_ready()?;
        let mut store = self.enhance();
        store.clear_computed();
        if !store.programmable {
            store.full_commit = true;
            return Ok(());
        }
        self.program_baseline(&mut store);
        Ok(())
    }

    /// Store a new ATC configuration and commit that stage alone.
    pub fn atc_update(&self, config: Option<Arc<AtcConfig>>) -> DqeResult<()> {
        self.ensure_ready()?;
        let mut store = self.enhance();
        store.atc.record(config.as_ref());
        if !store.programmable || store.hw_enabled != Some(true) {
            // picked up by the next full update
            return Ok(());
        }
        self.restore_lpd(&mut store);
        let EnhanceStore {
            atc,
            overrides,
            dstep_changed,
            ..
        } = &mut *store;
        commit_atc(&self.port, atc, &mut overrides.atc, false, dstep_changed);
        Ok(())
    }

    /// Whether the ATC dimming step changed since the last frame completion.
    pub fn atc_dstep_changed(&self) -> bool {
        self.enhance().dstep_changed
    }

    /// Write the effective state. `full` rewrites every field regardless of
    /// what the hardware is believed to hold.
    pub(super) fn commit(&self, store: &mut EnhanceStore, full: bool) {
        self.restore_lpd(store);

        let enabled = store.requested_enabled && !self.force_disabled();
        if full || store.hw_enabled != Some(enabled) {
            self.port.set_enabled(enabled);
            store.hw_enabled = Some(enabled);
        }
        store.commits += 1;
        if !enabled {
            debug!("dqe: commit #{} with block disabled", store.commits);
            return;
        }

        if let Some((width, height)) = store.requested_size {
            if full || store.hw_size != Some((width, height)) {
                self.port.set_size(width, height);
                store.hw_size = Some((width, height));
            }
        }
        let rcd = store.requested_rcd;
        if full || store.hw_rcd != Some(rcd) {
            self.port.set_rcd_enabled(rcd);
            store.hw_rcd = Some(rcd);
        }

        let written = self.commit_stages(store, full);
        store.full_commit = false;
        debug!(
            "dqe: commit #{}{} wrote {written} stage(s)",
            store.commits,
            if full { " (full)" } else { "" }
        );
    }

    /// Disable the block and program every stage with its effective value,
    /// which is bypass unless an override is forced.
    pub(super) fn program_baseline(&self, store: &mut EnhanceStore) {
        self.restore_lpd(store);
        self.port.set_enabled(false);
        store.hw_enabled = Some(false);
        self.commit_stages(store, true);
        store.full_commit = false;
        store.commits += 1;
        debug!("dqe: baseline programmed");
    }

    fn commit_stages(&self, store: &mut EnhanceStore, full: bool) -> usize {
        let port = &self.port;
        let EnhanceStore {
            degamma,
            regamma,
            cgc,
            linear_matrix,
            gamma_matrix,
            disp_dither,
            cgc_dither,
            atc,
            overrides,
            dstep_changed,
            ..
        } = store;

        let written = [
            degamma.commit(&mut overrides.degamma, full, |lut| {
                port.write_degamma_lut(lut)
            }),
            cgc.commit(&mut overrides.cgc, full, |lut| port.write_cgc_lut(lut)),
            linear_matrix.commit(&mut overrides.linear_matrix, full, |m| {
                port.write_linear_matrix(m)
            }),
            gamma_matrix.commit(&mut overrides.gamma_matrix, full, |m| {
                port.write_gamma_matrix(m)
            }),
            regamma.commit(&mut overrides.regamma, full, |lut| {
                port.write_regamma_lut(lut)
            }),
            commit_dither(port, DitherType::Disp, disp_dither, &mut overrides.disp_dither, full),
            commit_dither(port, DitherType::Cgc, cgc_dither, &mut overrides.cgc_dither, full),
            commit_atc(port, atc, &mut overrides.atc, full, dstep_changed),
        ];
        written.iter().filter(|&&w| w).count()
    }
}

fn commit_dither<P: HardwareRegisterPort>(
    port: &P,
    kind: DitherType,
    slot: &mut StageSlot<DitherConfig>,
    ov: &mut Override<DitherConfig>,
    full: bool,
) -> bool {
    slot.commit(ov, full, |config| port.write_dither(kind, config))
}

/// Commit the ATC stage, flagging a dimming step change.
fn commit_atc<P: HardwareRegisterPort>(
    port: &P,
    slot: &mut StageSlot<AtcConfig>,
    ov: &mut Override<AtcConfig>,
    full: bool,
    dstep_changed: &mut bool,
) -> bool {
    let before = slot.programmed().map(|config| config.dstep);
    if !slot.commit(ov, full, |config| port.write_atc(config)) {
        return false;
    }
    let after = slot.programmed().map(|config| config.dstep);
    if let (Some(before), Some(after)) = (before, after) {
        if before != after {
            debug!("dqe atc: dstep {before} -> {after}");
            *dstep_changed = true;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ColorLut, ColorMatrix, Stage, DEGAMMA_LUT_SIZE};
    use crate::regs::{MemoryRegisters, RegWrite};

    fn device() -> DqeDevice<MemoryRegisters> {
        let dqe = DqeDevice::new(MemoryRegisters::new(), DqeConfig::default());
        dqe.attach();
        dqe.port().clear_writes();
        dqe
    }

    #[test]
    fn test_update_rejected_before_attach() {
        let dqe = DqeDevice::new(MemoryRegisters::new(), DqeConfig::default());
        assert_eq!(
            dqe.update(&EnhancementState::enabled(), 100, 100),
            Err(DqeError::NotReady)
        );
        assert!(dqe.port().writes().is_empty());
    }

    #[test]
    fn test_empty_size_rejected() {
        let dqe = device();
        assert!(matches!(
            dqe.update(&EnhancementState::enabled(), 0, 10),
            Err(DqeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_first_update_programs_everything() {
        let dqe = device();
        let state = EnhancementState {
            degamma_lut: Some(Arc::new(ColorLut::linear(DEGAMMA_LUT_SIZE))),
            ..EnhancementState::enabled()
        };
        dqe.update(&state, 1080, 2400).unwrap();

        let regs = dqe.port();
        assert!(regs.enabled());
        assert_eq!(regs.size(), Some((1080, 2400)));
        assert!(regs.degamma_lut().is_some());
        assert_eq!(regs.stage_writes(Stage::Degamma), 1);
    }

    #[test]
    fn test_unchanged_stage_not_rewritten() {
        let dqe = device();
        let matrix = Arc::new(ColorMatrix::identity());
        let state = EnhancementState {
            gamma_matrix: Some(Arc::clone(&matrix)),
            ..EnhancementState::enabled()
        };
        dqe.update(&state, 64, 64).unwrap();
        dqe.port().clear_writes();

        dqe.update(&state, 64, 64).unwrap();
        dqe.update(&EnhancementState::enabled(), 64, 64).unwrap();
        assert!(dqe.port().writes().is_empty());
    }

    #[test]
    fn test_force_disabled_skips_stages() {
        let dqe = device();
        dqe.set_force_disabled(true);
        let state = EnhancementState {
            linear_matrix: Some(Arc::new(ColorMatrix::identity())),
            ..EnhancementState::enabled()
        };
        dqe.update(&state, 64, 64).unwrap();
        assert!(!dqe.port().enabled());
        assert_eq!(dqe.port().stage_writes(Stage::LinearMatrix), 0);

        dqe.set_force_disabled(false);
        dqe.update(&EnhancementState::enabled(), 64, 64).unwrap();
        assert!(dqe.port().enabled());
        assert!(dqe.port().linear_matrix().is_some());
    }

    #[test]
    fn test_reset_programs_bypass() {
        let dqe = device();
        let state = EnhancementState {
            gamma_matrix: Some(Arc::new(ColorMatrix::identity())),
            ..EnhancementState::enabled()
        };
        dqe.update(&state, 64, 64).unwrap();
        dqe.reset().unwrap();

        let regs = dqe.port();
        assert!(!regs.enabled());
        assert!(regs.gamma_matrix().is_none());
        assert!(regs.writes().contains(&RegWrite::Stage {
            stage: Stage::GammaMatrix,
            enabled: false,
        }));
    }

    #[test]
    fn test_atc_dstep_tracking() {
        let dqe = device();
        dqe.update(&EnhancementState::enabled(), 64, 64).unwrap();
        dqe.atc_update(Some(Arc::new(AtcConfig {
            en: true,
            dstep: 4,
            ..AtcConfig::default()
        })))
        .unwrap();
        assert!(!dqe.atc_dstep_changed());

        dqe.atc_update(Some(Arc::new(AtcConfig {
            en: true,
            dstep: 8,
            ..AtcConfig::default()
        })))
        .unwrap();
        assert!(dqe.atc_dstep_changed());
        assert_eq!(dqe.port().atc().map(|c| c.dstep), Some(8));
    }

    #[test]
    fn test_atc_update_waits_for_enabled_block() {
        let dqe = device();
        dqe.atc_update(Some(Arc::new(AtcConfig::default()))).unwrap();
        assert_eq!(dqe.port().stage_writes(Stage::Atc), 0);
        dqe.update(&EnhancementState::enabled(), 64, 64).unwrap();
        assert!(dqe.port().atc().is_some());
    }
}
