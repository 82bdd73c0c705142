use super::*;

use crate::color::LPD_ATC_REG_CNT;

impl<P: HardwareRegisterPort> DqeDevice<P> {
    /// The block is about to lose power.
    ///
    /// Snapshots the LPD ATC registers, stops programming and suspends every
    /// active histogram channel. Updates issued while hibernating are stored
    /// and committed on exit.
    pub fn hibernation_enter(&self) -> DqeResult<()> {
        self.ensure_ready()?;
        {
            let mut store = self.enhance();
            if !store.programmable {
                debug!("dqe: already hibernating");
                return Ok(());
            }
            if !store.lpd_restore_pending {
                store.lpd_snapshot = Some(self.port.read_lpd_atc());
                store.lpd_restore_pending = true;
            }
            store.programmable = false;
            store.invalidate_hw();
        }
        let suspended = self.bank().hibernate();
        info!("dqe: entered hibernation, {suspended} histogram channel(s) suspended");
        Ok(())
    }

    /// Power is back. Restores the LPD snapshot, rewrites the full stored
    /// state and re-arms the channels suspended on entry. Results captured
    /// before hibernation are discarded.
    pub fn hibernation_exit(&self) -> DqeResult<()> {
        self.ensure_ready()?;
        {
            let mut store = self.enhance();
            if store.programmable {
                debug!("dqe: not hibernating");
                return Ok(());
            }
            store.programmable = true;
            self.commit(&mut store, true);
        }
        let resumed = self.bank().resume(&self.port);
        info!("dqe: left hibernation, {resumed} histogram channel(s) re-armed");
        Ok(())
    }

    /// Snapshot the LPD ATC registers. The snapshot is written back by
    /// [`restore_lpd_data`](Self::restore_lpd_data) or, failing that, before
    /// the next commit.
    pub fn save_lpd_data(&self) -> DqeResult<()> {
        self.ensure_ready()?;
        let regs = self.port.read_lpd_atc();
        let mut store = self.enhance();
        store.lpd_snapshot = Some(regs);
        store.lpd_restore_pending = true;
        debug!("dqe: lpd atc registers saved");
        Ok(())
    }

    /// Write back a pending LPD snapshot. No-op when nothing is pending.
    pub fn restore_lpd_data(&self) -> DqeResult<()> {
        self.ensure_ready()?;
        let mut store = self.enhance();
        self.restore_lpd(&mut store);
        Ok(())
    }

    /// Last LPD snapshot taken, restored or not.
    pub fn lpd_snapshot(&self) -> Option<[u32; LPD_ATC_REG_CNT]> {
        self.enhance().lpd_snapshot
    }

    pub(super) fn restore_lpd(&self, store: &mut EnhanceStore) {
        if !store.lpd_restore_pending {
            return;
        }
        store.lpd_restore_pending = false;
        if let Some(regs) = store.lpd_snapshot.as_ref() {
            self.port.write_lpd_atc(regs);
            debug!("dqe: lpd atc registers restored");
        }
    }
}
