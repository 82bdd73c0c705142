// Local high brightness mode (LHBM) gray level tracking.
//
// LHBM dims or boosts a small region around the fingerprint sensor; the panel
// driver needs the mean gray level under that region, which comes from a
// dedicated histogram channel armed with an internal callback.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use super::{HistogramBins, HistogramCallback};

const GRAY_LEVEL_UNKNOWN: i32 = -1;

/// Mean bin index of `bins`, i.e. the average gray level (0..=255).
/// `None` when the histogram is empty.
pub fn gray_level(bins: &HistogramBins) -> Option<u32> {
    let total = bins.total();
    if total == 0 {
        return None;
    }
    let weighted: u64 = bins
        .as_slice()
        .iter()
        .enumerate()
        .map(|(level, &count)| level as u64 * count as u64)
        .sum();
    Some(((weighted + total / 2) / total) as u32)
}

/// Latest LHBM gray level, shared with the channel callback.
#[derive(Debug, Clone)]
pub struct LhbmGrayLevel {
    level: Arc<AtomicI32>,
}

impl LhbmGrayLevel {
    pub fn new() -> Self {
        Self {
            level: Arc::new(AtomicI32::new(GRAY_LEVEL_UNKNOWN)),
        }
    }

    pub fn get(&self) -> Option<u32> {
        let level = self.level.load(Ordering::Acquire);
        (level >= 0).then_some(level as u32)
    }

    pub(crate) fn clear(&self) {
        self.level.store(GRAY_LEVEL_UNKNOWN, Ordering::Release);
    }

    /// Callback that updates this tracker from captured bins.
    pub(crate) fn callback(&self) -> HistogramCallback {
        let level = Arc::clone(&self.level);
        Arc::new(move |_, bins| {
            let value = gray_level(bins).map_or(GRAY_LEVEL_UNKNOWN, |v| v as i32);
            level.store(value, Ordering::Release);
        })
    }
}

impl Default for LhbmGrayLevel {
    fn default() -> Self {
        Self::new()
    }
}
