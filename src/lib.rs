//! # dqe
//!
//! Core of a display quality enhancer: the block that sits at the end of a
//! display pipeline and applies degamma/regamma LUTs, color gamut
//! correction, color matrices, dithering and adaptive tone control, plus the
//! per-frame histogram statistics used by brightness and tone algorithms.
//!
//! The hardware is reached through [`regs::HardwareRegisterPort`];
//! [`regs::MemoryRegisters`] implements it in memory.
//!
//! ## Rust usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use dqe::histogram::{ChannelConfig, ChannelId, CommittedFrame, Roi, Weights};
//! use dqe::{DqeConfig, DqeDevice, EnhancementState, MemoryRegisters};
//!
//! let dqe = DqeDevice::new(MemoryRegisters::new(), DqeConfig::default());
//! dqe.attach();
//! dqe.update(&EnhancementState::enabled(), 1080, 2400).unwrap();
//!
//! let ch = ChannelId::new(0).unwrap();
//! let config = ChannelConfig::new(Roi::new(0, 0, 1080, 2400), Weights::BT709);
//! dqe.histogram_chan_configure(ch, Arc::new(config)).unwrap();
//! dqe.histogram_chan_set_state(ch, true, None).unwrap();
//!
//! dqe.frame_completed(&CommittedFrame::active());
//! let events = dqe.handle_histogram_event().unwrap();
//! assert_eq!(events.len(), 1);
//! ```

pub mod color;
pub mod config;
pub mod control;
pub mod dqe;
pub mod error;
pub mod histogram;
pub mod regs;
pub mod vsync;

#[cfg(feature = "python")]
mod python;

pub use config::DqeConfig;
pub use dqe::{DebugOverrides, DqeDevice, EnhancementState, Override};
pub use error::{DqeError, DqeResult};
pub use regs::{HardwareRegisterPort, MemoryRegisters};
pub use vsync::VsyncDriver;
