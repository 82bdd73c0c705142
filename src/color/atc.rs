/// Number of adaptive tone control registers kept across power-retention loss.
pub const LPD_ATC_REG_CNT: usize = 45;

/// Adaptive tone control (ATC) parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtcConfig {
    pub en: bool,
    pub lt: u8,
    pub ns: u8,
    pub st: u8,
    pub dither: bool,
    pub pl_w1: u8,
    pub pl_w2: u8,
    pub ctmode: u8,
    pub pp_en: bool,
    pub upgrade_on: u8,
    pub tdr_max: u16,
    pub tdr_min: u16,
    pub ambient_light: u16,
    pub back_light: u16,
    /// Dimming step; a change takes effect progressively over the next frame.
    pub dstep: u8,
    pub scale_mode: u8,
    pub threshold_1: u8,
    pub threshold_2: u8,
    pub threshold_3: u8,
    pub gain_limit: u16,
    pub lt_calc_ab_shift: u8,
    pub dim_ratio: u16,
}
