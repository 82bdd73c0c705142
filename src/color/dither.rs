/// Which dither block a configuration targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DitherType {
    /// Panel output dither
    Disp,
    /// Dither after color gamut correction
    Cgc,
}

impl DitherType {
    pub const ALL: [DitherType; 2] = [DitherType::Disp, DitherType::Cgc];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disp => "disp",
            Self::Cgc => "cgc",
        }
    }
}

/// Register-level dither configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DitherConfig {
    pub en: bool,
    pub mode: u8,
    pub frame_con: u8,
    pub frame_offset: u8,
    pub table_sel_r: bool,
    pub table_sel_g: bool,
    pub table_sel_b: bool,
}
