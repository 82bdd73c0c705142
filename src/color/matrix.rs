/// 3x3 color matrix with per-channel offsets, as consumed by the linear and
/// gamma matrix stages. Coefficients are fixed point, `1 << 16` is unity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMatrix {
    pub coeffs: [i32; 9],
    pub offsets: [i32; 3],
}

impl ColorMatrix {
    pub const UNITY: i32 = 1 << 16;

    pub const fn identity() -> Self {
        Self {
            coeffs: [
                Self::UNITY, 0, 0, //
                0, Self::UNITY, 0, //
                0, 0, Self::UNITY,
            ],
            offsets: [0; 3],
        }
    }
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::identity()
    }
}
