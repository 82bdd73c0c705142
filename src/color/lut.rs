use crate::error::{DqeError, DqeResult};

/// Number of entries in a degamma LUT.
pub const DEGAMMA_LUT_SIZE: usize = 65;
/// Number of entries in a regamma LUT.
pub const REGAMMA_LUT_SIZE: usize = 65;
/// Number of nodes per component in a CGC (color gamut correction) LUT.
pub const CGC_LUT_SIZE: usize = 2457;

/// One LUT node, 16-bit per component (DRM `drm_color_lut` layout).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorLutEntry {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl ColorLutEntry {
    pub const fn gray(value: u16) -> Self {
        Self {
            red: value,
            green: value,
            blue: value,
        }
    }
}

/// Per-component 1D LUT used by the degamma and regamma stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorLut {
    entries: Vec<ColorLutEntry>,
}

impl ColorLut {
    /// Wrap `entries`, which must hold exactly `expected` nodes.
    pub fn new(entries: Vec<ColorLutEntry>, expected: usize) -> DqeResult<Self> {
        if entries.len() != expected {
            return Err(DqeError::invalid(format!(
                "color LUT has {} entries, expected {}",
                entries.len(),
                expected
            )));
        }
        Ok(Self { entries })
    }

    /// Identity ramp with `size` nodes spanning the full 16-bit range.
    pub fn linear(size: usize) -> Self {
        let last = size.saturating_sub(1).max(1) as u32;
        let entries = (0..size as u32)
            .map(|i| ColorLutEntry::gray((i * u16::MAX as u32 / last) as u16))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ColorLutEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 3D color gamut correction LUT, stored as separate component planes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgcLut {
    pub r_values: Vec<u32>,
    pub g_values: Vec<u32>,
    pub b_values: Vec<u32>,
}

impl CgcLut {
    pub fn new(r_values: Vec<u32>, g_values: Vec<u32>, b_values: Vec<u32>) -> DqeResult<Self> {
        for (name, plane) in [("r", &r_values), ("g", &g_values), ("b", &b_values)] {
            if plane.len() != CGC_LUT_SIZE {
                return Err(DqeError::invalid(format!(
                    "CGC {} plane has {} nodes, expected {}",
                    name,
                    plane.len(),
                    CGC_LUT_SIZE
                )));
            }
        }
        Ok(Self {
            r_values,
            g_values,
            b_values,
        })
    }

    /// LUT with every node of every plane set to `value`.
    pub fn filled(value: u32) -> Self {
        Self {
            r_values: vec![value; CGC_LUT_SIZE],
            g_values: vec![value; CGC_LUT_SIZE],
            b_values: vec![value; CGC_LUT_SIZE],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_ramp_endpoints() {
        let lut = ColorLut::linear(DEGAMMA_LUT_SIZE);
        assert_eq!(lut.len(), DEGAMMA_LUT_SIZE);
        assert_eq!(lut.entries()[0], ColorLutEntry::gray(0));
        assert_eq!(lut.entries()[DEGAMMA_LUT_SIZE - 1], ColorLutEntry::gray(u16::MAX));
    }

    #[test]
    fn test_lut_size_checked() {
        let err = ColorLut::new(vec![ColorLutEntry::default(); 3], REGAMMA_LUT_SIZE).unwrap_err();
        assert!(matches!(err, DqeError::InvalidArgument(_)));
    }

    #[test]
    fn test_cgc_plane_size_checked() {
        let ok = vec![0u32; CGC_LUT_SIZE];
        assert!(CgcLut::new(ok.clone(), ok.clone(), ok.clone()).is_ok());
        assert!(CgcLut::new(ok.clone(), vec![0; 12], ok).is_err());
    }
}
