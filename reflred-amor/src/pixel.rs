//! Pixel-id layout of the AMOR multi-blade detector.
//!
//! Each blade is a 32 x 32 grid; ids run `blade * 1024 + z * 32 + y`.

/// Pixels along one blade axis.
pub const PIXELS_PER_AXIS: u32 = 32;

/// Pixels on one blade.
pub const PIXELS_PER_BLADE: u32 = PIXELS_PER_AXIS * PIXELS_PER_AXIS;

/// Position of a pixel on the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelAddress {
    /// Blade index.
    pub blade: u32,
    /// Wire index along the blade (beam-height direction).
    pub z: u32,
    /// Strip index across the blade (horizontal direction).
    pub y: u32,
}

impl PixelAddress {
    /// Creates a new pixel address.
    #[inline]
    #[must_use]
    pub fn new(blade: u32, z: u32, y: u32) -> Self {
        Self { blade, z, y }
    }

    /// Splits a pixel id into blade, z and y.
    #[inline]
    #[must_use]
    pub fn from_pixel_id(pixel_id: u32) -> Self {
        let blade = pixel_id / PIXELS_PER_BLADE;
        let remainder = pixel_id % PIXELS_PER_BLADE;
        Self {
            blade,
            z: remainder / PIXELS_PER_AXIS,
            y: remainder % PIXELS_PER_AXIS,
        }
    }

    /// Recombines the address into its pixel id.
    #[inline]
    #[must_use]
    pub fn pixel_id(&self) -> u32 {
        self.blade * PIXELS_PER_BLADE + self.z * PIXELS_PER_AXIS + self.y
    }
}
