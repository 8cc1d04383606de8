//! The write-only pixel surface and its Radiance (.hdr / RGBE) encoder.
//!
//! Each pixel is retired by exactly one worker, so writes are disjoint
//! across threads; no per-pixel locking is needed. The `Sync` impl below
//! relies on that invariant: callers that write two overlapping indices
//! from different threads violate it and race.

use std::cell::UnsafeCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use euclid::Size2D;

use crate::error::OutputError;
use crate::storage::coord_spaces::PixelSpace;
use crate::storage::vec_types::Vec3;

struct PixelSlot(UnsafeCell<Vec3>);

// SAFETY: the render drivers guarantee each index is written by exactly one
// thread and read back only after all worker threads have joined.
unsafe impl Sync for PixelSlot {}

/// A write-only `width × height` RGB float surface.
pub struct Image {
    res: Size2D<u32, PixelSpace>,
    data: Vec<PixelSlot>,
}

impl Image {
    pub fn new(res: Size2D<u32, PixelSpace>) -> Image {
        let n = (res.width * res.height) as usize;
        let mut data = Vec::with_capacity(n);
        data.resize_with(n, || PixelSlot(UnsafeCell::new(Vec3::ZERO)));
        Image { res, data }
    }

    pub fn num_pixels(&self) -> usize {
        self.data.len()
    }

    /// Write the final value for pixel `idx`. Each pixel must be set exactly
    /// once over the lifetime of a render.
    pub fn set(&self, idx: usize, value: Vec3) {
        // SAFETY: per-index writes are disjoint by construction of the
        // driver loop.
        unsafe {
            *self.data[idx].0.get() = value;
        }
    }

    fn pixel(&self, idx: usize) -> Vec3 {
        // SAFETY: called only after all writer threads have joined.
        unsafe { *self.data[idx].0.get() }
    }

    #[cfg(test)]
    pub fn pixel_for_test(&self, idx: usize) -> Vec3 {
        self.pixel(idx)
    }

    /// Write the image as a 32-bit-float-per-channel Radiance (.hdr / RGBE)
    /// file, origin top-left, RGB interleaved.
    pub fn save_hdr(&self, path: &Path) -> Result<(), OutputError> {
        let file = File::create(path).map_err(|source| OutputError::ImageWrite {
            path: path.display().to_string(),
            source,
        })?;
        let mut w = BufWriter::new(file);
        self.write_hdr(&mut w).map_err(|source| OutputError::ImageWrite {
            path: path.display().to_string(),
            source,
        })
    }

    fn write_hdr(&self, w: &mut impl Write) -> std::io::Result<()> {
        writeln!(w, "#?RADIANCE")?;
        writeln!(w, "FORMAT=32-bit_rle_rgbe")?;
        writeln!(w)?;
        writeln!(w, "-Y {} +X {}", self.res.height, self.res.width)?;
        for y in 0..self.res.height {
            for x in 0..self.res.width {
                let idx = (y * self.res.width + x) as usize;
                let px = self.pixel(idx);
                w.write_all(&rgbe(px))?;
            }
        }
        Ok(())
    }
}

/// Encode one float RGB triple into the 4-byte RGBE representation.
fn rgbe(c: Vec3) -> [u8; 4] {
    let max = c.r.max(c.g).max(c.b);
    if max < 1e-32 {
        return [0, 0, 0, 0];
    }
    let (mantissa, exponent) = frexp(max);
    let scale = mantissa * 256.0 / max;
    [
        (c.r * scale).clamp(0.0, 255.0) as u8,
        (c.g * scale).clamp(0.0, 255.0) as u8,
        (c.b * scale).clamp(0.0, 255.0) as u8,
        (exponent + 128) as u8,
    ]
}

/// Decompose `x` into mantissa in `[0.5, 1.0)` and exponent such that
/// `x == mantissa * 2^exponent`. `std` has no portable `frexp`.
fn frexp(x: f32) -> (f32, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let exponent = ((bits >> 23) & 0xff) as i32 - 126;
    let mantissa = f32::from_bits((bits & 0x807f_ffff) | (126 << 23));
    (mantissa, exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_roundtrips_through_set() {
        let img = Image::new(Size2D::new(4, 4));
        img.set(5, Vec3::new(1.0, 0.5, 0.25));
        assert_eq!(img.pixel(5), Vec3::new(1.0, 0.5, 0.25));
    }

    #[test]
    fn saves_correctly_sized_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.hdr");
        let img = Image::new(Size2D::new(3, 2));
        for i in 0..6 {
            img.set(i, Vec3::new(1.0, 0.0, 0.0));
        }
        img.save_hdr(&path).unwrap();
        let contents = std::fs::read(&path).unwrap();
        assert!(String::from_utf8_lossy(&contents).contains("-Y 2 +X 3"));
    }

    #[test]
    fn black_pixel_is_zero_rgbe() {
        assert_eq!(rgbe(Vec3::ZERO), [0, 0, 0, 0]);
    }
}
