//! Phantom coordinate spaces, following the euclid tagged-unit pattern.
//!
//! Keeping scene-space and pixel-space points as distinct types prevents the
//! classic "forgot to convert pixel index to world coordinate" bug at
//! compile time; the phantom types carry no runtime representation.

/// Phantom type for points expressed in the scene's mathematical window.
pub struct SceneSpace;

/// Phantom type for integer pixel indices into the output image.
pub struct PixelSpace;
