//! Window dimensions tracked by the viewer
//!
//! Sizes here are logical pixels. The output surface is sized in physical
//! pixels. When the window reports its physical size that value is kept as-is,
//! so the surface always matches the window even at fractional scale factors.

/// Logical window size plus derived half extents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    width: u32,
    height: u32,
    half_width: f32,
    half_height: f32,
    pixel_ratio: f64,
    physical: (u32, u32),
    aspect: f32,
}

impl ViewportState {
    /// Viewport of `width`×`height` logical pixels.
    ///
    /// # Panics
    /// Panics if either dimension is zero or the pixel ratio is not positive.
    pub fn new(width: u32, height: u32, pixel_ratio: f64) -> Self {
        let physical = physical_size(width, height, pixel_ratio);
        Self::with_sizes(width, height, pixel_ratio, physical, width as f32 / height as f32)
    }

    /// Viewport of a window whose inner size is `width`×`height` physical
    /// pixels.
    ///
    /// # Panics
    /// Panics if either dimension is zero or the pixel ratio is not positive.
    pub fn from_physical(width: u32, height: u32, pixel_ratio: f64) -> Self {
        assert!(pixel_ratio > 0.0, "pixel ratio must be positive");
        let (logical_width, logical_height) = logical_size(width, height, pixel_ratio);
        // The window's own size decides the shape of the frame
        let aspect = width as f32 / height as f32;
        Self::with_sizes(logical_width, logical_height, pixel_ratio, (width, height), aspect)
    }

    fn with_sizes(
        width: u32,
        height: u32,
        pixel_ratio: f64,
        physical: (u32, u32),
        aspect: f32,
    ) -> Self {
        assert!(
            width > 0 && height > 0 && physical.0 > 0 && physical.1 > 0,
            "viewport must be non-empty"
        );
        assert!(pixel_ratio > 0.0, "pixel ratio must be positive");

        Self {
            width,
            height,
            half_width: width as f32 / 2.0,
            half_height: height as f32 / 2.0,
            pixel_ratio,
            physical,
            aspect,
        }
    }

    /// Applies a resize signal in logical pixels.
    ///
    /// Returns `false` when the signal carries the size already in effect, in
    /// which case nothing downstream needs to react.
    pub fn resize(&mut self, width: u32, height: u32, pixel_ratio: f64) -> bool {
        self.replace(Self::new(width, height, pixel_ratio))
    }

    /// Replaces the viewport, returning `false` if nothing changed.
    pub fn replace(&mut self, next: ViewportState) -> bool {
        if *self == next {
            return false;
        }
        *self = next;
        true
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn half_width(&self) -> f32 {
        self.half_width
    }

    pub fn half_height(&self) -> f32 {
        self.half_height
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    /// Size of the output surface in physical pixels
    pub fn physical_size(&self) -> (u32, u32) {
        self.physical
    }
}

/// Scales a logical size by the pixel ratio, never returning an empty size.
pub fn physical_size(width: u32, height: u32, pixel_ratio: f64) -> (u32, u32) {
    let scale = |v: u32| ((v as f64 * pixel_ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Divides a physical size by the pixel ratio, never returning an empty size.
pub fn logical_size(width: u32, height: u32, pixel_ratio: f64) -> (u32, u32) {
    let scale = |v: u32| ((v as f64 / pixel_ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_extents_follow_resize() {
        let mut viewport = ViewportState::new(1920, 1080, 1.0);
        assert_eq!(viewport.half_width(), 960.0);
        assert_eq!(viewport.half_height(), 540.0);

        assert!(viewport.resize(801, 600, 1.0));
        assert_eq!(viewport.half_width(), 400.5);
        assert_eq!(viewport.half_height(), 300.0);
    }

    #[test]
    fn identical_resize_is_a_no_op() {
        let mut viewport = ViewportState::new(800, 600, 2.0);
        assert!(!viewport.resize(800, 600, 2.0));
        assert!(viewport.resize(800, 600, 1.0));
    }

    #[test]
    fn physical_size_scales_by_pixel_ratio() {
        let viewport = ViewportState::new(800, 600, 1.5);
        assert_eq!(viewport.physical_size(), (1200, 900));
        assert_eq!(physical_size(1, 1, 0.25), (1, 1));
    }

    #[test]
    fn physical_window_size_survives_fractional_scale() {
        let viewport = ViewportState::from_physical(1000, 750, 1.5);
        assert_eq!(viewport.physical_size(), (1000, 750));
        assert_eq!((viewport.width(), viewport.height()), (667, 500));
        assert_eq!(viewport.aspect_ratio(), 1000.0 / 750.0);
    }

    #[test]
    fn logical_size_divides_by_scale_factor() {
        assert_eq!(logical_size(1600, 1200, 2.0), (800, 600));
        assert_eq!(logical_size(1, 1, 2.0), (1, 1));
    }

    #[test]
    #[should_panic(expected = "viewport must be non-empty")]
    fn zero_sized_viewport_is_rejected() {
        ViewportState::new(0, 600, 1.0);
    }
}
