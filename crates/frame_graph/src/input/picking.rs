//! Picking: deciding which frame lies under a pixel
//!
//! Three precisions are supported per frame:
//! - [`Precision::Bound`]: a square of fixed pixel size around the projected
//!   frame origin
//! - [`Precision::Adaptive`]: a square whose size is a world-space length
//!   projected at the frame's depth, so it shrinks with distance
//! - [`Precision::Exact`]: the frame's own silhouette, read back from an
//!   identifier buffer rendered with one flat [`IdColor`] per frame
//!
//! Screen coordinates are pixels with the origin at the top-left corner.

use crate::foundation::collections::FrameId;
use crate::foundation::math::{Point3, Vec3};
use crate::scene::Graph;

/// How a frame decides whether it lies under a pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// Fixed-size square around the projected origin
    #[default]
    Bound,
    /// World-sized square around the projected origin
    Adaptive,
    /// Silhouette in the identifier buffer
    Exact,
}

/// Flat color encoding a pick identifier in 24 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdColor {
    /// Bits 0..8 of the identifier
    pub r: u8,
    /// Bits 8..16 of the identifier
    pub g: u8,
    /// Bits 16..24 of the identifier
    pub b: u8,
}

impl IdColor {
    /// Largest identifier that fits in a color
    pub const MAX_ID: u32 = 0x00FF_FFFF;

    /// Encode an identifier; `None` if it needs more than 24 bits
    pub fn from_id(id: u32) -> Option<Self> {
        if id > Self::MAX_ID {
            return None;
        }
        Some(Self {
            r: (id & 0xFF) as u8,
            g: ((id >> 8) & 0xFF) as u8,
            b: ((id >> 16) & 0xFF) as u8,
        })
    }

    /// Decoded identifier
    pub fn id(&self) -> u32 {
        u32::from(self.r) | (u32::from(self.g) << 8) | (u32::from(self.b) << 16)
    }

    /// Opaque `0xAARRGGBB` pixel value
    pub fn to_argb(&self) -> u32 {
        0xFF00_0000 | (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// Color stored in an `0xAARRGGBB` pixel, `None` for non-opaque pixels
    pub fn from_argb(pixel: u32) -> Option<Self> {
        if pixel >> 24 != 0xFF {
            return None;
        }
        Some(Self {
            r: ((pixel >> 16) & 0xFF) as u8,
            g: ((pixel >> 8) & 0xFF) as u8,
            b: (pixel & 0xFF) as u8,
        })
    }

    /// Normalized RGB for shader uniforms
    pub fn to_rgb_f32(&self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }
}

/// Read-back of an identifier pass: `0xAARRGGBB` pixels, row-major with the
/// first row at the top of the viewport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl IdentifierBuffer {
    /// Transparent buffer of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap pixels read back from a render target
    ///
    /// Returns `None` when the pixel count does not match the size.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self { width, height, pixels })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw pixels
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    fn index(&self, x: f32, y: f32) -> Option<usize> {
        if !(x >= 0.0 && y >= 0.0) {
            return None;
        }
        let (column, row) = (x.floor() as u64, y.floor() as u64);
        if column >= u64::from(self.width) || row >= u64::from(self.height) {
            return None;
        }
        Some(row as usize * self.width as usize + column as usize)
    }

    /// Pixel under a screen position, `None` outside the buffer
    pub fn pixel(&self, x: f32, y: f32) -> Option<u32> {
        self.index(x, y).map(|index| self.pixels[index])
    }

    /// Write one pixel; out-of-bounds writes are ignored
    pub fn set_pixel(&mut self, x: f32, y: f32, argb: u32) {
        if let Some(index) = self.index(x, y) {
            self.pixels[index] = argb;
        }
    }

    /// Fill the pixels whose centers fall in `[x0, x1) x [y0, y1)`, clipped
    pub fn fill_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, argb: u32) {
        let clamp_x = |v: f32| v.round().clamp(0.0, self.width as f32) as usize;
        let clamp_y = |v: f32| v.round().clamp(0.0, self.height as f32) as usize;
        let (left, right) = (clamp_x(x0.min(x1)), clamp_x(x0.max(x1)));
        let (top, bottom) = (clamp_y(y0.min(y1)), clamp_y(y0.max(y1)));
        let width = self.width as usize;
        for row in top..bottom {
            self.pixels[row * width + left..row * width + right].fill(argb);
        }
    }

    /// Identifier drawn under a screen position
    ///
    /// `None` outside the buffer, on background pixels and on identifier 0.
    pub fn decode(&self, x: f32, y: f32) -> Option<u32> {
        let id = IdColor::from_argb(self.pixel(x, y)?)?.id();
        (id != 0).then_some(id)
    }
}

/// Picking state kept by the graph between draw cycles
#[derive(Debug, Clone)]
pub struct Picker {
    buffer: Option<IdentifierBuffer>,
    bound_threshold: f32,
    adaptive_threshold: f32,
}

impl Picker {
    /// World length used by adaptive frames without their own threshold
    pub const DEFAULT_ADAPTIVE_THRESHOLD: f32 = 1.0;

    /// Create a picker whose bound frames default to `bound_threshold` pixels
    pub fn new(bound_threshold: f32) -> Self {
        Self {
            buffer: None,
            bound_threshold,
            adaptive_threshold: Self::DEFAULT_ADAPTIVE_THRESHOLD,
        }
    }

    /// Identifier buffer from the last identifier pass
    pub fn buffer(&self) -> Option<&IdentifierBuffer> {
        self.buffer.as_ref()
    }

    /// Replace the identifier buffer
    pub fn set_buffer(&mut self, buffer: Option<IdentifierBuffer>) {
        self.buffer = buffer;
    }

    /// Default square size in pixels for bound frames
    pub fn bound_threshold(&self) -> f32 {
        self.bound_threshold
    }

    /// Default square size in world units for adaptive frames
    pub fn adaptive_threshold(&self) -> f32 {
        self.adaptive_threshold
    }

    fn threshold_for(&self, precision: Precision, own: Option<f32>) -> f32 {
        own.unwrap_or(match precision {
            Precision::Adaptive => self.adaptive_threshold,
            Precision::Bound | Precision::Exact => self.bound_threshold,
        })
    }
}

/// Whether `(x, y)` lies in the square of side `size` centered on `center`
fn in_square(center: &Point3, size: f32, x: f32, y: f32) -> bool {
    let half = size * 0.5;
    (x - center.x).abs() <= half && (y - center.y).abs() <= half
}

impl Graph {
    /// Identifier buffer from the last identifier pass
    pub fn identifier_buffer(&self) -> Option<&IdentifierBuffer> {
        self.picker.buffer()
    }

    /// Install an identifier buffer rendered outside [`Graph::render_identifiers`]
    pub fn set_identifier_buffer(&mut self, buffer: Option<IdentifierBuffer>) {
        self.picker.set_buffer(buffer);
    }

    /// Identifier buffer matching the current viewport size
    fn current_identifier_buffer(&self) -> Option<&IdentifierBuffer> {
        let (width, height) = self.matrices.viewport();
        self.picker
            .buffer()
            .filter(|buffer| buffer.width() == width && buffer.height() == height)
    }

    /// Default square size in pixels for bound frames
    pub fn default_pick_threshold(&self) -> f32 {
        self.picker.bound_threshold
    }

    /// Set the default square size in pixels for bound frames
    pub fn set_default_pick_threshold(&mut self, threshold: f32) {
        self.picker.bound_threshold = threshold.abs();
    }

    /// Set the default square size in world units for adaptive frames
    pub fn set_default_adaptive_threshold(&mut self, threshold: f32) {
        self.picker.adaptive_threshold = threshold.abs();
    }

    /// Whether the frame lies under the screen position `(x, y)`
    ///
    /// Always `false` for the eye frame and for unknown frames. Exact frames
    /// need an identifier buffer; without one a warning is logged once.
    pub fn track(&mut self, id: FrameId, x: f32, y: f32) -> bool {
        if id == self.eye.frame {
            self.warnings.only_eye_warning("track", false);
            return false;
        }
        let Some(frame) = self.frames.get(id) else {
            return false;
        };
        let precision = frame.precision();
        let threshold = self.picker.threshold_for(precision, frame.pick_threshold());

        if precision == Precision::Exact {
            let pick_id = frame.pick_id;
            return match self.current_identifier_buffer() {
                Some(buffer) => buffer.decode(x, y) == Some(pick_id),
                None => {
                    self.warnings.warn_once(
                        "Exact picking needs an identifier buffer; call render_identifiers() with a backend that supports it",
                    );
                    false
                }
            };
        }

        let Some(origin) = self.world_position(id) else {
            return false;
        };
        let Some(center) = self.projected_coordinates_of(&origin) else {
            return false;
        };
        if !(0.0..=1.0).contains(&center.z) {
            return false;
        }
        let size = match precision {
            Precision::Adaptive => self.projected_size(id, &origin, &center, threshold),
            Precision::Bound | Precision::Exact => threshold,
        };
        in_square(&Point3::from(center), size, x, y)
    }

    /// Pixel length of a world length `threshold` scaled by the frame's
    /// magnitude, measured at the frame's depth
    fn projected_size(&self, id: FrameId, origin: &Point3, center: &Vec3, threshold: f32) -> f32 {
        let magnitude = self.world_transform(id).map_or(1.0, |world| world.magnitude());
        let right = self
            .world_transform(self.eye.frame)
            .map_or(Vec3::x(), |eye| eye.rotation() * Vec3::x());
        let edge = origin + right * threshold * magnitude;
        self.projected_coordinates_of(&edge)
            .map_or(0.0, |projected| (projected.xy() - center.xy()).norm())
    }

    /// Frame under the screen position `(x, y)`, if any
    ///
    /// Exact frames are resolved from the identifier buffer first. Otherwise
    /// pickable frames are tried in reverse traversal order, so frames drawn
    /// last win.
    pub fn cast(&mut self, x: f32, y: f32) -> Option<FrameId> {
        let exact = self
            .current_identifier_buffer()
            .and_then(|buffer| buffer.decode(x, y))
            .and_then(|pick_id| self.frame_by_pick_id(pick_id))
            .filter(|&id| {
                self.is_pickable(id)
                    && self.is_reachable(id)
                    && self.frames.get(id).is_some_and(|frame| frame.precision() == Precision::Exact)
            });
        if exact.is_some() {
            return exact;
        }

        let order = self.frames(false);
        order.into_iter().rev().find(|&id| {
            self.is_pickable(id)
                && self.frames.get(id).is_some_and(|frame| frame.precision() != Precision::Exact)
                && self.track(id, x, y)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GraphConfig;
    use crate::scene::Frame;

    #[test]
    fn test_id_color_channels() {
        let color = IdColor::from_id(0x0012_3456).unwrap();
        assert_eq!((color.r, color.g, color.b), (0x56, 0x34, 0x12));
        assert_eq!(color.to_argb(), 0xFF12_3456);
        assert_eq!(IdColor::from_argb(color.to_argb()), Some(color));
        assert!(IdColor::from_id(IdColor::MAX_ID + 1).is_none());
    }

    #[test]
    fn test_translucent_pixels_decode_to_nothing() {
        assert!(IdColor::from_argb(0x0012_3456).is_none());
        let buffer = IdentifierBuffer::from_pixels(1, 1, vec![0x8012_3456]).unwrap();
        assert_eq!(buffer.decode(0.0, 0.0), None);
    }

    #[test]
    fn test_buffer_bounds() {
        let mut buffer = IdentifierBuffer::new(4, 3);
        buffer.set_pixel(3.0, 2.0, IdColor::from_id(7).unwrap().to_argb());
        assert_eq!(buffer.decode(3.5, 2.5), Some(7));
        assert_eq!(buffer.decode(4.0, 2.0), None);
        assert_eq!(buffer.decode(-1.0, 2.0), None);
        assert_eq!(buffer.decode(0.0, 3.0), None);
        assert_eq!(buffer.decode(0.0, 0.0), None);
        assert!(IdentifierBuffer::from_pixels(2, 2, vec![0; 3]).is_none());
    }

    #[test]
    fn test_fill_rect_is_clipped() {
        let mut buffer = IdentifierBuffer::new(4, 4);
        buffer.fill_rect(-2.0, -2.0, 2.0, 2.0, 0xFF00_0001);
        assert_eq!(buffer.decode(1.0, 1.0), Some(1));
        assert_eq!(buffer.decode(2.0, 2.0), None);
    }

    #[test]
    fn test_bound_track_around_projected_origin() {
        let mut graph = Graph::new(&GraphConfig::new(800, 600)).unwrap();
        let id = graph.spawn(Frame::new().with_pick_threshold(10.0)).unwrap();
        let center = graph.projected_coordinates_of(&Point3::origin()).unwrap();
        assert!(graph.track(id, center.x + 4.0, center.y - 4.0));
        assert!(!graph.track(id, center.x + 6.0, center.y));
    }

    #[test]
    fn test_eye_frame_never_tracks() {
        let mut graph = Graph::new(&GraphConfig::default()).unwrap();
        let eye = graph.eye_frame();
        assert!(!graph.track(eye, 400.0, 300.0));
        assert_eq!(graph.warnings().emitted_count(), 1);
    }

    #[test]
    fn test_exact_without_buffer_warns_once() {
        let mut graph = Graph::new(&GraphConfig::default()).unwrap();
        let id = graph.spawn(Frame::new().with_precision(Precision::Exact)).unwrap();
        assert!(!graph.track(id, 400.0, 300.0));
        assert!(!graph.track(id, 400.0, 300.0));
        assert_eq!(graph.warnings().emitted_count(), 1);
    }

    #[test]
    fn test_cast_prefers_last_drawn() {
        let mut graph = Graph::new(&GraphConfig::new(800, 600)).unwrap();
        let first = graph.spawn(Frame::new()).unwrap();
        let second = graph.spawn(Frame::new()).unwrap();
        let center = graph.projected_coordinates_of(&Point3::origin()).unwrap();
        assert_eq!(graph.cast(center.x, center.y), Some(second));
        graph.unregister_pickable(second);
        assert_eq!(graph.cast(center.x, center.y), Some(first));
    }

    #[test]
    fn test_adaptive_shrinks_with_distance() {
        let mut graph = Graph::new(&GraphConfig::new(800, 600)).unwrap();
        let near = graph
            .spawn(Frame::new().with_precision(Precision::Adaptive).with_pick_threshold(20.0))
            .unwrap();
        let far = graph
            .spawn(
                Frame::new()
                    .with_precision(Precision::Adaptive)
                    .with_pick_threshold(20.0)
                    .with_translation(Vec3::new(0.0, 0.0, -150.0)),
            )
            .unwrap();
        let near_center = graph.projected_coordinates_of(&Point3::origin()).unwrap();
        let far_center = graph
            .projected_coordinates_of(&Point3::new(0.0, 0.0, -150.0))
            .unwrap();
        let near_size = graph.projected_size(near, &Point3::origin(), &near_center, 20.0);
        let far_size = graph.projected_size(far, &Point3::new(0.0, 0.0, -150.0), &far_center, 20.0);
        assert!(near_size > far_size);
        assert!(far_size > 0.0);
    }
}
