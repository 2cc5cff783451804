//! Per-pixel opacity masks and the silhouettes the simulation collides with.

use crate::config::SpriteConfig;

/// Row-major opacity bitmap. A set bit is an opaque pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<u64>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize * height as usize).div_ceil(64);
        Self { width, height, bits: vec![0; len] }
    }

    pub fn filled(width: u32, height: u32) -> Self {
        Self::from_fn(width, height, |_, _| true)
    }

    pub fn from_fn(width: u32, height: u32, mut opaque: impl FnMut(u32, u32) -> bool) -> Self {
        let mut mask = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if opaque(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    /// Builds a mask from decoded RGBA8 pixels; alpha above `threshold` is opaque.
    /// Returns `None` when `rgba` does not hold exactly `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8], threshold: u8) -> Option<Self> {
        if rgba.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self::from_fn(width, height, |x, y| {
            let idx = (y as usize * width as usize + x as usize) * 4;
            rgba[idx + 3] > threshold
        }))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.width as usize + x as usize;
        (self.bits[idx / 64] >> (idx % 64)) & 1 == 1
    }

    pub fn set(&mut self, x: u32, y: u32, opaque: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        if opaque {
            self.bits[idx / 64] |= 1 << (idx % 64);
        } else {
            self.bits[idx / 64] &= !(1 << (idx % 64));
        }
    }

    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn flipped_vertical(&self) -> Self {
        Self::from_fn(self.width, self.height, |x, y| self.get(x, self.height - 1 - y))
    }

    /// First opaque pixel shared with `other` placed at `offset` relative to
    /// this mask's origin, in this mask's coordinates.
    pub fn overlap(&self, other: &Mask, offset: (i32, i32)) -> Option<(i32, i32)> {
        let (ox, oy) = (offset.0 as i64, offset.1 as i64);
        let x0 = ox.max(0);
        let y0 = oy.max(0);
        let x1 = (ox + other.width as i64).min(self.width as i64);
        let y1 = (oy + other.height as i64).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        for y in y0..y1 {
            for x in x0..x1 {
                if self.get(x as u32, y as u32) && other.get((x - ox) as u32, (y - oy) as u32) {
                    return Some((x as i32, y as i32));
                }
            }
        }
        None
    }

    pub fn overlaps(&self, other: &Mask, offset: (i32, i32)) -> bool {
        self.overlap(other, offset).is_some()
    }

    /// Rotates counter-clockwise (as seen on screen) about the centre, growing
    /// the bounds to fit. Nearest-neighbour sampling.
    pub fn rotated(&self, degrees: f32) -> Mask {
        let (s, c) = degrees.to_radians().sin_cos();
        let (w, h) = (self.width as f32, self.height as f32);
        let new_w = ((w * c.abs() + h * s.abs()) - 1e-3).ceil().max(1.0) as u32;
        let new_h = ((w * s.abs() + h * c.abs()) - 1e-3).ceil().max(1.0) as u32;
        let (half_nw, half_nh) = (new_w as f32 / 2.0, new_h as f32 / 2.0);
        Mask::from_fn(new_w, new_h, |dx, dy| {
            let x = dx as f32 + 0.5 - half_nw;
            let y = dy as f32 + 0.5 - half_nh;
            let sx = x * c - y * s + w / 2.0;
            let sy = x * s + y * c + h / 2.0;
            sx >= 0.0 && sy >= 0.0 && self.get(sx.floor() as u32, sy.floor() as u32)
        })
    }
}

/// Collision silhouettes shared by every actor and obstacle of an episode.
#[derive(Clone, Debug)]
pub struct Sprites {
    pub actor_frames: [Mask; 3],
    /// Bottom segment, opening upwards.
    pub segment_bottom: Mask,
    /// Top segment, the bottom one flipped.
    pub segment_top: Mask,
    pub ground_width: u32,
}

impl Sprites {
    pub fn from_masks(actor_frames: [Mask; 3], segment: Mask, ground_width: u32) -> Self {
        let segment_top = segment.flipped_vertical();
        Self {
            actor_frames,
            segment_bottom: segment,
            segment_top,
            ground_width,
        }
    }

    /// Silhouettes generated from dimensions alone: an oval body with a beak
    /// and a wing in three positions, and a capped pipe segment.
    pub fn procedural(config: &SpriteConfig) -> Self {
        let frames = [0.32, 0.5, 0.68].map(|wing_y| actor_frame(config, wing_y));
        Self::from_masks(frames, segment(config), config.ground_width)
    }

    pub fn segment_width(&self) -> u32 {
        self.segment_bottom.width()
    }

    pub fn segment_height(&self) -> u32 {
        self.segment_bottom.height()
    }
}

fn inside_ellipse(x: f32, y: f32, cx: f32, cy: f32, rx: f32, ry: f32) -> bool {
    let dx = (x - cx) / rx;
    let dy = (y - cy) / ry;
    dx * dx + dy * dy <= 1.0
}

fn actor_frame(config: &SpriteConfig, wing_y: f32) -> Mask {
    let (w, h) = (config.actor_width as f32, config.actor_height as f32);
    Mask::from_fn(config.actor_width, config.actor_height, |x, y| {
        let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
        let body = inside_ellipse(px, py, w * 0.45, h * 0.5, w * 0.4, h * 0.42);
        let wing = inside_ellipse(px, py, w * 0.3, h * wing_y, w * 0.2, h * 0.18);
        let beak = px >= w * 0.75 && py >= h * 0.45 && py < h * 0.65;
        body || wing || beak
    })
}

fn segment(config: &SpriteConfig) -> Mask {
    let cap = ((config.segment_height as f32 * 0.08).round() as u32).min(config.segment_height);
    let inset = (config.segment_width as f32 * 0.04).round() as u32;
    Mask::from_fn(config.segment_width, config.segment_height, |x, y| {
        y < cap || (x >= inset && x + inset < config.segment_width)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_pixel_exact_not_bounding_box() {
        // Two diagonals sharing a bounding box but no pixel.
        let a = Mask::from_fn(4, 4, |x, y| x == y);
        let b = Mask::from_fn(4, 4, |x, y| x + y == 3);
        assert!(!a.overlaps(&b, (0, 0)));
        let c = Mask::from_fn(4, 4, |x, y| x == 3 - y || x == y);
        assert_eq!(a.overlap(&c, (0, 0)), Some((0, 0)));
    }

    #[test]
    fn overlap_respects_offset() {
        let a = Mask::filled(10, 10);
        let b = Mask::filled(5, 5);
        assert!(a.overlaps(&b, (9, 9)));
        assert!(!a.overlaps(&b, (10, 0)));
        assert!(!a.overlaps(&b, (-5, 0)));
        assert_eq!(a.overlap(&b, (-4, -4)), Some((0, 0)));
    }

    #[test]
    fn rgba_alpha_threshold() {
        let rgba = [0, 0, 0, 255, 0, 0, 0, 127, 0, 0, 0, 128, 0, 0, 0, 0];
        let mask = Mask::from_rgba(2, 2, &rgba, 127).unwrap();
        assert!(mask.get(0, 0));
        assert!(!mask.get(1, 0));
        assert!(mask.get(0, 1));
        assert!(!mask.get(1, 1));
        assert!(Mask::from_rgba(3, 2, &rgba, 127).is_none());
    }

    #[test]
    fn rotation_swaps_bounds_at_right_angle() {
        let mask = Mask::filled(8, 4);
        let turned = mask.rotated(90.0);
        assert_eq!((turned.width(), turned.height()), (4, 8));
        assert_eq!(turned.count(), 32);
        assert_eq!(mask.rotated(0.0), mask);
    }

    #[test]
    fn procedural_sprites_have_configured_size() {
        let config = SpriteConfig::default();
        let sprites = Sprites::procedural(&config);
        for frame in &sprites.actor_frames {
            assert_eq!((frame.width(), frame.height()), (68, 48));
            assert!(frame.count() > 0);
        }
        assert_eq!(sprites.segment_width(), 104);
        assert_eq!(sprites.segment_height(), 640);
        // Cap spans the full width at the opening.
        assert!(sprites.segment_bottom.get(0, 0));
        assert!(sprites.segment_top.get(0, 639));
        assert!(!sprites.segment_bottom.get(0, 300));
    }
}
