//! Software renderer writing RGBA8 frames, plus a headless no-op.

use crate::error::RenderError;
use crate::evaluator::{Renderer, Snapshot};
use crate::mask::Mask;

pub type Rgba = (u8, u8, u8, u8);

const SKY_TOP: Rgba = (70, 180, 200, 255);
const SKY_BOTTOM: Rgba = (190, 232, 245, 255);
const PIPE: Rgba = (100, 170, 40, 255);
const GRASS: Rgba = (84, 168, 55, 255);
const DIRT: Rgba = (210, 185, 110, 255);
const DIRT_DARK: Rgba = (185, 160, 90, 255);
const ACTOR: Rgba = (245, 200, 66, 255);
const GUIDE: Rgba = (255, 0, 0, 200);
const GRASS_DEPTH: i32 = 12;

/// Renders nothing; for headless evaluation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn present(&mut self, _snapshot: &Snapshot<'_>) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Draws a snapshot into a borrowed `width * height * 4` RGBA buffer,
/// e.g. the frame of a `pixels` surface.
pub struct FrameRenderer<'f> {
    frame: &'f mut [u8],
    width: u32,
    height: u32,
    draw_lines: bool,
}

impl<'f> FrameRenderer<'f> {
    pub fn new(frame: &'f mut [u8], width: u32, height: u32, draw_lines: bool) -> Self {
        Self { frame, width, height, draw_lines }
    }

    fn clear_sky(&mut self) {
        let rows = self.height.max(1);
        for y in 0..self.height {
            let t = (y * 256 / rows) as u16;
            let c = lerp(SKY_TOP, SKY_BOTTOM, t);
            let start = (y * self.width * 4) as usize;
            let end = start + (self.width * 4) as usize;
            for px in self.frame[start..end].chunks_exact_mut(4) {
                px.copy_from_slice(&[c.0, c.1, c.2, c.3]);
            }
        }
    }

    fn blend_pixel(&mut self, x: i32, y: i32, col: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        let a = col.3 as u16;
        let ia = 255 - a;
        let px = &mut self.frame[idx..idx + 4];
        px[0] = ((col.0 as u16 * a + px[0] as u16 * ia) / 255) as u8;
        px[1] = ((col.1 as u16 * a + px[1] as u16 * ia) / 255) as u8;
        px[2] = ((col.2 as u16 * a + px[2] as u16 * ia) / 255) as u8;
        px[3] = 255;
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, col: Rgba) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.width as i32);
        let y1 = (y + h).min(self.height as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, col);
            }
        }
    }

    fn blit_mask(&mut self, mask: &Mask, x: i32, y: i32, col: Rgba) {
        for my in 0..mask.height() {
            let py = y + my as i32;
            if py < 0 || py >= self.height as i32 {
                continue;
            }
            for mx in 0..mask.width() {
                if mask.get(mx, my) {
                    self.blend_pixel(x + mx as i32, py, col);
                }
            }
        }
    }

    fn line(&mut self, from: (i32, i32), to: (i32, i32), col: Rgba) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.blend_pixel(x, y, col);
            if (x, y) == to {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn draw_ground(&mut self, snapshot: &Snapshot<'_>) {
        let ground = snapshot.ground;
        let top = ground.y.round() as i32;
        let tile = ground.tile_width().round() as i32;
        let depth = self.height as i32 - top;
        for (i, x) in [ground.x1, ground.x2].into_iter().enumerate() {
            let x = x.round() as i32;
            let dirt = if i == 0 { DIRT } else { DIRT_DARK };
            self.fill_rect(x, top, tile, depth, dirt);
            self.fill_rect(x, top, tile, GRASS_DEPTH, GRASS);
        }
    }
}

impl Renderer for FrameRenderer<'_> {
    fn present(&mut self, snapshot: &Snapshot<'_>) -> Result<(), RenderError> {
        let expected = (self.width * self.height * 4) as usize;
        if self.frame.len() != expected {
            return Err(RenderError::FrameSize { expected, actual: self.frame.len() });
        }

        self.clear_sky();

        let sprites = snapshot.sprites;
        for obstacle in snapshot.obstacles {
            for (mask, (x, y)) in obstacle.segments(sprites) {
                self.blit_mask(mask, x, y, PIPE);
            }
        }

        self.draw_ground(snapshot);

        let guide = if self.draw_lines {
            snapshot.active.and_then(|i| snapshot.obstacles.get(i))
        } else {
            None
        };

        for actor in snapshot.actors {
            let mask = actor.mask(sprites);
            let (x, y) = actor.pixel_pos();
            let centre = (x + mask.width() as i32 / 2, y + mask.height() as i32 / 2);

            if let Some(obstacle) = guide {
                let mid = obstacle.x.round() as i32 + sprites.segment_width() as i32 / 2;
                self.line(centre, (mid, obstacle.gap_top()), GUIDE);
                self.line(centre, (mid, obstacle.gap_bottom()), GUIDE);
            }

            let turned = mask.rotated(actor.tilt);
            let left = centre.0 - turned.width() as i32 / 2;
            let top = centre.1 - turned.height() as i32 / 2;
            self.blit_mask(&turned, left, top, ACTOR);
        }
        Ok(())
    }
}

fn lerp(a: Rgba, b: Rgba, t_256: u16) -> Rgba {
    let t = t_256 as i32;
    let mix = |a: u8, b: u8| (a as i32 + (b as i32 - a as i32) * t / 256) as u8;
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2), mix(a.3, b.3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::config::SpriteConfig;
    use crate::mask::Sprites;
    use crate::obstacle::Obstacle;
    use crate::scroller::Scroller;

    const W: u32 = 600;
    const H: u32 = 800;

    fn pixel(frame: &[u8], x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * W + x) * 4) as usize;
        [frame[idx], frame[idx + 1], frame[idx + 2], frame[idx + 3]]
    }

    fn snapshot<'a>(
        actors: &'a [Actor],
        obstacles: &'a [Obstacle],
        ground: &'a Scroller,
        sprites: &'a Sprites,
    ) -> Snapshot<'a> {
        Snapshot {
            actors,
            obstacles,
            ground,
            sprites,
            active: Some(0),
            score: 0,
            live: actors.len(),
            generation: 1,
            tick: 1,
        }
    }

    #[test]
    fn draws_actor_pipe_and_ground() {
        let sprites = Sprites::procedural(&SpriteConfig::default());
        let actors = [Actor::new(230.0, 350.0)];
        let obstacles = [Obstacle::with_gap_top(400.0, 250, 200, 640)];
        let ground = Scroller::new(730.0, 672);
        let mut frame = vec![0u8; (W * H * 4) as usize];

        FrameRenderer::new(&mut frame, W, H, true)
            .present(&snapshot(&actors, &obstacles, &ground, &sprites))
            .unwrap();

        // Actor body centre, untilted.
        assert_eq!(pixel(&frame, 230 + 30, 350 + 24), [245, 200, 66, 255]);
        // Middle of the bottom segment's body.
        assert_eq!(pixel(&frame, 452, 600), [100, 170, 40, 255]);
        // Grass strip on the ground.
        assert_eq!(pixel(&frame, 10, 732), [84, 168, 55, 255]);
        // Sky above everything.
        assert_eq!(pixel(&frame, 10, 10)[3], 255);
    }

    #[test]
    fn wrong_frame_size_is_reported() {
        let sprites = Sprites::procedural(&SpriteConfig::default());
        let ground = Scroller::new(730.0, 672);
        let mut frame = vec![0u8; 16];
        let err = FrameRenderer::new(&mut frame, W, H, false)
            .present(&snapshot(&[], &[], &ground, &sprites))
            .unwrap_err();
        assert!(matches!(err, RenderError::FrameSize { actual: 16, .. }));
    }

    #[test]
    fn guide_lines_skip_missing_obstacle() {
        let sprites = Sprites::procedural(&SpriteConfig::default());
        let actors = [Actor::new(230.0, 350.0)];
        let ground = Scroller::new(730.0, 672);
        let mut frame = vec![0u8; (W * H * 4) as usize];
        // Active index points past the end: drawing must still succeed.
        FrameRenderer::new(&mut frame, W, H, true)
            .present(&snapshot(&actors, &[], &ground, &sprites))
            .unwrap();
    }
}
