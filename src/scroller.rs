/// Two ground tiles laid end to end; whichever leaves the left edge jumps
/// behind the other.
#[derive(Clone, Debug, PartialEq)]
pub struct Scroller {
    pub y: f32,
    pub x1: f32,
    pub x2: f32,
    tile_width: f32,
}

impl Scroller {
    pub fn new(y: f32, tile_width: u32) -> Self {
        let tile_width = tile_width as f32;
        Self { y, x1: 0.0, x2: tile_width, tile_width }
    }

    pub fn advance(&mut self, velocity: f32) {
        self.x1 -= velocity;
        self.x2 -= velocity;
        if self.x1 + self.tile_width < 0.0 {
            self.x1 = self.x2 + self.tile_width;
        }
        if self.x2 + self.tile_width < 0.0 {
            self.x2 = self.x1 + self.tile_width;
        }
    }

    pub fn tile_width(&self) -> f32 {
        self.tile_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_stay_one_width_apart() {
        let mut ground = Scroller::new(730.0, 672);
        for _ in 0..1000 {
            ground.advance(5.0);
            assert_eq!((ground.x1 - ground.x2).abs(), 672.0);
            assert!(ground.x1.min(ground.x2) >= -672.0);
        }
    }

    #[test]
    fn wraps_first_tile_behind_second() {
        let mut ground = Scroller::new(730.0, 10);
        ground.advance(11.0);
        assert_eq!(ground.x2, -1.0);
        assert_eq!(ground.x1, 9.0);
    }
}
