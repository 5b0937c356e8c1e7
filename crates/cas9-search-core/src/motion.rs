use crate::constants::DIRECTIONS;
use rand::Rng;

/// Rectangular arena with reflecting walls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arena {
    pub width: f64,
    pub height: f64,
}

impl Arena {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Advance `position` by `direction * step`. A disc that would cross a wall
    /// is clamped against it and the matching heading component is flipped.
    pub fn reflect_step(
        &self,
        position: [f64; 2],
        direction: [f64; 2],
        radius: f64,
        step: f64,
    ) -> ([f64; 2], [f64; 2]) {
        let next_x = position[0] + direction[0] * step;
        let next_y = position[1] + direction[1] * step;
        let (x, dx) = reflect_axis(next_x, direction[0], radius, self.width);
        let (y, dy) = reflect_axis(next_y, direction[1], radius, self.height);
        ([x, y], [dx, dy])
    }

    /// Whether a disc of `radius` centred at `position` lies fully inside.
    pub fn contains(&self, position: [f64; 2], radius: f64) -> bool {
        position[0] >= radius
            && position[0] <= self.width - radius
            && position[1] >= radius
            && position[1] <= self.height - radius
    }

    /// Uniform position for a disc of `radius` fully inside the arena.
    pub fn random_position<R: Rng + ?Sized>(&self, radius: f64, rng: &mut R) -> [f64; 2] {
        [
            rng.random_range(radius..=self.width - radius),
            rng.random_range(radius..=self.height - radius),
        ]
    }
}

fn reflect_axis(next: f64, heading: f64, radius: f64, extent: f64) -> (f64, f64) {
    if next < radius {
        (radius, -heading)
    } else if next > extent - radius {
        (extent - radius, -heading)
    } else {
        (next, heading)
    }
}

/// One of the eight headings, uniformly.
pub fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> [f64; 2] {
    DIRECTIONS[rng.random_range(0..DIRECTIONS.len())]
}

/// With probability `p`, replace `direction` by a fresh uniform heading.
pub fn maybe_turn<R: Rng + ?Sized>(direction: &mut [f64; 2], p: f64, rng: &mut R) {
    if rng.random::<f64>() < p {
        *direction = random_direction(rng);
    }
}

pub fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}
