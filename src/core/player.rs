//! Player pose and kinematics.
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use rand::Rng;

use crate::core::maze::TileMap;

/// How close to a wall a player can get before colliding.
pub const PLAYER_RADIUS: f32 = 0.1;
/// Per-tick velocity decay.
pub const DAMPING: f32 = 0.85;
/// Speed cap per axis when moving along a single axis.
pub const MAX_SPEED: f32 = 0.2;
/// Speed cap per axis when walking and strafing together (keeps the diagonal at `MAX_SPEED`).
pub const MAX_DIAGONAL_SPEED: f32 = 0.141_421_4;

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub id: u8,
    pub x: f32,
    pub y: f32,
    /// Yaw in radians, kept in `(-π, π]`.
    pub angle: f32,
    pub walk: f32,
    pub strafe: f32,
    pub walk_acceleration: f32,
    pub strafe_acceleration: f32,
    pub sprite_index: usize,
    pub name: String,
}

impl Player {
    pub fn new(id: u8, x: f32, y: f32, angle: f32) -> Self {
        Self {
            id,
            x,
            y,
            angle: normalize_angle(angle),
            walk: 0.0,
            strafe: 0.0,
            walk_acceleration: 0.0,
            strafe_acceleration: 0.0,
            sprite_index: id as usize,
            name: format!("player{id}"),
        }
    }

    pub fn update_angle(&mut self, delta: f32) {
        self.angle = normalize_angle(self.angle + delta);
    }

    /// Integrates one tick of movement. X and Y are resolved separately so that a
    /// blocked axis does not stop motion along the other one (wall sliding).
    pub fn update_position(&mut self, map: &TileMap) {
        let max_speed = if self.walk_acceleration != 0.0 && self.strafe_acceleration != 0.0 {
            MAX_DIAGONAL_SPEED
        } else {
            MAX_SPEED
        };
        self.walk = (self.walk * DAMPING + self.walk_acceleration).clamp(-max_speed, max_speed);
        self.strafe =
            (self.strafe * DAMPING + self.strafe_acceleration).clamp(-max_speed, max_speed);

        let tile_x = self.x.floor() as i32;
        let tile_y = self.y.floor() as i32;

        let new_x = self.x
            + self.strafe * (self.angle + FRAC_PI_2).cos()
            + self.walk * self.angle.cos();
        let edge_x = if new_x > self.x {
            new_x + PLAYER_RADIUS
        } else {
            new_x - PLAYER_RADIUS
        };
        if map.is_empty(edge_x.floor() as i32, tile_y) {
            self.x = new_x;
        } else if new_x > self.x {
            self.x = new_x.round() - PLAYER_RADIUS;
        } else {
            self.x = new_x.round() + PLAYER_RADIUS;
        }

        let new_y = self.y
            + self.strafe * (self.angle + FRAC_PI_2).sin()
            + self.walk * self.angle.sin();
        let edge_y = if new_y > self.y {
            new_y + PLAYER_RADIUS
        } else {
            new_y - PLAYER_RADIUS
        };
        if map.is_empty(tile_x, edge_y.floor() as i32) {
            self.y = new_y;
        } else if new_y > self.y {
            self.y = new_y.round() - PLAYER_RADIUS;
        } else {
            self.y = new_y.round() + PLAYER_RADIUS;
        }
    }

    /// Moves to the centre of a random open tile with a random facing.
    pub fn random_spawn<R: Rng + ?Sized>(&mut self, map: &TileMap, rng: &mut R) {
        if map.open_cells() == 0 {
            return;
        }
        loop {
            let x = rng.gen_range(0..map.width()) as i32;
            let y = rng.gen_range(0..map.height()) as i32;
            if map.is_empty(x, y) {
                self.x = x as f32 + 0.5;
                self.y = y as f32 + 0.5;
                self.angle = normalize_angle(rng.gen_range(-PI..PI));
                self.walk = 0.0;
                self.strafe = 0.0;
                return;
            }
        }
    }

    #[inline]
    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        dist2(self.x, self.y, x, y)
    }
}

/// Wraps an angle into `(-π, π]`.
#[inline]
pub fn normalize_angle(mut a: f32) -> f32 {
    if !a.is_finite() {
        return 0.0;
    }
    while a > PI {
        a -= TAU;
    }
    while a <= -PI {
        a += TAU;
    }
    a
}

#[inline]
pub fn dist2(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    ((ax - bx) * (ax - bx) + (ay - by) * (ay - by)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn room() -> TileMap {
        TileMap::parse("11111\n1   1\n1   1\n1   1\n11111").unwrap()
    }

    #[test]
    fn angle_wraps_into_half_open_range() {
        assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-5);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-5);
        assert!((normalize_angle(-3.0 * FRAC_PI_2) - FRAC_PI_2).abs() < 1e-5);
        assert_eq!(normalize_angle(f32::NAN), 0.0);

        let mut p = Player::new(0, 1.5, 1.5, 0.0);
        p.update_angle(PI + 0.5);
        assert!(p.angle > -PI && p.angle <= PI);
    }

    #[test]
    fn walking_into_a_wall_stops_at_the_radius() {
        let map = room();
        let mut p = Player::new(0, 3.5, 2.5, 0.0);
        p.walk_acceleration = 0.1;
        for _ in 0..60 {
            p.update_position(&map);
        }
        assert!(p.x <= 4.0 - PLAYER_RADIUS + 1e-4, "x = {}", p.x);
        assert!(p.x > 3.5);
        assert!((p.y - 2.5).abs() < 1e-4);
    }

    #[test]
    fn blocked_axis_still_slides_along_the_other() {
        let map = room();
        // Facing diagonally into the east wall: x is blocked, y keeps moving.
        let mut p = Player::new(0, 3.85, 1.5, PI / 4.0);
        p.walk_acceleration = 0.05;
        let start_y = p.y;
        for _ in 0..5 {
            p.update_position(&map);
        }
        assert!(p.x < 4.0);
        assert!(p.y > start_y);
    }

    #[test]
    fn speed_is_capped() {
        let map = room();
        let mut p = Player::new(0, 2.5, 2.5, 0.0);
        p.walk_acceleration = 1.0;
        p.update_position(&map);
        assert_eq!(p.walk, MAX_SPEED);
        p.strafe_acceleration = 1.0;
        p.update_position(&map);
        assert_eq!(p.walk, MAX_DIAGONAL_SPEED);
        assert_eq!(p.strafe, MAX_DIAGONAL_SPEED);
    }

    #[test]
    fn spawn_lands_on_an_open_tile_centre() {
        let map = room();
        let mut rng = StdRng::seed_from_u64(7);
        let mut p = Player::new(0, 0.0, 0.0, 0.0);
        for _ in 0..20 {
            p.random_spawn(&map, &mut rng);
            assert!(map.is_empty(p.x as i32, p.y as i32));
            assert_eq!(p.x.fract(), 0.5);
            assert!(p.angle > -PI && p.angle <= PI);
        }
    }
}
