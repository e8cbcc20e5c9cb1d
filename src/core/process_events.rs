//! Keyboard and mouse state turned into player motion.
use crate::core::player::Player;

/// Acceleration added per tick while a movement key is held.
pub const WALK_ACCELERATION: f32 = 0.02;
/// Radians per tick while a turn key is held.
pub const TURN_SPEED: f32 = 0.05;

/// One frame of input, sampled by the window layer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    /// Horizontal mouse motion in pixels since the last frame.
    pub mouse_dx: f32,
    pub shoot: bool,
}

fn axis(positive: bool, negative: bool) -> f32 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

/// Sets the player's accelerations and turns it. Opposite keys cancel out.
pub fn apply_input(player: &mut Player, input: &InputState, mouse_sensitivity: f32) {
    player.walk_acceleration = axis(input.forward, input.backward) * WALK_ACCELERATION;
    player.strafe_acceleration = axis(input.strafe_right, input.strafe_left) * WALK_ACCELERATION;

    let turn = axis(input.turn_right, input.turn_left) * TURN_SPEED;
    let delta = turn + input.mouse_dx * mouse_sensitivity;
    if delta != 0.0 {
        player.update_angle(delta);
    }
}

/// Stops any acceleration, e.g. while the console has the keyboard.
pub fn release(player: &mut Player) {
    player.walk_acceleration = 0.0;
    player.strafe_acceleration = 0.0;
}

/// Samples WASD, the arrow keys, the mouse and the left button.
#[cfg(feature = "desktop")]
pub fn read_input(window: &raylib::RaylibHandle) -> InputState {
    use raylib::prelude::{KeyboardKey, MouseButton};

    let down = |k| window.is_key_down(k);
    InputState {
        forward: down(KeyboardKey::KEY_W) || down(KeyboardKey::KEY_UP),
        backward: down(KeyboardKey::KEY_S) || down(KeyboardKey::KEY_DOWN),
        strafe_left: down(KeyboardKey::KEY_A),
        strafe_right: down(KeyboardKey::KEY_D),
        turn_left: down(KeyboardKey::KEY_LEFT),
        turn_right: down(KeyboardKey::KEY_RIGHT),
        mouse_dx: window.get_mouse_delta().x,
        shoot: window.is_mouse_button_pressed(MouseButton::MOUSE_BUTTON_LEFT)
            || window.is_key_pressed(KeyboardKey::KEY_SPACE),
    }
}
