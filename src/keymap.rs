//! Key tables for the keyboard test harness.
//!
//! Presses and releases are looked up in two separate tables. Movement and
//! wheel keys fire once per press; button keys hold the button down until
//! the matching release.

use std::collections::HashMap;
use std::fmt;

use crate::command::{Command, MouseButton};
use crate::constants::MOVE_STEP;
use crate::error::{KmError, KmResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BenchKey {
    W,
    A,
    S,
    D,
    Z,
    X,
    C,
    V,
    B,
    N,
    M,
    G,
}

impl BenchKey {
    pub fn from_rdev(key: rdev::Key) -> Option<Self> {
        Some(match key {
            rdev::Key::KeyW => BenchKey::W,
            rdev::Key::KeyA => BenchKey::A,
            rdev::Key::KeyS => BenchKey::S,
            rdev::Key::KeyD => BenchKey::D,
            rdev::Key::KeyZ => BenchKey::Z,
            rdev::Key::KeyX => BenchKey::X,
            rdev::Key::KeyC => BenchKey::C,
            rdev::Key::KeyV => BenchKey::V,
            rdev::Key::KeyB => BenchKey::B,
            rdev::Key::KeyN => BenchKey::N,
            rdev::Key::KeyM => BenchKey::M,
            rdev::Key::KeyG => BenchKey::G,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            BenchKey::W => "w",
            BenchKey::A => "a",
            BenchKey::S => "s",
            BenchKey::D => "d",
            BenchKey::Z => "z",
            BenchKey::X => "x",
            BenchKey::C => "c",
            BenchKey::V => "v",
            BenchKey::B => "b",
            BenchKey::N => "n",
            BenchKey::M => "m",
            BenchKey::G => "g",
        }
    }
}

impl fmt::Display for BenchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Down,
    Up,
}

/// Screen direction; y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn delta(&self, step: i32) -> (i32, i32) {
        match self {
            Direction::Up => (0, -step),
            Direction::Down => (0, step),
            Direction::Left => (-step, 0),
            Direction::Right => (step, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressAction {
    Move(Direction),
    ButtonDown(MouseButton),
    Wheel(i32),
    GetPos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseAction {
    ButtonUp(MouseButton),
}

#[derive(Debug, Clone)]
pub struct KeyMap {
    press: HashMap<BenchKey, PressAction>,
    release: HashMap<BenchKey, ReleaseAction>,
    step: i32,
}

impl KeyMap {
    /// WASD moves, Z X C V B are the five buttons, N and M scroll, G asks
    /// the firmware where the cursor is.
    pub fn bench_default() -> KmResult<Self> {
        let press = HashMap::from([
            (BenchKey::W, PressAction::Move(Direction::Up)),
            (BenchKey::S, PressAction::Move(Direction::Down)),
            (BenchKey::A, PressAction::Move(Direction::Left)),
            (BenchKey::D, PressAction::Move(Direction::Right)),
            (BenchKey::Z, PressAction::ButtonDown(MouseButton::Left)),
            (BenchKey::X, PressAction::ButtonDown(MouseButton::Right)),
            (BenchKey::C, PressAction::ButtonDown(MouseButton::Middle)),
            (BenchKey::V, PressAction::ButtonDown(MouseButton::Side1)),
            (BenchKey::B, PressAction::ButtonDown(MouseButton::Side2)),
            (BenchKey::N, PressAction::Wheel(1)),
            (BenchKey::M, PressAction::Wheel(-1)),
            (BenchKey::G, PressAction::GetPos),
        ]);
        let release = HashMap::from([
            (BenchKey::Z, ReleaseAction::ButtonUp(MouseButton::Left)),
            (BenchKey::X, ReleaseAction::ButtonUp(MouseButton::Right)),
            (BenchKey::C, ReleaseAction::ButtonUp(MouseButton::Middle)),
            (BenchKey::V, ReleaseAction::ButtonUp(MouseButton::Side1)),
            (BenchKey::B, ReleaseAction::ButtonUp(MouseButton::Side2)),
        ]);

        Self::from_tables(press, release, MOVE_STEP)
    }

    /// Build a map, rejecting tables where a button could get stuck down or
    /// released without ever being pressed.
    pub fn from_tables(
        press: HashMap<BenchKey, PressAction>,
        release: HashMap<BenchKey, ReleaseAction>,
        step: i32,
    ) -> KmResult<Self> {
        for button in MouseButton::ALL {
            let keys: Vec<BenchKey> = press
                .iter()
                .filter(|(_, action)| **action == PressAction::ButtonDown(button))
                .map(|(key, _)| *key)
                .collect();
            if keys.len() != 1 {
                return Err(KmError::Configuration(format!(
                    "Button {} must be bound to exactly one key, found {:?}",
                    button.action(),
                    keys
                )));
            }
            if release.get(&keys[0]) != Some(&ReleaseAction::ButtonUp(button)) {
                return Err(KmError::Configuration(format!(
                    "Key {} presses {} but has no matching release",
                    keys[0],
                    button.action()
                )));
            }
        }

        for (key, ReleaseAction::ButtonUp(button)) in &release {
            if press.get(key) != Some(&PressAction::ButtonDown(*button)) {
                return Err(KmError::Configuration(format!(
                    "Key {} releases {} without pressing it",
                    key,
                    button.action()
                )));
            }
        }

        Ok(KeyMap {
            press,
            release,
            step,
        })
    }

    /// The command for a key transition, if the key is bound for it
    pub fn dispatch(&self, key: BenchKey, direction: KeyDirection) -> Option<Command> {
        match direction {
            KeyDirection::Down => self.press.get(&key).map(|action| match action {
                PressAction::Move(dir) => {
                    let (dx, dy) = dir.delta(self.step);
                    Command::Move { dx, dy }
                }
                PressAction::ButtonDown(button) => Command::Button {
                    button: *button,
                    pressed: true,
                },
                PressAction::Wheel(step) => Command::Wheel(*step),
                PressAction::GetPos => Command::GetPos,
            }),
            KeyDirection::Up => self.release.get(&key).map(|action| match action {
                ReleaseAction::ButtonUp(button) => Command::Button {
                    button: *button,
                    pressed: false,
                },
            }),
        }
    }

    /// One help line per bound key, in key order
    pub fn legend(&self) -> Vec<String> {
        let mut keys: Vec<&BenchKey> = self.press.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| {
                let what = match self.press[key] {
                    PressAction::Move(dir) => format!("Move {:?}", dir),
                    PressAction::ButtonDown(button) => format!("Hold {} button", button.action()),
                    PressAction::Wheel(step) if step > 0 => "Wheel up".to_owned(),
                    PressAction::Wheel(_) => "Wheel down".to_owned(),
                    PressAction::GetPos => "Report position".to_owned(),
                };
                format!("{} - {}", key.name().to_uppercase(), what)
            })
            .collect()
    }
}
