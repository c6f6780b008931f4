//! Outbound `km.*` command lines understood by the mouse firmware.

use std::fmt;

pub const NAMESPACE: &str = "km";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Side1,
    Side2,
}

impl MouseButton {
    pub const ALL: [MouseButton; 5] = [
        MouseButton::Left,
        MouseButton::Right,
        MouseButton::Middle,
        MouseButton::Side1,
        MouseButton::Side2,
    ];

    /// Action name on the wire, `km.<action>(state)`
    pub fn action(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
            MouseButton::Side1 => "side1",
            MouseButton::Side2 => "side2",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Relative move
    Move { dx: i32, dy: i32 },
    /// Ask the firmware to report `km.pos(x,y)`
    GetPos,
    Button { button: MouseButton, pressed: bool },
    Wheel(i32),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Move { dx, dy } => write!(f, "{NAMESPACE}.move({dx},{dy})"),
            Command::GetPos => write!(f, "{NAMESPACE}.getpos()"),
            Command::Button { button, pressed } => {
                write!(f, "{NAMESPACE}.{}({})", button.action(), u8::from(*pressed))
            }
            Command::Wheel(step) => write!(f, "{NAMESPACE}.wheel({step})"),
        }
    }
}

impl Command {
    pub fn to_wire(&self) -> Vec<u8> {
        wire_bytes(&self.to_string())
    }
}

/// Encode a line for transmission: any trailing line terminators are
/// replaced by exactly one `\n`.
pub fn wire_bytes(text: &str) -> Vec<u8> {
    let body = text.trim_end_matches(['\r', '\n']);
    let mut bytes = Vec::with_capacity(body.len() + 1);
    bytes.extend_from_slice(body.as_bytes());
    bytes.push(b'\n');
    bytes
}

/// Parse the firmware's position report, `km.pos(x,y)`
pub fn parse_position(line: &str) -> Option<(i32, i32)> {
    let args = line
        .trim()
        .strip_prefix(NAMESPACE)?
        .strip_prefix(".pos(")?
        .strip_suffix(')')?;
    let (x, y) = args.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_firmware_commands() {
        assert_eq!(Command::Move { dx: 10, dy: 0 }.to_string(), "km.move(10,0)");
        assert_eq!(Command::Move { dx: 0, dy: -10 }.to_string(), "km.move(0,-10)");
        assert_eq!(Command::GetPos.to_string(), "km.getpos()");
        assert_eq!(Command::Wheel(-1).to_string(), "km.wheel(-1)");
        assert_eq!(
            Command::Button {
                button: MouseButton::Side2,
                pressed: false
            }
            .to_string(),
            "km.side2(0)"
        );
        assert_eq!(
            Command::Button {
                button: MouseButton::Left,
                pressed: true
            }
            .to_string(),
            "km.left(1)"
        );
    }

    #[test]
    fn wire_lines_end_with_exactly_one_newline() {
        assert_eq!(wire_bytes("km.left(1)"), b"km.left(1)\n");
        assert_eq!(wire_bytes("km.left(1)\n"), b"km.left(1)\n");
        assert_eq!(wire_bytes("km.left(1)\r\n\n"), b"km.left(1)\n");
        assert_eq!(wire_bytes(""), b"\n");
        assert_eq!(Command::Wheel(1).to_wire(), b"km.wheel(1)\n");
    }

    #[test]
    fn parses_position_reports() {
        assert_eq!(parse_position("km.pos(12,-4)"), Some((12, -4)));
        assert_eq!(parse_position("km.pos( 3 , 7 )\r"), Some((3, 7)));
        assert_eq!(parse_position("km.pos(3)"), None);
        assert_eq!(parse_position("km.move(1,1)"), None);
        assert_eq!(parse_position("Error: MCU's not in sync, Waiting..."), None);
    }
}
