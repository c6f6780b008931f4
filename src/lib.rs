//! Bench tools for firmware that takes `km.*` mouse commands over serial.
//!
//! `kmtest` turns key presses into commands; `kmlog` is a line console that
//! also appends everything the firmware prints to a log file. Both share the
//! pieces in this crate: port selection ([`menu`]), a thread-safe
//! [`session::PortSession`], the background [`reader`] and the two
//! [`writer`] paths.

pub use command::{Command, MouseButton};
pub use error::{KmError, KmResult};
pub use interface::{PortDescriptor, list_ports};
pub use keymap::KeyMap;
pub use session::{PortParams, PortSession};

pub mod command;
pub mod constants;
pub mod error;
pub mod interface;
pub mod keymap;
pub mod line;
pub mod menu;
pub mod reader;
pub mod session;
pub mod util;
pub mod writer;
