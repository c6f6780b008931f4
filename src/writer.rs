//! Outbound paths: keyboard events and console lines.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::JoinHandle;

use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::constants::IDLE_SLEEP;
use crate::error::{KmError, KmResult};
use crate::keymap::{BenchKey, KeyDirection, KeyMap};
use crate::session::PortSession;

pub fn command_channel(capacity: usize) -> (SyncSender<Command>, Receiver<Command>) {
    mpsc::sync_channel(capacity)
}

/// Maps key events to commands inside the keyboard hook. Never blocks:
/// commands are queued for [`spawn_command_writer`] and dropped if the queue
/// is full.
pub struct KeyboardBridge {
    keymap: KeyMap,
    queue: SyncSender<Command>,
}

impl KeyboardBridge {
    pub fn new(keymap: KeyMap, queue: SyncSender<Command>) -> Self {
        KeyboardBridge { keymap, queue }
    }

    /// Handle one bench key transition. Returns the queued command, if any.
    pub fn handle(&self, key: BenchKey, direction: KeyDirection) -> Option<Command> {
        let command = self.keymap.dispatch(key, direction)?;
        match self.queue.try_send(command.clone()) {
            Ok(()) => Some(command),
            Err(TrySendError::Full(dropped)) => {
                warn!("Command queue full, dropping {}", dropped);
                None
            }
            Err(TrySendError::Disconnected(dropped)) => {
                debug!("Writer gone, dropping {}", dropped);
                None
            }
        }
    }

    /// Entry point for raw hook events. Every key transition is echoed to
    /// `out`, bound or not.
    pub fn on_event<W: Write>(&self, event: &rdev::Event, out: &mut W) {
        let (key, direction) = match &event.event_type {
            rdev::EventType::KeyPress(key) => (*key, KeyDirection::Down),
            rdev::EventType::KeyRelease(key) => (*key, KeyDirection::Up),
            _ => return,
        };

        let name = match BenchKey::from_rdev(key) {
            Some(bench_key) => {
                self.handle(bench_key, direction);
                bench_key.name().to_owned()
            }
            None => format!("{:?}", key),
        };
        let echoed = match direction {
            KeyDirection::Down => writeln!(out, "Key pressed: {}", name),
            KeyDirection::Up => writeln!(out, "Key released: {}", name),
        };
        if let Err(e) = echoed {
            warn!("Could not echo key event: {}", e);
        }
    }
}

/// Register the process-wide keyboard hook on its own thread. The thread only
/// returns if the hook cannot be installed.
pub fn spawn_keyboard_hook(bridge: KeyboardBridge) -> KmResult<JoinHandle<KmResult<()>>> {
    std::thread::Builder::new()
        .name("keyboard-hook".to_owned())
        .spawn(move || {
            info!("Installing keyboard hook");
            rdev::listen(move |event| {
                bridge.on_event(&event, &mut std::io::stdout());
            })
                .map_err(|e| KmError::Input(format!("Keyboard hook failed: {:?}", e)))
        })
        .map_err(|e| KmError::Input(format!("Failed to spawn keyboard thread: {}", e)))
}

/// Keep the foreground thread alive until `running` is cleared. If the hook
/// thread ends first, its outcome is returned instead.
pub fn idle_until(running: &AtomicBool, hook: JoinHandle<KmResult<()>>) -> KmResult<()> {
    while running.load(Ordering::SeqCst) {
        if hook.is_finished() {
            return hook.join().unwrap_or_else(|_| {
                Err(KmError::Input("Keyboard hook thread panicked".to_owned()))
            });
        }
        std::thread::sleep(IDLE_SLEEP);
    }
    debug!("Idle loop released");
    Ok(())
}

/// Drain queued commands onto the port, one write per command. Stops when
/// every sender is gone or the port is closed.
pub fn run_command_writer(session: &PortSession, commands: Receiver<Command>) {
    for command in commands {
        match session.send_command(&command) {
            Ok(()) => println!("Sent: {}", command),
            Err(KmError::PortClosed(name)) => {
                info!("Writer for {} stopped: port closed", name);
                break;
            }
            Err(e) => {
                println!("Error writing to serial port: {}", e);
                error!("Write of {} failed: {}", command, e);
            }
        }
    }
    debug!("Command writer finished");
}

pub fn spawn_command_writer(
    session: Arc<PortSession>,
    commands: Receiver<Command>,
) -> KmResult<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("command-writer".to_owned())
        .spawn(move || run_command_writer(&session, commands))
        .map_err(|e| KmError::Communication(format!("Failed to spawn writer thread: {}", e)))
}

/// Prompt for lines on `input` and send each non-empty one. Runs until end of
/// input. Write failures are reported and the loop carries on, except when
/// the port has been closed.
pub fn run_console_writer<R: BufRead, W: Write>(
    session: &PortSession,
    mut input: R,
    mut prompt: W,
) -> KmResult<()> {
    let mut buffer = String::new();
    loop {
        write!(prompt, "Enter command: ")
            .and_then(|_| prompt.flush())
            .map_err(|e| KmError::Input(format!("{}", e)))?;

        buffer.clear();
        let read = input
            .read_line(&mut buffer)
            .map_err(|e| KmError::Input(format!("Failed to read command: {}", e)))?;
        if read == 0 {
            info!("End of console input");
            return Ok(());
        }

        let line = buffer.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        match session.send_line(line) {
            Ok(_) => {}
            Err(e @ KmError::PortClosed(_)) => return Err(e),
            Err(e) => {
                println!("Error writing to serial port: {}", e);
                error!("Write of {:?} failed: {}", line, e);
            }
        }
    }
}

/// Console writer on a dedicated thread reading standard input
pub fn spawn_console_writer(session: Arc<PortSession>) -> KmResult<JoinHandle<KmResult<()>>> {
    std::thread::Builder::new()
        .name("console-writer".to_owned())
        .spawn(move || {
            let stdin = std::io::stdin();
            run_console_writer(&session, stdin.lock(), std::io::stdout())
        })
        .map_err(|e| KmError::Input(format!("Failed to spawn console thread: {}", e)))
}
