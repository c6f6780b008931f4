use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use kmbench::{
    KeyMap, KmError, PortParams, PortSession,
    constants::{HARNESS_BAUD_RATE, HARNESS_READ_TIMEOUT, KEY_QUEUE_CAPACITY},
    error::KmResult,
    list_ports, menu,
    reader::{ConsoleSink, ReaderConfig, ReaderLoop},
    writer::{
        KeyboardBridge, command_channel, idle_until, spawn_command_writer, spawn_keyboard_hook,
    },
};
use tracing::info;

#[derive(Parser, Debug, Clone)]
pub(crate) struct HarnessOptions {
    /// More log output (-v debug, -vv trace)
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub(crate) fn run_harness(_opts: HarnessOptions) -> KmResult<()> {
    // Catch a bad table before touching the port
    let keymap = KeyMap::bench_default()?;

    println!("Listing available COM ports...");
    let ports = list_ports()?;
    menu::ensure_ports(&mut io::stdout(), &ports)?;

    let port = {
        let mut stdout = io::stdout();
        menu::print_port_menu(&mut stdout, &ports)?;
        let index = menu::read_index(
            &mut io::stdin().lock(),
            &mut stdout,
            "Select COM port by number: ",
        )?;
        menu::select_port(&ports, index)?.name.clone()
    };

    println!("Opening COM port: {} at {} baud rate", port, HARNESS_BAUD_RATE);
    let session = PortSession::open(&PortParams {
        port: port.clone(),
        baud: HARNESS_BAUD_RATE,
        timeout: HARNESS_READ_TIMEOUT,
    })
    .inspect_err(|e| println!("Failed to open COM port: {}", e))?;
    let session = Arc::new(session);
    println!("COM port {} opened at {} baud.", session.name(), session.baud());

    let result = drive(&session, keymap);

    println!("Closing COM port {}.", port);
    session.close();
    result
}

fn drive(session: &Arc<PortSession>, keymap: KeyMap) -> KmResult<()> {
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)).map_err(|e| {
            KmError::Configuration(format!("Failed to install Ctrl+C handler: {}", e))
        })?;
    }

    println!("Starting to read from the serial port in a separate thread.");
    // Not joined; it ends once the port is closed
    ReaderLoop::new(
        Arc::clone(session),
        ConsoleSink::stdout(),
        ReaderConfig::harness(),
    )
    .spawn()?;

    println!("Use the following keys to control the mouse:");
    for entry in keymap.legend() {
        println!("  {}", entry);
    }

    let (queue, commands) = command_channel(KEY_QUEUE_CAPACITY);
    spawn_command_writer(Arc::clone(session), commands)?;
    let hook = spawn_keyboard_hook(KeyboardBridge::new(keymap, queue))?;

    idle_until(&running, hook)?;

    println!("Interrupt received, exiting.");
    info!("Harness interrupted");
    Ok(())
}
