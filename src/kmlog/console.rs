use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use kmbench::{
    KmError, PortParams, PortSession,
    constants::{LOGGER_BAUD_RATES, LOGGER_READ_TIMEOUT},
    error::KmResult,
    list_ports,
    menu::{BaudMenu, ensure_ports, read_index},
    reader::{ConsoleSink, LoggingSink, ReaderConfig, ReaderLoop, default_log_path},
    writer::spawn_console_writer,
};
use tracing::info;

#[derive(Parser, Debug, Clone)]
pub(crate) struct ConsoleOptions {
    /// Append received lines here instead of log.txt next to the executable
    #[clap(short, long)]
    log_file: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub(crate) fn run_console(opts: ConsoleOptions) -> KmResult<()> {
    let ports = list_ports()?;
    ensure_ports(&mut io::stdout(), &ports)?;

    let menu = BaudMenu::new(&ports, &LOGGER_BAUD_RATES);
    let (port, baud) = {
        let mut stdout = io::stdout();
        println!("Available COM ports:");
        menu.print(&mut stdout)?;
        let index = read_index(
            &mut io::stdin().lock(),
            &mut stdout,
            "Select COM port by number: ",
        )?;
        let (port, baud) = menu.resolve(index)?;
        (port.name.clone(), baud)
    };

    let session = PortSession::open(&PortParams {
        port,
        baud,
        timeout: LOGGER_READ_TIMEOUT,
    })
    .inspect_err(|e| println!("Failed to open COM port: {}", e))?;
    let session = Arc::new(session);
    println!(
        "Connected to {} with baud rate {}",
        session.name(),
        session.baud()
    );

    let sink = LoggingSink::new(
        opts.log_file.unwrap_or_else(default_log_path),
        ConsoleSink::stdout(),
    );
    info!("Logging received lines to {}", sink.path().display());

    let reader =
        ReaderLoop::new(Arc::clone(&session), sink, ReaderConfig::logger()).spawn()?;
    let writer = spawn_console_writer(Arc::clone(&session))?;

    let outcome = writer
        .join()
        .unwrap_or_else(|_| Err(KmError::Input("Console thread panicked".to_owned())));

    // End of input: release the port so the reader winds down too
    session.close();
    reader
        .join()
        .map_err(|_| KmError::Communication("Reader thread panicked".to_owned()))?;

    outcome
}
