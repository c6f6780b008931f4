use tracing::Level;

/// `-v` count to tracing level
pub fn tracing_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Log to stderr so stdout carries only console traffic
pub fn init_tracing(verbose: u8) {
    tracing_subscriber::fmt()
        .with_max_level(tracing_level(verbose))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(tracing_level(0), Level::INFO);
        assert_eq!(tracing_level(1), Level::DEBUG);
        assert_eq!(tracing_level(5), Level::TRACE);
    }
}
