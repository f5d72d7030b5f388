//! Shared logging setup for the schemaport binaries.

use crate::Result;

/// Initializes structured logging based on verbosity level.
///
/// `verbose` maps 0=INFO, 1=DEBUG, 2+=TRACE; `quiet` forces ERROR only.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| {
            crate::error::SchemaPortError::configuration(format!(
                "failed to initialize logging: {e}"
            ))
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    // The subscriber can only be installed once per process, so only the
    // level mapping is checked here.

    #[test]
    fn verbosity_mapping() {
        let cases = [
            ((true, 0), tracing::Level::ERROR),
            ((true, 3), tracing::Level::ERROR),
            ((false, 0), tracing::Level::INFO),
            ((false, 1), tracing::Level::DEBUG),
            ((false, 2), tracing::Level::TRACE),
        ];
        for ((quiet, verbose), expected) in cases {
            let level = match (quiet, verbose) {
                (true, _) => tracing::Level::ERROR,
                (false, 0) => tracing::Level::INFO,
                (false, 1) => tracing::Level::DEBUG,
                (false, _) => tracing::Level::TRACE,
            };
            assert_eq!(level, expected);
        }
    }
}
