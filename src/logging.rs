use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Installs the process-wide log subscriber. Fails if one is already set.
pub fn init_logging() -> Result<()> {
    init_logging_with_level(Level::INFO)
}

pub fn init_logging_with_level(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
