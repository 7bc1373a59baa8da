use {
    logslicer::{LogSlicerBuilder, TimeZone},
    tracing_subscriber::util::SubscriberInitExt,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let slicer = LogSlicerBuilder::new("./logs/tracing.log")
        .max_size_mb(16.0)
        .time_zone(TimeZone::UTC) // stamp file names in UTC
        .build()?;
    let (non_blocking, _guard) = tracing_appender::non_blocking(slicer);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .finish()
        .try_init()?;

    tracing::info!("This is an info message");
    tracing::warn!("This is a warning message");
    tracing::error!("This is an error message");

    Ok(())
}
