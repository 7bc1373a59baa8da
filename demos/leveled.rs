use logslicer::{LogSlicerBuilder, Severity};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let slicer = LogSlicerBuilder::new("./logs/app.log")
        .level(Severity::Info) // accept info and above
        .max_size_mb(5.0)
        .build()?;

    slicer.info("service started")?;
    slicer.warning("cache miss rate above 20%")?;
    slicer.error("upstream timed out")?;
    slicer.debug("dropped: below the info threshold")?;

    // The threshold can be lowered at runtime, e.g. from a signal handler.
    slicer.set_level("debug");
    slicer.debug("now visible")?;

    println!("active log file: {}", slicer.current_path().display());
    Ok(())
}
