use logslicer::LogSlicerBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A deliberately tiny limit: every few messages overflow the active file
    // and the stamp gains precision, year -> month -> day -> hour -> minute.
    let slicer = LogSlicerBuilder::new("./logs/capped.log")
        .max_size_mb(0.0001)
        .build()?;

    for i in 1..=25 {
        slicer.error(&format!("event {i}: simulated failure, see ticket QX-{i:04}"))?;
    }

    println!("slices written so far:");
    for file in slicer.log_files()? {
        println!("  {}", file.display());
    }
    Ok(())
}
