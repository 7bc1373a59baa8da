use logslicer::{LogSlicer, LOG_PATH_ENV};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Deployments usually export ERROR_LOG once, process-wide; default it
    // here so the demo runs anywhere.
    if std::env::var(LOG_PATH_ENV).is_err() {
        std::env::set_var(LOG_PATH_ENV, "./logs/from_env.log");
    }

    let slicer = LogSlicer::from_env()?;
    slicer.error("reachable without any explicit wiring")?;
    println!("active log file: {}", slicer.current_path().display());
    Ok(())
}
