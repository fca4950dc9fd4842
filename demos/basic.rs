use logkeeper::{LogEntry, LogManager, Severity, SinkConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempfile::tempdir()?;
    let log_path = temp_dir.path().join("session.log");

    let config = SinkConfig::new()
        .with_path(&log_path)
        .with_time_format("[hour]:[minute]:[second]")
        .with_max_stored_files(5);
    let log = LogManager::new(config);

    log.write("disk full", Severity::Error);
    log.warning("retrying in 5s");
    log.write_entry(
        LogEntry::new(Severity::Info, "no timestamp here").with_timestamp_default(false),
    );
    log.flush()?;

    println!("{}", std::fs::read_to_string(&log_path)?);

    Ok(())
}
