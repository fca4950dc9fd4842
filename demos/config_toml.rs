use logkeeper::{LogManager, SinkConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempfile::tempdir()?;
    let log_path = temp_dir.path().join("logs").join("app.log");

    let toml_str = format!(
        r#"
path = "{}"
write_initial_banner = false
time_format = "[year]-[month]-[day] [hour]:[minute]:[second]"
max_stored_files = 4
retention = "every_flush"
flush = "background"
"#,
        log_path.display()
    );

    let config: SinkConfig = toml::from_str(&toml_str)?;
    println!("Parsed config: {:?}", config);

    let log = LogManager::new(config);
    for i in 0..10 {
        log.info(format!("message number {}", i));
    }
    log.shutdown();

    println!("{}", std::fs::read_to_string(&log_path)?);

    Ok(())
}
