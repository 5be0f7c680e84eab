use super::config::{default_config_path, default_data_dir, DegovConfig};
use std::path::PathBuf;

/// Write a commented default config file
///
/// The file goes to `--config` if given, otherwise next to the data
/// directory. An existing file is left alone unless `force` is set.
pub fn execute(
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = data_dir.unwrap_or_else(default_data_dir);
    let config_path = config_path.unwrap_or_else(|| default_config_path(&data_dir));

    if config_path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    DegovConfig::create_default(&config_path, &data_dir)?;

    println!("📝 Created: {}", config_path.display());
    println!("   Data directory: {}", data_dir.display());
    Ok(())
}
