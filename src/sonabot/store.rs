use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use super::config::Config;

pub fn data_dir() -> PathBuf {
    let project_dirs = directories::ProjectDirs::from("com", "sonabot", "sonabot")
        .expect("Cannot retrieve project dirs");
    project_dirs.data_dir().to_owned()
}

pub fn config_file_path() -> PathBuf {
    data_dir().join("config.yaml")
}

/// Loads the config, writing a default one first if the file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    info!("Config file: {}", path.to_string_lossy());
    if !path.exists() {
        info!("Config file does not exist, creating.");
        store_default_config(path)?;
    }
    let config_file =
        File::open(path).with_context(|| format!("Cannot open {}", path.to_string_lossy()))?;
    serde_yaml::from_reader(config_file)
        .with_context(|| format!("Cannot parse {}", path.to_string_lossy()))
}

pub fn store_default_config(path: &Path) -> Result<()> {
    ensure_dir_created(path)?;
    let config_file = File::create(path)?;
    Ok(serde_yaml::to_writer(config_file, &Config::default())?)
}

fn ensure_dir_created(path: &Path) -> Result<()> {
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create {}", &dir.to_string_lossy()))?;
    }
    Ok(())
}
