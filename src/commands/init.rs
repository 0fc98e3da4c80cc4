//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::ContentStore;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_dir: PathBuf,
    pub force: bool,
}

/// Write a default configuration and create the database
pub async fn cmd_init(options: InitOptions) -> Result<Config> {
    let mut config = Config::default();
    config.init_paths(Some(options.base_dir));

    if config.paths.config_file.exists() && !options.force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config.paths.config_file.display()
        )));
    }

    config.validate()?;
    config.save()?;

    let store = ContentStore::connect(&config).await?;
    store.init_schema().await?;
    info!("Created database at {:?}", config.paths.db_file);

    Ok(config)
}

/// Print where things were created
pub fn print_init(config: &Config) {
    println!("✓ Initialized egw-library at {:?}", config.paths.base_dir);
    println!("\nConfiguration: {:?}", config.paths.config_file);
    println!("Database: {:?}", config.paths.db_file);
    println!("\nNext steps:");
    println!("  egw-library import bundle.json      # Load languages, books and paragraphs");
    println!("  egw-library search \"steps to christ\" # Search the library");
    println!("  egw-library export 123              # Write a book as PDF");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_config_and_db() {
        let tmp = TempDir::new().unwrap();
        let options = InitOptions {
            base_dir: tmp.path().to_path_buf(),
            force: false,
        };

        let config = cmd_init(options.clone()).await.unwrap();
        assert!(config.paths.config_file.exists());
        assert!(config.paths.db_file.exists());

        let err = cmd_init(options.clone()).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let forced = InitOptions {
            force: true,
            ..options
        };
        assert!(cmd_init(forced).await.is_ok());
    }
}
