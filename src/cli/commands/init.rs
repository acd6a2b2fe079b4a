//! Implementation of the `eventpulse init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::CONFIG_DIR;

const DATABASE_FILE: &str = "eventpulse.db";

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub config_written: bool,
    pub database_initialized: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push(format!("\nConfiguration written to {CONFIG_DIR}/config.yaml"));
        }
        if self.database_initialized {
            lines.push(format!("Database initialized at {CONFIG_DIR}/{DATABASE_FILE}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let output_data = initialize(args).await?;
    output(&output_data, json_mode);
    Ok(())
}

async fn initialize(args: InitArgs) -> Result<InitOutput> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir().context("Failed to get current directory")?.join(&args.path)
    };

    let config_dir = target_path.join(CONFIG_DIR);

    if config_dir.exists() && !args.force {
        return Ok(InitOutput {
            success: false,
            message: "Project already initialized. Use --force to reinitialize.".to_string(),
            initialized_path: target_path,
            config_written: false,
            database_initialized: false,
        });
    }

    if args.force && config_dir.exists() {
        fs::remove_dir_all(&config_dir)
            .await
            .with_context(|| format!("Failed to remove existing {CONFIG_DIR} directory"))?;
    }

    fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    let config_yaml = serde_yaml::to_string(&Config::default()).context("Failed to render default configuration")?;
    fs::write(config_dir.join("config.yaml"), config_yaml)
        .await
        .context("Failed to write config.yaml")?;

    let db_url = format!("sqlite:{}", config_dir.join(DATABASE_FILE).display());
    let pool = initialize_database(&db_url, None).await.context("Failed to initialize database")?;
    pool.close().await;

    tracing::info!(path = %target_path.display(), "Project initialized");

    Ok(InitOutput {
        success: true,
        message: if args.force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        initialized_path: target_path,
        config_written: true,
        database_initialized: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::ConfigLoader;

    #[tokio::test]
    async fn test_init_creates_config_and_database() {
        let dir = tempfile::tempdir().unwrap();

        let first = initialize(InitArgs { force: false, path: dir.path().to_path_buf() })
            .await
            .unwrap();
        assert!(first.success);
        assert!(dir.path().join(CONFIG_DIR).join("config.yaml").exists());
        assert!(dir.path().join(CONFIG_DIR).join(DATABASE_FILE).exists());

        let written = std::fs::read_to_string(dir.path().join(CONFIG_DIR).join("config.yaml")).unwrap();
        let parsed: Config = serde_yaml::from_str(&written).unwrap();
        ConfigLoader::validate(&parsed).expect("written config is valid");
        assert_eq!(parsed.reconciler.interval_secs, 300);

        let second = initialize(InitArgs { force: false, path: dir.path().to_path_buf() })
            .await
            .unwrap();
        assert!(!second.success);

        let forced = initialize(InitArgs { force: true, path: dir.path().to_path_buf() })
            .await
            .unwrap();
        assert!(forced.success);
        assert!(forced.message.contains("reinitialized"));
    }
}
