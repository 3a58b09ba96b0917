//! CLI argument definitions

use clap::Parser;
use docktail_core::{parse_size, ConfigFile, Result, Settings, DEFAULT_LOG_LIMIT, DEFAULT_LOG_ROOT};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docktaild")]
#[command(version, about = "Persist Docker container logs to rotating files")]
pub struct Cli {
    /// Root directory for container log output
    #[arg(long = "log-path", env = "DOCKTAIL_LOG_PATH")]
    pub log_path: Option<PathBuf>,

    /// Per-file size limit before rotation (e.g. 50MB, 1GiB)
    #[arg(long, env = "DOCKTAIL_LIMIT")]
    pub limit: Option<String>,

    /// Container names to monitor. eg: name1,name2
    #[arg(
        long = "container-names",
        env = "DOCKTAIL_CONTAINER_NAMES",
        value_delimiter = ','
    )]
    pub container_names: Vec<String>,

    /// Gzip-compress rotated log files
    #[arg(long, env = "DOCKTAIL_COMPRESSION")]
    pub compression: bool,

    /// Optional TOML config file; flags override file values
    #[arg(long, env = "DOCKTAIL_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Resolve CLI flags over the optional config file into settings
    pub fn into_settings(self) -> Result<Settings> {
        let file = match &self.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };

        let log_root = self
            .log_path
            .or(file.log_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_ROOT));
        let limit = self
            .limit
            .or(file.limit)
            .unwrap_or_else(|| DEFAULT_LOG_LIMIT.to_string());
        let containers = if self.container_names.is_empty() {
            file.containers
        } else {
            self.container_names
        };
        let compression = self.compression || file.compression.unwrap_or(false);

        Settings::new(log_root, parse_size(&limit)?, containers, compression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_flags_resolve_to_settings() {
        let cli = Cli::try_parse_from([
            "docktaild",
            "--log-path",
            "/data/logs",
            "--limit",
            "10MB",
            "--container-names",
            "web,db",
            "--compression",
        ])
        .unwrap();

        let settings = cli.into_settings().unwrap();
        assert_eq!(settings.log_root, PathBuf::from("/data/logs"));
        assert_eq!(settings.limit_bytes, 10_000_000);
        assert_eq!(settings.containers, vec!["web", "db"]);
        assert!(settings.compression);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["docktaild", "--container-names", "web"]).unwrap();
        let settings = cli.into_settings().unwrap();
        assert_eq!(settings.log_root, PathBuf::from(DEFAULT_LOG_ROOT));
        assert_eq!(settings.limit_bytes, 50_000_000);
        assert!(!settings.compression);
    }

    #[test]
    fn test_missing_containers_rejected() {
        let cli = Cli::try_parse_from(["docktaild"]).unwrap();
        assert!(cli.into_settings().is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let content = r#"
log_path = "/from/file"
limit = "1MB"
containers = ["filed"]
"#;
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let config_path = file.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from([
            "docktaild",
            "--config",
            &config_path,
            "--limit",
            "2MB",
        ])
        .unwrap();

        let settings = cli.into_settings().unwrap();
        // File supplies what the flags left unset.
        assert_eq!(settings.log_root, PathBuf::from("/from/file"));
        assert_eq!(settings.containers, vec!["filed"]);
        // Flag wins over file.
        assert_eq!(settings.limit_bytes, 2_000_000);
    }
}
