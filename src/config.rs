use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "UPGRADE_AMI_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// kubectl binary name or path.
    pub kubectl: String,
    /// kubeconfig context; the current context when unset.
    pub kube_context: Option<String>,
    /// aws CLI binary name or path.
    pub aws: String,
    pub aws_profile: Option<String>,
    pub aws_region: Option<String>,
    /// AMI owner account. Defaults to the owner on the first selector term.
    pub owner: Option<String>,
    pub poll_interval_secs: u64,
    pub log_level: String,
    /// `text` or `json`.
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".to_string(),
            kube_context: None,
            aws: "aws".to_string(),
            aws_profile: None,
            aws_region: None,
            owner: None,
            poll_interval_secs: 5,
            log_level: "warn".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(config_dir.join("upgrade-ami").join("config.yaml"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be greater than zero");
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            bail!(
                "unknown log_format '{}' (expected 'text' or 'json')",
                self.log_format
            );
        }
        Ok(())
    }
}

/// Load config from `explicit` (which must exist) or the default location
/// (which may be absent), with `UPGRADE_AMI_*` environment overrides.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            path.to_path_buf()
        }
        None => Config::path()?,
    };
    load_from(&path)
}

fn load_from(path: &Path) -> Result<Config> {
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .with_context(|| format!("loading {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_default_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn yaml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "kube_context: prod-eks\naws_region: us-west-2\nowner: \"123456789012\"\npoll_interval_secs: 15\n",
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();

        assert_eq!(config.kube_context.as_deref(), Some("prod-eks"));
        assert_eq!(config.aws_region.as_deref(), Some("us-west-2"));
        assert_eq!(config.owner.as_deref(), Some("123456789012"));
        assert_eq!(config.poll_interval_secs, 15);
        assert_eq!(config.kubectl, "kubectl");
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn zero_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "poll_interval_secs: 0\n").unwrap();
        let err = load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn unknown_log_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "log_format: xml\n").unwrap();
        assert!(load(Some(&path)).is_err());
    }

    #[test]
    fn malformed_yaml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "poll_interval_secs: [soon\n").unwrap();
        let err = load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("config.yaml"));
    }
}
