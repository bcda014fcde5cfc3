//! Infrastructure implementation of the `ConfigStore` port, plus loading
//! of a custom startup-script template.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::RescueConfig;
use crate::domain::metadata::{DISK_PLACEHOLDER, StartupScriptTemplate};

pub const CONFIG_ENV: &str = "GCE_RESCUE_CONFIG";

/// Production implementation of `ConfigStore` that uses a YAML file on disk.
pub struct YamlConfigStore;

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<RescueConfig> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(RescueConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    fn save(&self, config: &RescueConfig) -> Result<()> {
        let path = self.path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(config).context("cannot serialize config")?;
        std::fs::write(&path, content)
            .with_context(|| format!("cannot write {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("cannot set permissions on {}", path.display()))?;
        }
        Ok(())
    }

    fn path(&self) -> Result<PathBuf> {
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".gce-rescue").join("config.yaml"))
    }
}

/// The configured startup-script template, or the embedded one.
///
/// # Errors
///
/// Returns an error if the configured file cannot be read or lacks the
/// disk placeholder.
pub fn load_startup_template(config: &RescueConfig) -> Result<StartupScriptTemplate> {
    let Some(path) = &config.rescue.startup_script else {
        return Ok(StartupScriptTemplate::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read startup script template {}", path.display()))?;
    anyhow::ensure!(
        content.contains(DISK_PLACEHOLDER),
        "startup script template {} does not contain {DISK_PLACEHOLDER}",
        path.display()
    );
    Ok(StartupScriptTemplate::new(content))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, unsafe_code)]
mod tests {
    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    fn with_config_env<T>(dir: &TempDir, f: impl FnOnce(PathBuf) -> T) -> T {
        let path = dir.path().join("nested").join("config.yaml");
        // SAFETY: serialised by #[serial]
        unsafe { std::env::set_var(CONFIG_ENV, &path) };
        let out = f(path);
        unsafe { std::env::remove_var(CONFIG_ENV) };
        out
    }

    #[test]
    #[serial]
    fn test_load_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = with_config_env(&dir, |_| YamlConfigStore.load().expect("load"));
        assert_eq!(cfg, RescueConfig::default());
    }

    #[test]
    #[serial]
    fn test_save_then_load_roundtrips_and_creates_parent() {
        let dir = TempDir::new().unwrap();
        with_config_env(&dir, |path| {
            let mut cfg = RescueConfig::default();
            cfg.poll.timeout_secs = 90;
            YamlConfigStore.save(&cfg).expect("save");
            assert!(path.exists());
            assert_eq!(YamlConfigStore.load().expect("load"), cfg);
        });
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        with_config_env(&dir, |path| {
            YamlConfigStore.save(&RescueConfig::default()).expect("save");
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        });
    }

    #[test]
    #[serial]
    fn test_load_invalid_yaml_names_file() {
        let dir = TempDir::new().unwrap();
        with_config_env(&dir, |path| {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, "poll: [not, a, map]").unwrap();
            let err = format!("{:#}", YamlConfigStore.load().unwrap_err());
            assert!(err.contains("cannot parse"), "got: {err}");
        });
    }

    #[test]
    fn test_load_startup_template_defaults_to_embedded() {
        let tpl = load_startup_template(&RescueConfig::default()).expect("template");
        assert_eq!(tpl, StartupScriptTemplate::default());
    }

    #[test]
    fn test_load_startup_template_reads_custom_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("rescue.sh");
        std::fs::write(&file, "mount /dev/disk/by-id/google-GOOGLE_DISK_NAME /mnt").unwrap();
        let mut cfg = RescueConfig::default();
        cfg.rescue.startup_script = Some(file);

        let tpl = load_startup_template(&cfg).expect("template");

        assert_eq!(tpl.render("linux", "/x"), "mount /dev/disk/by-id/google-linux /mnt");
    }

    #[test]
    fn test_load_startup_template_requires_placeholder() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("rescue.sh");
        std::fs::write(&file, "echo nothing to mount").unwrap();
        let mut cfg = RescueConfig::default();
        cfg.rescue.startup_script = Some(file);

        assert!(load_startup_template(&cfg).is_err());
    }
}
