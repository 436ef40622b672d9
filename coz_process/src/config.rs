use config::{Config, ConfigError, File, FileFormat};
use log::{debug, warn};
use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
};

use coz_process_cli_types::OutputFormat;

use crate::defaults;
use crate::dialect::Dialect;

pub const LOCAL_CONFIG_NAME: &str = ".cozprocessconfig";

/// Path of the user-wide config (XDG_CONFIG_HOME or ~/.config/coz-process/config.toml)
fn system_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
        Some(
            Path::new(&xdg_config_home)
                .join("coz-process")
                .join("config.toml"),
        )
    } else {
        dirs_next::home_dir().map(|home| home.join(".config").join("coz-process").join("config.toml"))
    }
}

/// Read hierarchical configuration (system -> local override)
pub fn read_hierarchical_config() -> Result<Config, ConfigError> {
    let mut builder = Config::builder();

    if let Some(system_config_path) = system_config_path() {
        builder = builder.add_source(
            File::from(system_config_path)
                .format(FileFormat::Toml)
                .required(false),
        );
    }

    // The local config (closest .cozprocessconfig) overrides the system config
    if let Some(local_path) = env::current_dir()
        .ok()
        .and_then(|dir| find_config_path(&dir))
    {
        builder = builder.add_source(
            File::from(local_path)
                .format(FileFormat::Toml)
                .required(false),
        );
    }

    builder.build()
}

/// Closest `.cozprocessconfig` in `start` or any of its ancestors
fn find_config_path(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(LOCAL_CONFIG_NAME))
        .find(|candidate| candidate.is_file())
}

/// Processing defaults resolved from configuration files
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSettings {
    pub min_speedups: u16,
    pub error_bounds: bool,
    pub abbreviate_locations: bool,
    pub format: OutputFormat,
    pub hotspot_threshold: f64,
    /// Extra command labels, mapped to transition names
    pub aliases: HashMap<String, String>,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        ProcessSettings {
            min_speedups: defaults::DEFAULT_MIN_SPEEDUPS,
            error_bounds: defaults::DEFAULT_ERROR_BOUNDS,
            abbreviate_locations: defaults::DEFAULT_ABBREVIATE_LOCATIONS,
            format: defaults::DEFAULT_OUTPUT_FORMAT,
            hotspot_threshold: defaults::DEFAULT_HOTSPOT_THRESHOLD,
            aliases: HashMap::new(),
        }
    }
}

impl ProcessSettings {
    /// Settings from `config`; missing or invalid keys keep their defaults.
    pub fn from_config(config: &Config) -> Self {
        let mut settings = ProcessSettings::default();

        if let Ok(min_speedups) = config.get_int("process.min_speedups") {
            match u16::try_from(min_speedups) {
                Ok(n) if n >= 1 => settings.min_speedups = n,
                _ => warn!(
                    "Ignoring process.min_speedups = {}: must be between 1 and {}",
                    min_speedups,
                    u16::MAX
                ),
            }
        }

        if let Ok(error_bounds) = config.get_bool("process.error_bounds") {
            settings.error_bounds = error_bounds;
        }

        if let Ok(abbreviate) = config.get_bool("process.abbreviate_locations") {
            settings.abbreviate_locations = abbreviate;
        }

        if let Ok(format_str) = config.get_string("output.format") {
            match format_str.parse::<OutputFormat>() {
                Ok(format) => settings.format = format,
                Err(e) => warn!("Ignoring output.format: {}", e),
            }
        }

        if let Ok(threshold) = config.get_float("hotspots.threshold") {
            if (0.0..=1.0).contains(&threshold) {
                settings.hotspot_threshold = threshold;
            } else {
                warn!(
                    "Ignoring hotspots.threshold = {}: must be between 0 and 1",
                    threshold
                );
            }
        }

        if let Ok(table) = config.get_table("dialect.aliases") {
            for (label, transition) in table {
                match transition.into_string() {
                    Ok(transition) => {
                        settings.aliases.insert(label, transition);
                    }
                    Err(e) => warn!("Ignoring dialect alias '{}': {}", label, e),
                }
            }
        }

        settings
    }

    /// The full label set, extended by the configured aliases.
    pub fn dialect(&self) -> Dialect {
        let mut dialect = Dialect::default();
        dialect.add_aliases(&self.aliases);
        dialect
    }
}

/// Settings from the hierarchical configuration, or the defaults if it cannot be read.
pub fn load_settings() -> ProcessSettings {
    match read_hierarchical_config() {
        Ok(config) => ProcessSettings::from_config(&config),
        Err(e) => {
            debug!("Could not read hierarchical config: {}", e);
            ProcessSettings::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dialect::Transition;
    use std::fs;
    use tempfile::TempDir;

    fn config_from(toml: &str) -> Config {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults_without_keys() {
        let settings = ProcessSettings::from_config(&config_from(""));
        assert_eq!(settings, ProcessSettings::default());
        assert_eq!(settings.min_speedups, 1);
        assert!(settings.abbreviate_locations);
        assert!(!settings.error_bounds);
    }

    #[test]
    fn test_all_keys() {
        let settings = ProcessSettings::from_config(&config_from(
            r#"
            [process]
            min_speedups = 3
            error_bounds = true
            abbreviate_locations = false

            [output]
            format = "tsv"

            [hotspots]
            threshold = 0.05

            [dialect.aliases]
            begin-block = "open-experiment"
            "#,
        ));

        assert_eq!(settings.min_speedups, 3);
        assert!(settings.error_bounds);
        assert!(!settings.abbreviate_locations);
        assert_eq!(settings.format, OutputFormat::Tsv);
        assert_eq!(settings.hotspot_threshold, 0.05);
        assert_eq!(
            settings.dialect().transition("begin-block"),
            Some(Transition::OpenExperiment)
        );
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let settings = ProcessSettings::from_config(&config_from(
            r#"
            [process]
            min_speedups = 0

            [output]
            format = "json"

            [hotspots]
            threshold = 2.5
            "#,
        ));

        assert_eq!(settings, ProcessSettings::default());
    }

    #[test]
    fn test_find_config_path_upward_search() {
        let temp_dir = TempDir::new().unwrap();
        let subdir = temp_dir.path().join("a").join("b");
        fs::create_dir_all(&subdir).unwrap();

        let config_path = temp_dir.path().join(LOCAL_CONFIG_NAME);
        fs::write(&config_path, "[process]\nmin_speedups = 2\n").unwrap();

        assert_eq!(find_config_path(&subdir), Some(config_path.clone()));

        let closer = temp_dir.path().join("a").join(LOCAL_CONFIG_NAME);
        fs::write(&closer, "[process]\nmin_speedups = 4\n").unwrap();
        assert_eq!(find_config_path(&subdir), Some(closer));
    }

    #[test]
    fn test_find_config_path_ignores_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join(LOCAL_CONFIG_NAME)).unwrap();
        let found = find_config_path(temp_dir.path());
        assert_ne!(found, Some(temp_dir.path().join(LOCAL_CONFIG_NAME)));
    }
}
