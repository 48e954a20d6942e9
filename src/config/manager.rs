use super::{evolution::EvolutionConfig, render::RenderConfig, traits::ConfigSection};
use crate::error::PicEvolveError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub render: RenderConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), PicEvolveError> {
        validate_section(&self.evolution)?;
        validate_section(&self.render)?;
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, PicEvolveError> {
        let config: AppConfig = toml::from_str(contents)
            .map_err(|e| PicEvolveError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

/// Validate one section, tagging configuration errors with its name
fn validate_section<S: ConfigSection>(section: &S) -> Result<(), PicEvolveError> {
    section.validate().map_err(|e| match e {
        PicEvolveError::Configuration(msg) => {
            PicEvolveError::Configuration(format!("[{}] {}", S::section_name(), msg))
        }
        other => other,
    })
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PicEvolveError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PicEvolveError::Configuration(format!("Failed to read config: {}", e)))?;

        let config = AppConfig::from_toml_str(&contents)?;
        log::info!("Loaded configuration from {}", path.display());

        *self.write_lock()? = config;
        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update<F>(&self, f: F) -> Result<(), PicEvolveError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut candidate = self.get();
        f(&mut candidate);
        candidate.validate()?;
        *self.write_lock()? = candidate;
        Ok(())
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, AppConfig>, PicEvolveError> {
        self.config
            .write()
            .map_err(|_| PicEvolveError::Configuration("Config lock poisoned".to_string()))
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [evolution]
            population_size = 16
            excluded_functions = ["blur", "emboss"]

            [render]
            width = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.evolution.population_size, 16);
        assert_eq!(config.evolution.max_attempts, 100);
        assert_eq!(config.render.width, 64);
        assert_eq!(config.render.height, 128);
        assert_eq!(config.evolution.registry().unwrap().len(), 24);
    }

    #[test]
    fn test_mutation_rates_from_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [evolution.mutation_rates]
            global = 0.1
            function = [1.0, 0.0, 0.0, 0.0, 0.0]
            scalar = [0.0, 1.0, 0.0, 0.0]
            variable = [0.0, 0.0, 1.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.evolution.mutation_rates.global, 0.1);
        assert_eq!(config.evolution.mutation_rates.scalar[1], 1.0);
    }

    #[test]
    fn test_flat_mutation_rates_from_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [evolution]
            mutation_rates = [0.2, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]
            "#,
        )
        .unwrap();
        let rates = &config.evolution.mutation_rates;
        assert_eq!(rates.global, 0.2);
        assert_eq!(rates.function[1], 1.0);
        assert_eq!(rates.scalar[0], 1.0);
        assert_eq!(rates.variable[1], 1.0);

        let err = AppConfig::from_toml_str("[evolution]\nmutation_rates = [0.2, 0.1]\n").unwrap_err();
        assert!(matches!(err, PicEvolveError::Configuration(_)));
    }

    #[test]
    fn test_errors_name_their_section() {
        let err = AppConfig::from_toml_str("[render]\nwidth = 0\n").unwrap_err();
        assert!(err.to_string().contains("[render] Image dimensions"));

        let err = AppConfig::from_toml_str("[evolution]\npopulation_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("[evolution] Population size"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_toml_str("[render]\nwidth = 0\n").is_err());
        assert!(AppConfig::from_toml_str("[evolution]\npopulation_size = \"many\"\n").is_err());
    }

    #[test]
    fn test_update_is_validated() {
        let manager = ConfigManager::new();
        assert!(manager.update(|c| c.render.height = 0).is_err());
        assert_eq!(manager.get().render.height, 128);
        manager.update(|c| c.render.height = 32).unwrap();
        assert_eq!(manager.get().render.height, 32);
    }

    #[test]
    fn test_missing_file() {
        let manager = ConfigManager::new();
        let err = manager.load_from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, PicEvolveError::Configuration(_)));
    }
}
