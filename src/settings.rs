//! Shared settings for the chinrest CLI.
//! Persisted in the platform-specific config directory via `directories::ProjectDirs`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::blindspot::BlindspotConfig;
use crate::calibration::{
    CalibrationConfig, CalibrationError, Unit, DEFAULT_INITIAL_SIZE_PX, DEFAULT_VIEWING_DISTANCE_MM,
};
use crate::config::{get_reference, CREDIT_CARD_HEIGHT_MM, CREDIT_CARD_WIDTH_MM};
use crate::procedure::ProcedureConfig;
use crate::store::{keys, VarValue, VariableStore};

/// Application settings that can be saved and loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Language code ("cn" or "en")
    pub lang: String,
    /// Target unit ("none", "cm", "inch" or "deg")
    pub unit: String,
    /// Reference object preset name; when set to a known preset it takes
    /// precedence over `item_width`/`item_height`. Empty uses the item size.
    pub reference: String,
    /// Reference object width in mm (ignored while `reference` names a preset)
    pub item_width: f64,
    /// Reference object height in mm (ignored while `reference` names a preset)
    pub item_height: f64,
    /// Initial box size in pixels
    pub item_init: f64,
    /// Viewing distance for degree conversion in mm
    pub viewing_distance_mm: f64,
    /// Run the blind spot task
    pub use_perceived_distance: bool,
    /// Blind spot repetitions
    pub blindspot_repetitions: u32,
    /// Designed viewing distance of the experiment in mm
    pub development_distance_mm: f64,
    /// Physical canvas width in mm
    pub canvas_width_mm: f64,
    /// Variable store file path
    pub store_path: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            unit: "cm".to_string(),
            reference: String::new(),
            item_width: CREDIT_CARD_WIDTH_MM,
            item_height: CREDIT_CARD_HEIGHT_MM,
            item_init: DEFAULT_INITIAL_SIZE_PX,
            viewing_distance_mm: DEFAULT_VIEWING_DISTANCE_MM,
            use_perceived_distance: false,
            blindspot_repetitions: 5,
            development_distance_mm: 500.0,
            canvas_width_mm: 300.0,
            store_path: "chinrest_vars.json".to_string(),
        }
    }
}

impl AppSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "moderras", "virtual-chinrest")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file.
    pub fn load() -> Self {
        let defaults = Self::default();

        let mut loaded: Self = Self::settings_path()
            .and_then(|path| fs::read_to_string(&path).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();

        // Backfill fields that older config files left empty
        if loaded.unit.is_empty() {
            loaded.unit = defaults.unit;
        }
        if loaded.store_path.is_empty() {
            loaded.store_path = defaults.store_path;
        }
        if loaded.blindspot_repetitions == 0 {
            loaded.blindspot_repetitions = defaults.blindspot_repetitions;
        }

        loaded
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<(), String> {
        let dir = Self::config_dir().ok_or("Cannot determine config directory")?;

        // Create config directory if it doesn't exist
        fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;

        let path = dir.join("settings.json");
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(&path, content)
            .map_err(|e| format!("Failed to write settings file: {}", e))?;

        Ok(())
    }

    /// Reference object size, preferring a known preset.
    pub fn reference_size(&self) -> (f64, f64) {
        get_reference(&self.reference).unwrap_or((self.item_width, self.item_height))
    }

    /// Build the resize calibration configuration.
    pub fn calibration_config(&self) -> Result<CalibrationConfig, CalibrationError> {
        let unit = self
            .unit
            .parse::<Unit>()
            .map_err(|e| CalibrationError::InvalidConfig(e.to_string()))?;
        let (width, height) = self.reference_size();

        let config = CalibrationConfig::default()
            .with_unit(unit)
            .with_reference(width, height)
            .with_initial_size(self.item_init)
            .with_viewing_distance(self.viewing_distance_mm)
            .with_lang(&self.lang);
        config.validate()?;
        Ok(config)
    }

    /// Build the full procedure configuration.
    pub fn procedure_config(&self) -> Result<ProcedureConfig, CalibrationError> {
        Ok(self.apply_to(ProcedureConfig::default().with_calibration(self.calibration_config()?)))
    }

    /// Write the calibration settings into a host store for every key it
    /// does not already hold. Values already in the store win.
    pub fn seed_store<S: VariableStore + ?Sized>(&self, vars: &mut S) {
        let (width, height) = self.reference_size();
        let values = [
            (keys::RESIZE_UNIT, VarValue::from(self.unit.as_str())),
            (keys::ITEM_WIDTH, VarValue::Number(width)),
            (keys::ITEM_HEIGHT, VarValue::Number(height)),
            (keys::ITEM_INIT, VarValue::Number(self.item_init)),
        ];
        for (key, value) in values {
            if !vars.contains(key) {
                vars.set(key, value);
            }
        }
    }

    /// Build the procedure configuration from a host store.
    ///
    /// Unit, reference size, initial size and the allowed units come from
    /// the store; the remaining fields come from these settings.
    pub fn procedure_config_from_store<S: VariableStore + ?Sized>(
        &self,
        vars: &S,
    ) -> Result<ProcedureConfig, CalibrationError> {
        let mut config = ProcedureConfig::from_store(vars)?;
        config.calibration = config
            .calibration
            .with_viewing_distance(self.viewing_distance_mm)
            .with_lang(&self.lang);
        Ok(self.apply_to(config))
    }

    fn apply_to(&self, config: ProcedureConfig) -> ProcedureConfig {
        let (canvas_width_px, canvas_height_px) = (config.canvas_width_px, config.canvas_height_px);
        config
            .with_perceived_distance(self.use_perceived_distance)
            .with_blindspot(BlindspotConfig::default().with_repetitions(self.blindspot_repetitions))
            .with_development_distance(self.development_distance_mm)
            .with_canvas(canvas_width_px, canvas_height_px, self.canvas_width_mm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{seed_defaults, MemoryStore};

    #[test]
    fn test_defaults_build_valid_config() {
        let settings = AppSettings::default();
        let config = settings.calibration_config().unwrap();
        assert_eq!(config.unit, Unit::Cm);
        assert_eq!(config.reference_width_mm, 85.60);
        assert_eq!(config.initial_size_px, 250.0);
    }

    #[test]
    fn test_edited_item_size_used_by_default() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"item_width": 100.0, "item_height": 50.0}"#).unwrap();
        assert_eq!(settings.reference_size(), (100.0, 50.0));
        assert_eq!(AppSettings::default().reference_size(), (85.60, 53.98));
    }

    #[test]
    fn test_store_values_win_over_settings() {
        let settings = AppSettings {
            unit: "inch".to_string(),
            item_width: 100.0,
            item_height: 50.0,
            lang: "cn".to_string(),
            ..AppSettings::default()
        };
        let mut vars = MemoryStore::new();
        vars.set(keys::ITEM_WIDTH, VarValue::Number(210.0));
        vars.set(keys::ITEM_HEIGHT, VarValue::Number(297.0));
        settings.seed_store(&mut vars);
        seed_defaults(&mut vars);

        let config = settings.procedure_config_from_store(&vars).unwrap();
        assert_eq!(config.calibration.unit, Unit::Inch);
        assert_eq!(config.calibration.reference_width_mm, 210.0);
        assert_eq!(config.calibration.reference_height_mm, 297.0);
        assert_eq!(config.calibration.lang, "cn");
        assert_eq!(config.canvas_width_mm, 300.0);
    }

    #[test]
    fn test_store_disallowed_unit_rejected() {
        let settings = AppSettings {
            unit: "deg".to_string(),
            ..AppSettings::default()
        };
        let mut vars = MemoryStore::new();
        vars.set(keys::ALLOWED_RESIZE_UNITS, VarValue::from("cm,inch"));
        settings.seed_store(&mut vars);
        seed_defaults(&mut vars);

        assert!(matches!(
            settings.procedure_config_from_store(&vars),
            Err(CalibrationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_preset_overrides_item_size() {
        let settings = AppSettings {
            reference: "a4".to_string(),
            item_width: 1.0,
            item_height: 1.0,
            ..AppSettings::default()
        };
        assert_eq!(settings.reference_size(), (210.0, 297.0));

        let custom = AppSettings {
            reference: String::new(),
            item_width: 100.0,
            item_height: 60.0,
            ..AppSettings::default()
        };
        assert_eq!(custom.reference_size(), (100.0, 60.0));
    }

    #[test]
    fn test_bad_unit_rejected() {
        let settings = AppSettings {
            unit: "furlong".to_string(),
            ..AppSettings::default()
        };
        assert!(matches!(
            settings.calibration_config(),
            Err(CalibrationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: AppSettings = serde_json::from_str(r#"{"unit": "inch"}"#).unwrap();
        assert_eq!(settings.unit, "inch");
        assert_eq!(settings.item_init, 250.0);
        assert_eq!(settings.blindspot_repetitions, 5);
    }

    #[test]
    fn test_procedure_config() {
        let settings = AppSettings {
            use_perceived_distance: true,
            blindspot_repetitions: 3,
            ..AppSettings::default()
        };
        let config = settings.procedure_config().unwrap();
        assert!(config.use_perceived_distance);
        assert_eq!(config.blindspot.repetitions, 3);
        assert_eq!(config.canvas_width_mm, 300.0);
    }
}
