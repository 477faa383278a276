//! Host variable store.
//!
//! The experiment runtime owns a flat key-value store. Calibration reads its
//! configuration from it and writes the measured ratios back. Keys are plain
//! strings, values are numbers or string enums; there is no schema version.

mod file;
mod memory;

pub use file::{JsonFileStore, StoreError};
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationError, Unit};

/// Well-known variable names.
pub mod keys {
    pub const ALLOWED_RESIZE_UNITS: &str = "allowed_resize_units";
    pub const RESIZE_UNIT: &str = "resize_unit";
    pub const PIXELS_PER_UNIT: &str = "pixels_per_unit";
    pub const ITEM_WIDTH: &str = "item_width";
    pub const ITEM_HEIGHT: &str = "item_height";
    pub const ITEM_INIT: &str = "item_init";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const PX2MM: &str = "px2mm";
    pub const CALCULATED_DPI: &str = "calculated_dpi";
    pub const VIEW_DISTANCE: &str = "view_distance";
    pub const SCALING_FACTOR: &str = "scaling_factor";
    pub const SQUEEZE: &str = "squeeze";
}

/// A single store value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl VarValue {
    /// Numeric view; numeric text is accepted since hosts often store numbers as strings.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            VarValue::Number(n) => Some(*n),
            VarValue::Text(s) => s.trim().parse().ok(),
            VarValue::List(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            VarValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for VarValue {
    fn from(value: f64) -> Self {
        VarValue::Number(value)
    }
}

impl From<&str> for VarValue {
    fn from(value: &str) -> Self {
        VarValue::Text(value.to_string())
    }
}

impl From<String> for VarValue {
    fn from(value: String) -> Self {
        VarValue::Text(value)
    }
}

impl From<Vec<String>> for VarValue {
    fn from(value: Vec<String>) -> Self {
        VarValue::List(value)
    }
}

impl From<Unit> for VarValue {
    fn from(value: Unit) -> Self {
        VarValue::Text(value.as_str().to_string())
    }
}

/// Read/write access to the host's experiment variables.
pub trait VariableStore {
    /// Get a value by key.
    fn get(&self, key: &str) -> Option<VarValue>;

    /// Set or replace a value.
    fn set(&mut self, key: &str, value: VarValue);

    /// Check if a key exists.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl<T: VariableStore + ?Sized> VariableStore for &mut T {
    fn get(&self, key: &str) -> Option<VarValue> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: VarValue) {
        (**self).set(key, value)
    }
}

/// Write the plugin defaults for every key not already present.
pub fn seed_defaults<S: VariableStore + ?Sized>(store: &mut S) {
    use crate::calibration::{DEFAULT_INITIAL_SIZE_PX, DEFAULT_PIXELS_PER_UNIT};
    use crate::config::{CREDIT_CARD_HEIGHT_MM, CREDIT_CARD_WIDTH_MM};

    let defaults = [
        (
            keys::ALLOWED_RESIZE_UNITS,
            VarValue::List(Unit::ALL.iter().map(|u| u.as_str().to_string()).collect()),
        ),
        (keys::RESIZE_UNIT, VarValue::from(Unit::default())),
        (keys::PIXELS_PER_UNIT, VarValue::Number(DEFAULT_PIXELS_PER_UNIT)),
        (keys::ITEM_HEIGHT, VarValue::Number(CREDIT_CARD_HEIGHT_MM)),
        (keys::ITEM_WIDTH, VarValue::Number(CREDIT_CARD_WIDTH_MM)),
        (keys::ITEM_INIT, VarValue::Number(DEFAULT_INITIAL_SIZE_PX)),
    ];

    for (key, value) in defaults {
        if !store.contains(key) {
            store.set(key, value);
        }
    }
}

/// Read an optional number; a present non-numeric value is an error.
pub fn read_number<S: VariableStore + ?Sized>(
    store: &S,
    key: &str,
) -> Result<Option<f64>, CalibrationError> {
    match store.get(key) {
        None => Ok(None),
        Some(value) => value.as_number().map(Some).ok_or_else(|| {
            CalibrationError::InvalidConfig(format!("{} must be numeric, got {:?}", key, value))
        }),
    }
}

/// Read an optional string; a present non-text value is an error.
pub fn read_text<S: VariableStore + ?Sized>(
    store: &S,
    key: &str,
) -> Result<Option<String>, CalibrationError> {
    match store.get(key) {
        None => Ok(None),
        Some(VarValue::Text(text)) => Ok(Some(text)),
        Some(value) => Err(CalibrationError::InvalidConfig(format!(
            "{} must be text, got {:?}",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_number() {
        assert_eq!(VarValue::Number(2.5).as_number(), Some(2.5));
        assert_eq!(VarValue::from(" 85.6 ").as_number(), Some(85.6));
        assert_eq!(VarValue::from("abc").as_number(), None);
        assert_eq!(VarValue::List(vec![]).as_number(), None);
    }

    #[test]
    fn test_untagged_json() {
        let values: Vec<VarValue> = serde_json::from_str(r#"[1.5, "cm", ["none", "deg"]]"#).unwrap();
        assert_eq!(values[0], VarValue::Number(1.5));
        assert_eq!(values[1], VarValue::from("cm"));
        assert_eq!(
            values[2],
            VarValue::List(vec!["none".to_string(), "deg".to_string()])
        );
    }

    #[test]
    fn test_seed_defaults_keeps_existing() {
        let mut store = MemoryStore::new();
        store.set(keys::ITEM_INIT, VarValue::Number(400.0));
        seed_defaults(&mut store);

        assert_eq!(store.get(keys::ITEM_INIT), Some(VarValue::Number(400.0)));
        assert_eq!(store.get(keys::ITEM_WIDTH), Some(VarValue::Number(85.60)));
        assert_eq!(store.get(keys::ITEM_HEIGHT), Some(VarValue::Number(53.98)));
        assert_eq!(store.get(keys::PIXELS_PER_UNIT), Some(VarValue::Number(100.0)));
        assert_eq!(
            store.get(keys::ALLOWED_RESIZE_UNITS),
            Some(VarValue::List(vec![
                "none".to_string(),
                "cm".to_string(),
                "inch".to_string(),
                "deg".to_string()
            ]))
        );
    }

    #[test]
    fn test_read_helpers() {
        let mut store = MemoryStore::new();
        store.set("n", VarValue::Number(3.0));
        store.set("t", VarValue::from("x"));

        assert_eq!(read_number(&store, "n").unwrap(), Some(3.0));
        assert_eq!(read_number(&store, "missing").unwrap(), None);
        assert!(read_number(&store, "t").is_err());
        assert_eq!(read_text(&store, "t").unwrap(), Some("x".to_string()));
        assert!(read_text(&store, "n").is_err());
    }
}
