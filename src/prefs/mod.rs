//! User preferences: a validated, observable settings object.
//!
//! Preferences never die: corrupt or partial persisted data is merged over
//! a complete default object, so callers always see every field.

mod store;

pub use store::{PreferencesExport, PreferencesStore, Subscription};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    Medium,
    Large,
}

/// Maximum accepted decimal places for display formatting.
pub const MAX_DECIMAL_PLACES: u8 = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub default_currency: String,
    pub default_zone: String,
    /// Per-category preferred unit ids, keyed by category id.
    pub preferred_units: HashMap<String, String>,
    pub decimal_places: u8,
    pub theme: Theme,
    pub high_contrast: bool,
    pub reduce_motion: bool,
    pub font_size: FontSize,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            default_currency: "USD".to_string(),
            default_zone: "UTC".to_string(),
            preferred_units: HashMap::new(),
            decimal_places: 2,
            theme: Theme::System,
            high_contrast: false,
            reduce_motion: false,
            font_size: FontSize::Medium,
        }
    }
}

impl UserPreferences {
    /// Range and enum checks over a fully-formed object.
    pub fn is_valid(&self) -> bool {
        if self.decimal_places > MAX_DECIMAL_PLACES {
            return false;
        }
        if crate::currency::find_currency(&self.default_currency).is_none() {
            return false;
        }
        if !crate::timezone::validate_zone(&self.default_zone) {
            return false;
        }
        self.preferred_units.iter().all(|(category, unit_id)| {
            crate::units::find_unit(unit_id).is_some_and(|u| u.category == category)
        })
    }
}
