//! Temperature conversion formulas.
//!
//! Temperature scales do not share a common zero, so the linear multiplier
//! path does not apply. Every conversion routes through Celsius as the
//! pivot scale.

use crate::error::{ConvertError, Result};

fn to_celsius(value: f64, from_id: &str) -> Result<f64> {
    match from_id {
        "celsius" => Ok(value),
        "fahrenheit" => Ok((value - 32.0) * 5.0 / 9.0),
        "kelvin" => Ok(value - 273.15),
        "rankine" => Ok((value - 491.67) * 5.0 / 9.0),
        other => Err(ConvertError::Conversion(format!(
            "unknown temperature unit '{}'",
            other
        ))),
    }
}

fn from_celsius(celsius: f64, to_id: &str) -> Result<f64> {
    match to_id {
        "celsius" => Ok(celsius),
        "fahrenheit" => Ok(celsius * 9.0 / 5.0 + 32.0),
        "kelvin" => Ok(celsius + 273.15),
        "rankine" => Ok((celsius + 273.15) * 9.0 / 5.0),
        other => Err(ConvertError::Conversion(format!(
            "unknown temperature unit '{}'",
            other
        ))),
    }
}

pub fn convert(value: f64, from_id: &str, to_id: &str) -> Result<f64> {
    from_celsius(to_celsius(value, from_id)?, to_id)
}
