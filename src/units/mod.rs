//! Table-driven unit conversion.
//!
//! Eleven measurement categories, each with a base unit that every other
//! unit in the category scales to linearly. Temperature is the exception
//! and goes through explicit pairwise formulas instead.

mod catalog;
mod engine;
mod temperature;

pub use catalog::{categories, find_unit, supported_units, Unit, UnitCategory};
pub use engine::{ConversionResult, UnitEngine};
