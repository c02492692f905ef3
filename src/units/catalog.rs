//! Static unit tables.
//!
//! Every unit carries a linear multiplier to its category's base unit.
//! Temperature multipliers are unused (fixed 1.0); those conversions run
//! through the formula table in `temperature.rs`.

use std::sync::OnceLock;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    pub id: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    pub category: &'static str,
    /// Linear scale to the category base unit. Always positive.
    pub base_multiplier: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitCategory {
    pub id: &'static str,
    pub name: &'static str,
    pub base_unit: &'static str,
    pub units: Vec<Unit>,
}

static CATALOG: OnceLock<Vec<UnitCategory>> = OnceLock::new();

const fn unit(
    id: &'static str,
    name: &'static str,
    symbol: &'static str,
    category: &'static str,
    base_multiplier: f64,
) -> Unit {
    Unit {
        id,
        name,
        symbol,
        category,
        base_multiplier,
    }
}

fn build_catalog() -> Vec<UnitCategory> {
    vec![
        UnitCategory {
            id: "length",
            name: "Length",
            base_unit: "meter",
            units: vec![
                unit("millimeter", "Millimeter", "mm", "length", 0.001),
                unit("centimeter", "Centimeter", "cm", "length", 0.01),
                unit("meter", "Meter", "m", "length", 1.0),
                unit("kilometer", "Kilometer", "km", "length", 1000.0),
                unit("inch", "Inch", "in", "length", 0.0254),
                unit("foot", "Foot", "ft", "length", 0.3048),
                unit("yard", "Yard", "yd", "length", 0.9144),
                unit("mile", "Mile", "mi", "length", 1609.344),
            ],
        },
        UnitCategory {
            id: "weight",
            name: "Weight",
            base_unit: "kilogram",
            units: vec![
                unit("milligram", "Milligram", "mg", "weight", 0.000001),
                unit("gram", "Gram", "g", "weight", 0.001),
                unit("kilogram", "Kilogram", "kg", "weight", 1.0),
                unit("tonne", "Tonne", "t", "weight", 1000.0),
                unit("ounce", "Ounce", "oz", "weight", 0.028349523125),
                unit("pound", "Pound", "lb", "weight", 0.45359237),
                unit("stone", "Stone", "st", "weight", 6.35029318),
            ],
        },
        UnitCategory {
            id: "temperature",
            name: "Temperature",
            base_unit: "celsius",
            units: vec![
                unit("celsius", "Celsius", "°C", "temperature", 1.0),
                unit("fahrenheit", "Fahrenheit", "°F", "temperature", 1.0),
                unit("kelvin", "Kelvin", "K", "temperature", 1.0),
                unit("rankine", "Rankine", "°R", "temperature", 1.0),
            ],
        },
        UnitCategory {
            id: "volume",
            name: "Volume",
            base_unit: "liter",
            units: vec![
                unit("milliliter", "Milliliter", "mL", "volume", 0.001),
                unit("liter", "Liter", "L", "volume", 1.0),
                unit("cubic_meter", "Cubic Meter", "m³", "volume", 1000.0),
                unit("teaspoon", "Teaspoon", "tsp", "volume", 0.00492892159375),
                unit("tablespoon", "Tablespoon", "tbsp", "volume", 0.01478676478125),
                unit("fluid_ounce", "Fluid Ounce", "fl oz", "volume", 0.0295735295625),
                unit("cup", "Cup", "cup", "volume", 0.2365882365),
                unit("gallon", "Gallon", "gal", "volume", 3.785411784),
            ],
        },
        UnitCategory {
            id: "area",
            name: "Area",
            base_unit: "square_meter",
            units: vec![
                unit("square_meter", "Square Meter", "m²", "area", 1.0),
                unit("square_kilometer", "Square Kilometer", "km²", "area", 1_000_000.0),
                unit("square_foot", "Square Foot", "ft²", "area", 0.09290304),
                unit("square_mile", "Square Mile", "mi²", "area", 2_589_988.110336),
                unit("acre", "Acre", "ac", "area", 4046.8564224),
                unit("hectare", "Hectare", "ha", "area", 10_000.0),
            ],
        },
        UnitCategory {
            id: "speed",
            name: "Speed",
            base_unit: "meter_per_second",
            units: vec![
                unit("meter_per_second", "Meter per Second", "m/s", "speed", 1.0),
                unit("kilometer_per_hour", "Kilometer per Hour", "km/h", "speed", 0.2777777777777778),
                unit("mile_per_hour", "Mile per Hour", "mph", "speed", 0.44704),
                unit("knot", "Knot", "kn", "speed", 0.5144444444444445),
                unit("foot_per_second", "Foot per Second", "ft/s", "speed", 0.3048),
            ],
        },
        UnitCategory {
            id: "time",
            name: "Time",
            base_unit: "second",
            units: vec![
                unit("millisecond", "Millisecond", "ms", "time", 0.001),
                unit("second", "Second", "s", "time", 1.0),
                unit("minute", "Minute", "min", "time", 60.0),
                unit("hour", "Hour", "h", "time", 3600.0),
                unit("day", "Day", "d", "time", 86_400.0),
                unit("week", "Week", "wk", "time", 604_800.0),
                unit("year", "Year", "yr", "time", 31_557_600.0),
            ],
        },
        UnitCategory {
            id: "digital_storage",
            name: "Digital Storage",
            base_unit: "byte",
            units: vec![
                unit("bit", "Bit", "b", "digital_storage", 0.125),
                unit("byte", "Byte", "B", "digital_storage", 1.0),
                unit("kilobyte", "Kilobyte", "KB", "digital_storage", 1024.0),
                unit("megabyte", "Megabyte", "MB", "digital_storage", 1_048_576.0),
                unit("gigabyte", "Gigabyte", "GB", "digital_storage", 1_073_741_824.0),
                unit("terabyte", "Terabyte", "TB", "digital_storage", 1_099_511_627_776.0),
            ],
        },
        UnitCategory {
            id: "energy",
            name: "Energy",
            base_unit: "joule",
            units: vec![
                unit("joule", "Joule", "J", "energy", 1.0),
                unit("kilojoule", "Kilojoule", "kJ", "energy", 1000.0),
                unit("calorie", "Calorie", "cal", "energy", 4.184),
                unit("kilocalorie", "Kilocalorie", "kcal", "energy", 4184.0),
                unit("watt_hour", "Watt Hour", "Wh", "energy", 3600.0),
                unit("kilowatt_hour", "Kilowatt Hour", "kWh", "energy", 3_600_000.0),
                unit("electronvolt", "Electronvolt", "eV", "energy", 1.602176634e-19),
            ],
        },
        UnitCategory {
            id: "pressure",
            name: "Pressure",
            base_unit: "pascal",
            units: vec![
                unit("pascal", "Pascal", "Pa", "pressure", 1.0),
                unit("kilopascal", "Kilopascal", "kPa", "pressure", 1000.0),
                unit("bar", "Bar", "bar", "pressure", 100_000.0),
                unit("atmosphere", "Atmosphere", "atm", "pressure", 101_325.0),
                unit("psi", "Pound per Square Inch", "psi", "pressure", 6894.757293168),
                unit("torr", "Torr", "Torr", "pressure", 133.32236842105263),
            ],
        },
        UnitCategory {
            id: "angle",
            name: "Angle",
            base_unit: "degree",
            units: vec![
                unit("degree", "Degree", "°", "angle", 1.0),
                unit("radian", "Radian", "rad", "angle", 57.29577951308232),
                unit("gradian", "Gradian", "gon", "angle", 0.9),
                unit("arcminute", "Arcminute", "′", "angle", 0.016666666666666666),
                unit("arcsecond", "Arcsecond", "″", "angle", 0.0002777777777777778),
                unit("turn", "Turn", "tr", "angle", 360.0),
            ],
        },
    ]
}

/// All categories, built once.
pub fn categories() -> &'static [UnitCategory] {
    CATALOG.get_or_init(build_catalog)
}

/// Units of one category, or an empty slice for an unknown id.
pub fn supported_units(category_id: &str) -> &'static [Unit] {
    categories()
        .iter()
        .find(|c| c.id == category_id)
        .map(|c| c.units.as_slice())
        .unwrap_or(&[])
}

/// Resolve a unit id across all categories.
pub fn find_unit(unit_id: &str) -> Option<&'static Unit> {
    categories()
        .iter()
        .flat_map(|c| c.units.iter())
        .find(|u| u.id == unit_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_eleven_categories() {
        assert_eq!(categories().len(), 11);
    }

    #[test]
    fn test_every_base_unit_has_multiplier_one() {
        for category in categories() {
            let base = category
                .units
                .iter()
                .find(|u| u.id == category.base_unit)
                .unwrap_or_else(|| panic!("category {} missing base unit", category.id));
            assert_eq!(base.base_multiplier, 1.0, "base unit of {}", category.id);
        }
    }

    #[test]
    fn test_all_multipliers_positive() {
        for category in categories() {
            for unit in &category.units {
                assert!(
                    unit.base_multiplier > 0.0,
                    "{} has non-positive multiplier",
                    unit.id
                );
                assert_eq!(unit.category, category.id);
            }
        }
    }

    #[test]
    fn test_unit_ids_are_globally_unique() {
        let mut seen = std::collections::HashSet::new();
        for category in categories() {
            for unit in &category.units {
                assert!(seen.insert(unit.id), "duplicate unit id {}", unit.id);
            }
        }
    }

    #[test]
    fn test_find_unit_resolves_known_ids() {
        assert!(find_unit("meter").is_some());
        assert!(find_unit("fahrenheit").is_some());
        assert!(find_unit("warp_factor").is_none());
    }
}
