//! Unit conversions for the SI-internal data model.
//!
//! All stored quantities are SI (metres, seconds, kilograms, kelvin, pascal).
//! These helpers convert at the edges, where inputs arrive in aviation units.

/// Converts feet to metres.
pub fn from_feet(feet: f64) -> f64 {
    feet * 0.3048
}

/// Converts knots to metres per second.
pub fn from_knots(knots: f64) -> f64 {
    knots * 1852.0 / 3600.0
}

/// Converts kelvin to degrees Celsius.
pub fn to_celsius(kelvin: f64) -> f64 {
    kelvin - 273.15
}

/// Converts degrees Celsius to kelvin.
pub fn from_celsius(celsius: f64) -> f64 {
    celsius + 273.15
}

/// Converts hectopascal to pascal.
pub fn from_hectopascal(hectopascal: f64) -> f64 {
    hectopascal * 100.0
}

/// Converts a kg/kg emission index to g/kg.
pub fn to_grams_per_kilogram(kg_per_kg: f64) -> f64 {
    kg_per_kg * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feet_round_trip() {
        assert!((from_feet(1000.0) - 304.8).abs() < 1e-9);
    }

    #[test]
    fn test_knots() {
        assert!((from_knots(160.0) - 82.31111111111112).abs() < 1e-9);
    }
}
