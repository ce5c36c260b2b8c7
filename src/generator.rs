/// Simulated value generation for sensor updates
use rand::Rng;

use crate::models::{ReadingValue, SensorType};

/// Inclusive range a simulated value is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Used for type names outside the known set.
    pub const FALLBACK: ValueRange = ValueRange {
        min: 0.0,
        max: 100.0,
    };

    pub fn for_type(sensor_type: SensorType) -> Self {
        match sensor_type {
            // Degrees Celsius
            SensorType::Temperature => ValueRange {
                min: -30.0,
                max: 50.0,
            },
            // Relative humidity, percent
            SensorType::Humidity => ValueRange {
                min: 0.0,
                max: 100.0,
            },
            // hPa
            SensorType::Pressure => ValueRange {
                min: 960.0,
                max: 1040.0,
            },
        }
    }

    /// Range for a raw type name, falling back to [`ValueRange::FALLBACK`].
    #[cfg(test)]
    pub fn for_type_name(name: &str) -> Self {
        name.parse::<SensorType>()
            .map(Self::for_type)
            .unwrap_or(Self::FALLBACK)
    }

    #[cfg(test)]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Draw a uniform value rounded to two decimal places.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let value = rng.gen_range(self.min..=self.max);
        // Adding 0.0 turns a rounded -0.0 into 0.0
        (value * 100.0).round() / 100.0 + 0.0
    }
}

/// Generate a new value for a sensor of the given type, as two-decimal text.
pub fn generate_value<R: Rng + ?Sized>(sensor_type: SensorType, rng: &mut R) -> ReadingValue {
    let value = ValueRange::for_type(sensor_type).sample(rng);
    ReadingValue::Text(format!("{:.2}", value))
}
