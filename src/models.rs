use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::error::InvalidTypeError;

/// Kind of quantity a sensor reports. Parsing is exact and case-sensitive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    Temperature,
    Humidity,
    Pressure,
}

/// A reading's value as it came from the source (number or text).
/// Generated updates are always text with two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Number(f64),
    Text(String),
}

impl ReadingValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ReadingValue::Number(n) => Some(*n),
            ReadingValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingValue::Number(n) => write!(f, "{}", n),
            ReadingValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ReadingValue {
    fn from(value: f64) -> Self {
        ReadingValue::Number(value)
    }
}

impl From<&str> for ReadingValue {
    fn from(value: &str) -> Self {
        ReadingValue::Text(value.to_string())
    }
}

/// Plain record as found in the readings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub value: ReadingValue,
    pub unit: String,
    pub updated_at: String,
}

/// A single sensor's current value plus metadata.
///
/// The type is checked once at construction and cannot be changed afterwards;
/// only `value` and `updated_at` move, through [`SensorReading::update_value`].
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    id: i64,
    name: String,
    sensor_type: SensorType,
    value: ReadingValue,
    unit: String,
    updated_at: String,
}

impl SensorReading {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        sensor_type: &str,
        value: impl Into<ReadingValue>,
        unit: impl Into<String>,
        updated_at: impl Into<String>,
    ) -> Result<Self, InvalidTypeError> {
        let sensor_type = sensor_type
            .parse::<SensorType>()
            .map_err(|_| InvalidTypeError {
                value: sensor_type.to_string(),
            })?;

        Ok(SensorReading {
            id,
            name: name.into(),
            sensor_type,
            value: value.into(),
            unit: unit.into(),
            updated_at: updated_at.into(),
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub fn value(&self) -> &ReadingValue {
        &self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// ISO-8601 timestamp of the last change, exactly as stored.
    pub fn updated_at(&self) -> &str {
        &self.updated_at
    }

    /// Replace the value and stamp the reading with the current UTC time.
    ///
    /// The new stamp is always later than the previous one when the previous
    /// one is valid RFC 3339, even if the clock has not moved a millisecond.
    /// A previous stamp with no representable successor (year 9999) is
    /// replaced by the current time.
    pub fn update_value(&mut self, new_value: impl Into<ReadingValue>) {
        self.value = new_value.into();
        self.updated_at = format_iso_millis(next_timestamp(&self.updated_at));
    }

    pub fn to_record(&self) -> SensorRecord {
        SensorRecord {
            id: self.id,
            name: self.name.clone(),
            sensor_type: self.sensor_type.to_string(),
            value: self.value.clone(),
            unit: self.unit.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

impl TryFrom<SensorRecord> for SensorReading {
    type Error = InvalidTypeError;

    fn try_from(record: SensorRecord) -> Result<Self, Self::Error> {
        SensorReading::new(
            record.id,
            record.name,
            &record.sensor_type,
            record.value,
            record.unit,
            record.updated_at,
        )
    }
}

fn next_timestamp(previous: &str) -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    // Stamps are written with millisecond precision
    let now = now - Duration::nanoseconds((now.nanosecond() % 1_000_000) as i64);

    let prev = match OffsetDateTime::parse(previous, &Rfc3339) {
        Ok(prev) if now <= prev => prev,
        _ => return now,
    };

    match prev
        .checked_add(Duration::milliseconds(1))
        .and_then(|next| next.checked_to_offset(UtcOffset::UTC))
    {
        Some(next) => next,
        None => {
            warn!(
                "Timestamp {} has no representable successor, using current time",
                previous
            );
            now
        }
    }
}

/// Format as `YYYY-MM-DDTHH:MM:SS.mmmZ`. Expects a UTC datetime.
fn format_iso_millis(dt: OffsetDateTime) -> String {
    let format = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    );
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}
