/// In-memory registry of sensor readings
use log::debug;
use rand::Rng;

use crate::error::{LoadError, NotFoundError};
use crate::generator::generate_value;
use crate::models::SensorReading;
use crate::source;

/// Ordered collection of readings. Entries are only ever appended or
/// updated in place.
#[derive(Debug, Default)]
pub struct SensorRegistry {
    readings: Vec<SensorReading>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading. Ids are not checked for duplicates.
    pub fn add(&mut self, reading: SensorReading) {
        self.readings.push(reading);
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Load every record behind `locator` and append them in source order.
    ///
    /// Records are appended as they are validated, so an invalid type part
    /// way through leaves the earlier records in place. Transport and parse
    /// failures happen before anything is appended.
    ///
    /// # Returns
    /// Number of readings appended
    pub async fn load_from(&mut self, locator: &str) -> Result<usize, LoadError> {
        let body = source::fetch(locator).await?;
        let records = source::parse_records(&body)?;
        let count = records.len();

        for record in records {
            let reading = SensorReading::try_from(record)?;
            debug!(
                "Loaded sensor {} ({}, {})",
                reading.id(),
                reading.name(),
                reading.sensor_type()
            );
            self.add(reading);
        }

        Ok(count)
    }

    /// First reading with the given id.
    #[cfg(test)]
    pub fn find(&self, id: i64) -> Option<&SensorReading> {
        self.readings.iter().find(|reading| reading.id() == id)
    }

    /// Give the first reading with `id` a fresh random value for its type.
    pub fn update_by_id<R: Rng + ?Sized>(
        &mut self,
        id: i64,
        rng: &mut R,
    ) -> Result<&SensorReading, NotFoundError> {
        let reading = self
            .readings
            .iter_mut()
            .find(|reading| reading.id() == id)
            .ok_or(NotFoundError { id })?;

        let value = generate_value(reading.sensor_type(), rng);
        reading.update_value(value);
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReadingValue;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::PathBuf;
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    const TWO_SENSORS: &str = r#"[
        {"id": 1, "name": "A", "type": "temperature", "value": 20, "unit": "C", "updated_at": "2024-01-01T00:00:00Z"},
        {"id": 2, "name": "B", "type": "humidity", "value": 50, "unit": "%", "updated_at": "2024-01-01T00:00:00Z"}
    ]"#;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "sensor-dashboard-{}-{}.json",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn populated() -> SensorRegistry {
        let mut registry = SensorRegistry::new();
        for (id, sensor_type) in [(1, "temperature"), (2, "humidity"), (3, "pressure")] {
            registry.add(
                SensorReading::new(id, "S", sensor_type, 10.0, "u", "2024-01-01T00:00:00Z")
                    .unwrap(),
            );
        }
        registry
    }

    /// Serve exactly one request with the given status and body.
    fn one_shot_server(status: u16, body: &'static str) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        std::thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let _ = request.respond(
                    tiny_http::Response::from_string(body).with_status_code(status),
                );
            }
        });
        format!("http://{}/sensors.json", addr)
    }

    #[tokio::test]
    async fn loads_records_in_source_order() {
        let path = write_temp("two", TWO_SENSORS);
        let mut registry = SensorRegistry::new();

        let count = registry.load_from(path.to_str().unwrap()).await.unwrap();

        assert_eq!(count, 2);
        let readings = registry.readings();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].id(), 1);
        assert_eq!(readings[0].name(), "A");
        assert_eq!(readings[0].sensor_type().to_string(), "temperature");
        assert_eq!(readings[0].value(), &ReadingValue::Number(20.0));
        assert_eq!(readings[0].unit(), "C");
        assert_eq!(readings[0].updated_at(), "2024-01-01T00:00:00Z");
        assert_eq!(readings[1].id(), 2);
        assert_eq!(readings[1].name(), "B");
        assert_eq!(readings[1].sensor_type().to_string(), "humidity");
        assert_eq!(readings[1].value(), &ReadingValue::Number(50.0));
        assert_eq!(readings[1].unit(), "%");

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn loads_over_http() {
        let url = one_shot_server(200, TWO_SENSORS);
        let mut registry = SensorRegistry::new();

        assert_eq!(registry.load_from(&url).await.unwrap(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn failed_response_leaves_registry_untouched() {
        let url = one_shot_server(503, "unavailable");
        let mut registry = SensorRegistry::new();

        let err = registry.load_from(&url).await.unwrap_err();

        assert!(matches!(err, LoadError::Status { status: 503, .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn failed_reload_keeps_existing_readings() {
        let mut registry = populated();
        let before = registry.readings().to_vec();
        let url = one_shot_server(500, "boom");

        let err = registry.load_from(&url).await.unwrap_err();

        assert!(matches!(err, LoadError::Status { status: 500, .. }));
        assert_eq!(registry.readings(), before.as_slice());
    }

    #[tokio::test]
    async fn invalid_record_aborts_rest_of_batch() {
        let path = write_temp(
            "invalid",
            r#"[
                {"id": 1, "name": "A", "type": "temperature", "value": 1, "unit": "C", "updated_at": "2024-01-01T00:00:00Z"},
                {"id": 2, "name": "B", "type": "wind", "value": 2, "unit": "m/s", "updated_at": "2024-01-01T00:00:00Z"},
                {"id": 3, "name": "C", "type": "pressure", "value": 3, "unit": "hPa", "updated_at": "2024-01-01T00:00:00Z"}
            ]"#,
        );
        let mut registry = SensorRegistry::new();

        let err = registry.load_from(path.to_str().unwrap()).await.unwrap_err();

        assert!(matches!(err, LoadError::InvalidRecord(ref e) if e.value == "wind"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.readings()[0].id(), 1);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn update_of_unknown_id_changes_nothing() {
        let mut registry = populated();
        let before = registry.readings().to_vec();
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(
            registry.update_by_id(42, &mut rng).unwrap_err(),
            NotFoundError { id: 42 }
        );
        assert_eq!(registry.readings(), before.as_slice());
    }

    #[test]
    fn update_touches_only_the_target() {
        let mut registry = populated();
        let before = registry.readings().to_vec();
        let mut rng = StdRng::seed_from_u64(2);

        let updated = registry.update_by_id(3, &mut rng).unwrap();
        let value = updated.value().as_f64().unwrap();
        assert!((960.0..=1040.0).contains(&value));

        let readings = registry.readings();
        assert_eq!(readings[0], before[0]);
        assert_eq!(readings[1], before[1]);

        let old = OffsetDateTime::parse(before[2].updated_at(), &Rfc3339).unwrap();
        let new = OffsetDateTime::parse(readings[2].updated_at(), &Rfc3339).unwrap();
        assert!(new > old);
    }

    #[test]
    fn update_picks_first_of_duplicate_ids() {
        let mut registry = SensorRegistry::new();
        for name in ["first", "second"] {
            registry.add(
                SensorReading::new(5, name, "humidity", 1.0, "%", "2024-01-01T00:00:00Z")
                    .unwrap(),
            );
        }
        let mut rng = StdRng::seed_from_u64(3);

        assert_eq!(registry.update_by_id(5, &mut rng).unwrap().name(), "first");
        assert_eq!(registry.readings()[1].value(), &ReadingValue::Number(1.0));
        assert_eq!(registry.find(5).map(|r| r.name()), Some("first"));
    }
}
