/// Application context: single owner of the registry and the rendered view
use log::{error, info};
use rand::Rng;
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::{HandleError, NotFoundError};
use crate::models::SensorRecord;
use crate::registry::SensorRegistry;
use crate::render::render_container;

/// Requests handled by the context task, one at a time.
#[derive(Debug)]
pub enum Command {
    Update {
        id: i64,
        reply: oneshot::Sender<Result<(), NotFoundError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<SensorRecord>>,
    },
}

/// Create the rendering target: a watch channel holding the latest container.
pub fn surface() -> (watch::Sender<String>, watch::Receiver<String>) {
    watch::channel(render_container(&[]))
}

pub struct AppContext<R> {
    registry: SensorRegistry,
    rng: R,
    surface: watch::Sender<String>,
}

impl<R: Rng> AppContext<R> {
    pub fn new(registry: SensorRegistry, rng: R, surface: watch::Sender<String>) -> Self {
        AppContext {
            registry,
            rng,
            surface,
        }
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    /// Load readings and render. Failures are logged, not returned; the
    /// registry keeps whatever was appended before the failure.
    ///
    /// # Returns
    /// true if the load succeeded
    pub async fn load(&mut self, locator: &str) -> bool {
        info!("Loading sensors from {}", locator);
        match self.registry.load_from(locator).await {
            Ok(count) => {
                info!("Loaded {} sensors from {}", count, locator);
                self.render();
                true
            }
            Err(e) => {
                error!("Failed to load sensors from {}: {}", locator, e);
                false
            }
        }
    }

    /// Refresh one sensor with a random value and re-render. An unknown id
    /// is logged and leaves everything as it was.
    pub fn update(&mut self, id: i64) -> Result<(), NotFoundError> {
        match self.registry.update_by_id(id, &mut self.rng) {
            Ok(reading) => {
                info!(
                    "Updated sensor {} ({}): {} {}",
                    id,
                    reading.sensor_type(),
                    reading.value(),
                    reading.unit()
                );
            }
            Err(e) => {
                error!("Update failed: {}", e);
                return Err(e);
            }
        }
        self.render();
        Ok(())
    }

    /// Replace the published container with a fresh render of current state.
    pub fn render(&self) {
        self.surface
            .send_replace(render_container(self.registry.readings()));
    }

    /// Handle commands until every handle is dropped, then hand back the registry.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> SensorRegistry {
        info!("Application context started");
        while let Some(command) = commands.recv().await {
            match command {
                Command::Update { id, reply } => {
                    let _ = reply.send(self.update(id));
                }
                Command::Snapshot { reply } => {
                    let records = self
                        .registry
                        .readings()
                        .iter()
                        .map(|reading| reading.to_record())
                        .collect();
                    let _ = reply.send(records);
                }
            }
        }
        info!(
            "Application context shutting down with {} sensors",
            self.registry.len()
        );
        self.registry
    }
}

/// Cloneable access to a running context, for the blocking server thread.
#[derive(Clone)]
pub struct AppHandle {
    commands: mpsc::Sender<Command>,
    surface: watch::Receiver<String>,
}

impl AppHandle {
    pub fn new(commands: mpsc::Sender<Command>, surface: watch::Receiver<String>) -> Self {
        AppHandle { commands, surface }
    }

    /// Latest rendered sensor container.
    pub fn current_container(&self) -> String {
        self.surface.borrow().clone()
    }

    /// Must not be called from within the async runtime.
    pub fn update_blocking(&self, id: i64) -> Result<(), HandleError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .blocking_send(Command::Update { id, reply })
            .map_err(|_| HandleError::Closed)?;
        response
            .blocking_recv()
            .map_err(|_| HandleError::Closed)?
            .map_err(HandleError::from)
    }

    /// Must not be called from within the async runtime.
    pub fn snapshot_blocking(&self) -> Result<Vec<SensorRecord>, HandleError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .blocking_send(Command::Snapshot { reply })
            .map_err(|_| HandleError::Closed)?;
        response.blocking_recv().map_err(|_| HandleError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SensorReading;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn context() -> (AppContext<StdRng>, watch::Receiver<String>) {
        let mut registry = SensorRegistry::new();
        registry.add(
            SensorReading::new(1, "A", "temperature", 20.0, "C", "2024-01-01T00:00:00Z").unwrap(),
        );
        registry.add(
            SensorReading::new(2, "B", "humidity", 50.0, "%", "2024-01-01T00:00:00Z").unwrap(),
        );
        let (tx, rx) = surface();
        (
            AppContext::new(registry, StdRng::seed_from_u64(11), tx),
            rx,
        )
    }

    #[tokio::test]
    async fn failed_load_is_caught_and_not_rendered() {
        let (tx, rx) = surface();
        let mut context = AppContext::new(SensorRegistry::new(), StdRng::seed_from_u64(1), tx);
        let before = rx.borrow().clone();

        let missing = std::env::temp_dir().join("sensor-dashboard-missing-load.json");
        assert!(!context.load(missing.to_str().unwrap()).await);

        assert_eq!(context.registry().len(), 0);
        assert_eq!(*rx.borrow(), before);
    }

    #[test]
    fn update_re_renders_target() {
        let (mut context, rx) = context();
        context.render();
        let before = rx.borrow().clone();

        context.update(2).unwrap();

        let after = rx.borrow().clone();
        assert_ne!(before, after);
        let value = context.registry().find(2).unwrap().value().to_string();
        assert!(after.contains(&format!("<strong>Value:</strong> {} %", value)));
    }

    #[test]
    fn unknown_id_is_reported_without_render() {
        let (mut context, rx) = context();
        context.render();
        let before = rx.borrow().clone();

        assert_eq!(context.update(99), Err(NotFoundError { id: 99 }));
        assert_eq!(*rx.borrow(), before);
    }

    #[tokio::test]
    async fn handle_round_trips_through_running_context() {
        let (context, rx) = context();
        let (commands_tx, commands_rx) = mpsc::channel(8);
        let task = tokio::spawn(context.run(commands_rx));
        let handle = AppHandle::new(commands_tx, rx);

        let (updated, missing, snapshot, container) = tokio::task::spawn_blocking(move || {
            let updated = handle.update_blocking(1);
            let missing = handle.update_blocking(7);
            let snapshot = handle.snapshot_blocking();
            (updated, missing, snapshot, handle.current_container())
        })
        .await
        .unwrap();

        assert!(updated.is_ok());
        assert!(matches!(
            missing,
            Err(HandleError::NotFound(NotFoundError { id: 7 }))
        ));
        let snapshot = snapshot.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_ne!(snapshot[0].updated_at, "2024-01-01T00:00:00Z");
        assert_eq!(snapshot[1].updated_at, "2024-01-01T00:00:00Z");
        assert!(container.contains("Sensor ID: 2"));

        // Every handle is gone, so the context tears down
        let registry = task.await.unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn handle_reports_closed_context() {
        let (_, rx) = surface();
        let (commands_tx, commands_rx) = mpsc::channel(1);
        drop(commands_rx);
        let handle = AppHandle::new(commands_tx, rx);

        let result = tokio::task::spawn_blocking(move || handle.update_blocking(1))
            .await
            .unwrap();
        assert!(matches!(result, Err(HandleError::Closed)));
    }
}
