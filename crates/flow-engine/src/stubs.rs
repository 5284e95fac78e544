// Archivo: stubs.rs
// Propósito: implementaciones en memoria de los colaboradores externos
// (almacenamiento, analítica, handler de eventos) para pruebas y wiring
// rápido. No son durables.
use crate::errors::Result;
use crate::events::{AnalyticsSink, FlowEvent, FlowEventHandler};
use crate::persistence::StorageSurface;
use crate::FlowError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Mutex;

/// Superficie de almacenamiento en memoria.
///
/// Además del mapa clave→bytes lleva un diario de claves escritas, en orden,
/// para que las pruebas puedan afirmar cuántas escrituras disparó el
/// autosave sobre una clave.
pub struct InMemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    writes: Mutex<Vec<String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()),
               writes: Mutex::new(Vec::new()) }
    }

    /// Número de escrituras (`set`) registradas para la clave.
    pub fn write_count(&self, key: &str) -> usize {
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|k| k.as_str() == key)
            .count()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).contains_key(key)
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageSurface for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).insert(key.to_string(), value);
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).push(key.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }
}

/// Superficie que falla todas las escrituras. Para probar que los fallos de
/// persistencia no bloquean la navegación.
pub struct FailingStorage;

#[async_trait]
impl StorageSurface for FailingStorage {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
        Err(FlowError::Storage("disco lleno (stub)".into()))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(FlowError::Storage("disco lleno (stub)".into()))
    }
}

/// Sink de analítica que acumula los registros para inspección.
pub struct RecordingAnalytics {
    records: Mutex<Vec<(String, JsonValue)>>,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self { records: Mutex::new(Vec::new()) }
    }

    pub fn records(&self) -> Vec<(String, JsonValue)> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, event_name: &str) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(name, _)| name == event_name)
            .count()
    }
}

impl Default for RecordingAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn record(&self, event_name: &str, payload: JsonValue) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((event_name.to_string(), payload));
    }
}

/// Handler que acumula los eventos recibidos. Puede configurarse para
/// rechazar el próximo `Completed` y así probar el reintento de `complete`.
pub struct RecordingHandler {
    events: Mutex<Vec<FlowEvent>>,
    fail_completion: Mutex<bool>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self { events: Mutex::new(Vec::new()),
               fail_completion: Mutex::new(false) }
    }

    /// El próximo evento `Completed` devolverá error (una sola vez).
    pub fn fail_next_completion(&self) {
        *self.fail_completion.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }

    pub fn events(&self) -> Vec<FlowEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, event_name: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| e.name() == event_name)
            .count()
    }
}

impl Default for RecordingHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlowEventHandler for RecordingHandler {
    async fn handle(&self, event: FlowEvent) -> Result<()> {
        let is_completion = matches!(event, FlowEvent::Completed { .. });
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
        if is_completion {
            let mut fail = self.fail_completion.lock().unwrap_or_else(|e| e.into_inner());
            if *fail {
                *fail = false;
                return Err(FlowError::Completion("backend rechazó el registro (stub)".into()));
            }
        }
        Ok(())
    }
}
