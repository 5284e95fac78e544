// Archivo: events.rs
// Propósito: eventos de ciclo de vida del flujo y los contratos de los
// colaboradores externos que los consumen (handler tipado y sink de
// analítica). Las implementaciones concretas viven fuera del motor; aquí se
// proveen los null-objects seleccionables en construcción.
use crate::errors::Result;
use async_trait::async_trait;
use flow_domain::FieldKey;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

/// Conjunto cerrado de eventos de ciclo de vida de un flujo.
///
/// Un único stream tipado en lugar de cinco callbacks opcionales: el
/// orquestador despacha cada evento como mucho una vez por suceso lógico.
#[derive(Debug, Clone, Serialize)]
pub enum FlowEvent {
    /// El paso actual cambió (también se emite al montar el flujo).
    StepViewed { step_id: String, step_index: usize },
    /// El flujo terminó con éxito; lleva los datos acumulados.
    Completed { data: HashMap<FieldKey, JsonValue> },
    /// El usuario saltó un paso saltable; lleva los datos acumulados.
    Skipped { step_id: String, data: HashMap<FieldKey, JsonValue> },
    /// El flujo se desmontó sin completarse. No es un error: es un
    /// desenlace normal sin finalización.
    Abandoned { step_id: String, data: HashMap<FieldKey, JsonValue> },
    /// Fallo recuperable (persistencia, callback); la navegación del
    /// usuario no se bloquea.
    Error { message: String },
}

impl FlowEvent {
    /// Nombre estable del evento para el sink de analítica.
    pub fn name(&self) -> &'static str {
        match self {
            FlowEvent::StepViewed { .. } => "step_viewed",
            FlowEvent::Completed { .. } => "flow_completed",
            FlowEvent::Skipped { .. } => "step_skipped",
            FlowEvent::Abandoned { .. } => "flow_abandoned",
            FlowEvent::Error { .. } => "flow_error",
        }
    }
}

/// Handler tipado de eventos, provisto por el llamador en construcción.
///
/// Puede suspender (llamadas de red en `Completed`, por ejemplo). Un `Err`
/// devuelto ante `Completed` impide que el flujo se marque terminal; para el
/// resto de eventos los errores se registran y no interrumpen la navegación.
#[async_trait]
pub trait FlowEventHandler: Send + Sync {
    async fn handle(&self, event: FlowEvent) -> Result<()>;
}

/// Null-object: ignora todos los eventos.
pub struct NoopHandler;

#[async_trait]
impl FlowEventHandler for NoopHandler {
    async fn handle(&self, _event: FlowEvent) -> Result<()> {
        Ok(())
    }
}

/// Sink de analítica: fire-and-forget, nunca bloquea la navegación.
pub trait AnalyticsSink: Send + Sync {
    fn record(&self, event_name: &str, payload: JsonValue);
}

/// Null-object: descarta todos los registros.
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn record(&self, _event_name: &str, _payload: JsonValue) {}
}

/// Payload de analítica de un evento: nombre + sesión + contenido.
pub fn analytics_payload(session_id: Uuid, event: &FlowEvent) -> JsonValue {
    serde_json::json!({
        "session_id": session_id,
        "event": event,
    })
}
