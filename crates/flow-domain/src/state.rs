// state.rs
use crate::FieldKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

/// Snapshot mutable del progreso de un flujo.
///
/// Es un registro serializable: `PersistenceGateway` lo escribe/lee tal cual.
/// Invariantes (deben cumplirse tras cada transición):
/// - `current_step_index` siempre es un índice válido del catálogo.
/// - `completed_at` se fija como mucho una vez, solo vía `complete`.
/// - `errors` solo contiene campos del paso actual.
/// - `data` solo se vacía con un `clear_data` explícito, nunca al navegar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowState {
  /// Id de sesión de esta ejecución del flujo. Sobrevive al resume para que
  /// la analítica pueda unir el recorrido completo.
  pub session_id: Uuid,
  pub current_step_index: usize,
  pub data: HashMap<FieldKey, JsonValue>,
  pub errors: HashMap<FieldKey, String>,
  pub started_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
  /// Pasos visitados en orden, sin repeticiones consecutivas.
  pub step_history: Vec<String>,
}

impl FlowState {
  /// Estado inicial de un flujo recién montado, posicionado en el primer
  /// paso y con ese paso ya registrado en el historial.
  pub fn new(first_step_id: &str) -> Self {
    Self { session_id: Uuid::new_v4(),
           current_step_index: 0,
           data: HashMap::new(),
           errors: HashMap::new(),
           started_at: Utc::now(),
           completed_at: None,
           step_history: vec![first_step_id.to_string()] }
  }

  pub fn is_completed(&self) -> bool {
    self.completed_at.is_some()
  }

  /// Último paso visitado (el historial nunca está vacío tras `new`, pero
  /// un snapshot deserializado podría traerlo vacío).
  pub fn last_visited(&self) -> Option<&str> {
    self.step_history.last().map(|s| s.as_str())
  }

  /// Registra la entrada a un paso, evitando repeticiones consecutivas.
  pub fn visit(&mut self, step_id: &str) {
    if self.last_visited() != Some(step_id) {
      self.step_history.push(step_id.to_string());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn visit_deduplicates_consecutive_entries() {
    let mut state = FlowState::new("personal");
    state.visit("personal");
    state.visit("security");
    state.visit("security");
    state.visit("personal");
    assert_eq!(state.step_history, vec!["personal", "security", "personal"]);
    assert_eq!(state.last_visited(), Some("personal"));
  }

  #[test]
  fn fresh_state_is_not_completed() {
    let state = FlowState::new("a");
    assert!(!state.is_completed());
    assert_eq!(state.current_step_index, 0);
    assert!(state.data.is_empty());
    assert!(state.errors.is_empty());
  }
}
