// Archivo: store.rs
// Propósito: implementar `FlowStateStore`, el contenedor del estado mutable
// de un flujo en curso. Es un puro portador de datos con primitivas de
// actualización; aquí no hay validación ni efectos secundarios.
use flow_domain::{FieldKey, FlowState};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Portador del estado de un flujo en curso.
///
/// El estado vive tras un `Mutex` para que el orquestador y la tarea de
/// autosave puedan compartir la misma instancia vía `Arc`. La escritura es
/// exclusiva del `FlowOrchestrator` (y de los componentes que actúan en su
/// nombre); la UI solo consume snapshots.
///
/// Además del estado vivo se conserva un `baseline`: el snapshot inicial
/// (vacío o rehidratado) al que vuelve `reset_state` cuando se abandona sin
/// persistir.
pub struct FlowStateStore {
    state: Mutex<FlowState>,
    baseline: Mutex<FlowState>,
}

impl FlowStateStore {
    pub fn new(initial: FlowState) -> Self {
        Self { state: Mutex::new(initial.clone()),
               baseline: Mutex::new(initial) }
    }

    /// Acceso al lock recuperando el guard aunque el mutex esté envenenado:
    /// las primitivas de este store nunca fallan.
    fn lock<'a>(&self, m: &'a Mutex<FlowState>) -> MutexGuard<'a, FlowState> {
        m.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copia del estado actual para lectores (UI, persistencia, analítica).
    pub fn snapshot(&self) -> FlowState {
        self.lock(&self.state).clone()
    }

    /// Aplica una mutación arbitraria sobre el estado. Primitiva usada por
    /// `NavigationController` y el orquestador.
    pub fn update_state<F>(&self, mutate: F)
        where F: FnOnce(&mut FlowState)
    {
        let mut state = self.lock(&self.state);
        mutate(&mut state);
    }

    /// Fusiona el mapa de campos en `data` sin tocar campos no relacionados.
    pub fn update_data(&self, fields: HashMap<FieldKey, JsonValue>) {
        let mut state = self.lock(&self.state);
        state.data.extend(fields);
    }

    pub fn get_data(&self, key: &str) -> Option<JsonValue> {
        self.lock(&self.state).data.get(key).cloned()
    }

    pub fn set_data(&self, key: impl Into<FieldKey>, value: JsonValue) {
        let mut state = self.lock(&self.state);
        state.data.insert(key.into(), value);
    }

    /// Vacía `data` por completo. Única vía por la que se eliminan campos.
    pub fn clear_data(&self) {
        let mut state = self.lock(&self.state);
        state.data.clear();
    }

    /// Reemplaza el mapa de errores completo (los errores pertenecen solo al
    /// paso actual, así que cada validación de paso lo sustituye).
    pub fn set_errors(&self, errors: HashMap<FieldKey, String>) {
        let mut state = self.lock(&self.state);
        state.errors = errors;
    }

    /// Inserta o elimina el error de un único campo.
    pub fn set_field_error(&self, key: &str, message: Option<String>) {
        let mut state = self.lock(&self.state);
        match message {
            Some(msg) => {
                state.errors.insert(key.to_string(), msg);
            }
            None => {
                state.errors.remove(key);
            }
        }
    }

    pub fn clear_errors(&self) {
        let mut state = self.lock(&self.state);
        state.errors.clear();
    }

    /// Vuelve al snapshot inicial (o rehidratado) y limpia los errores.
    /// Se usa al abandonar sin persistencia.
    pub fn reset_state(&self) {
        let mut baseline = self.lock(&self.baseline).clone();
        baseline.errors.clear();
        *self.lock(&self.state) = baseline;
    }

    /// Sustituye estado y baseline a la vez. Se usa al rehidratar desde un
    /// snapshot persistido durante el montaje del flujo.
    pub fn hydrate(&self, state: FlowState) {
        *self.lock(&self.baseline) = state.clone();
        *self.lock(&self.state) = state;
    }

    pub fn current_step_index(&self) -> usize {
        self.lock(&self.state).current_step_index
    }

    pub fn is_completed(&self) -> bool {
        self.lock(&self.state).is_completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_data_merges_without_touching_other_fields() {
        let store = FlowStateStore::new(FlowState::new("a"));
        store.set_data("email", json!("x@y.z"));

        let mut batch = HashMap::new();
        batch.insert("first_name".to_string(), json!("Ada"));
        store.update_data(batch);

        assert_eq!(store.get_data("email"), Some(json!("x@y.z")));
        assert_eq!(store.get_data("first_name"), Some(json!("Ada")));
    }

    #[test]
    fn reset_state_restores_baseline_and_clears_errors() {
        let store = FlowStateStore::new(FlowState::new("a"));
        store.set_data("email", json!("x@y.z"));
        store.set_field_error("email", Some("inválido".into()));
        store.update_state(|s| s.current_step_index = 1);

        store.reset_state();
        let snap = store.snapshot();
        assert!(snap.data.is_empty());
        assert!(snap.errors.is_empty());
        assert_eq!(snap.current_step_index, 0);
    }

    #[test]
    fn hydrate_replaces_state_and_baseline() {
        let store = FlowStateStore::new(FlowState::new("a"));
        let mut resumed = FlowState::new("a");
        resumed.current_step_index = 2;
        resumed.data.insert("email".into(), json!("x@y.z"));
        store.hydrate(resumed);

        store.set_data("password", json!("secret"));
        store.reset_state();
        // reset vuelve al snapshot rehidratado, no al estado vacío
        assert_eq!(store.current_step_index(), 2);
        assert_eq!(store.get_data("email"), Some(json!("x@y.z")));
        assert_eq!(store.get_data("password"), None);
    }
}
