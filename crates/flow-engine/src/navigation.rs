// Archivo: navigation.rs
// Propósito: máquina de estados sobre `current_step_index`. Calcula las
// transiciones legales (next/previous/skip/jump_to/complete) y aplica sus
// efectos sobre el estado compartido. No valida datos: el gating por
// validación ocurre en el orquestador, antes de llamar aquí.
use crate::errors::{FlowError, Result};
use crate::store::FlowStateStore;
use chrono::Utc;
use flow_domain::StepCatalog;
use std::sync::Arc;

/// Controlador de navegación de un flujo.
///
/// Invariante central: `current_step_index` nunca sale de
/// `[0, catalog.len() - 1]`; ningún método puede representar un estado
/// fuera de rango. Cualquier transición sobre un flujo ya completado es un
/// no-op idempotente.
pub struct NavigationController {
    catalog: Arc<StepCatalog>,
    store: Arc<FlowStateStore>,
}

impl NavigationController {
    pub fn new(catalog: Arc<StepCatalog>, store: Arc<FlowStateStore>) -> Self {
        Self { catalog, store }
    }

    // --- Flags derivadas expuestas a la UI ---

    pub fn can_go_back(&self) -> bool {
        !self.store.is_completed() && self.store.current_step_index() > 0
    }

    /// La navegación hacia delante se ofrece siempre que el flujo no sea
    /// terminal; la validez real se comprueba al ejecutar `next`.
    pub fn can_go_next(&self) -> bool {
        !self.store.is_completed()
    }

    pub fn can_skip(&self) -> bool {
        if self.store.is_completed() {
            return false;
        }
        let index = self.store.current_step_index();
        self.catalog.get(index).map(|s| s.is_skippable()).unwrap_or(false) && index < self.catalog.last_index()
    }

    pub fn is_first_step(&self) -> bool {
        self.store.current_step_index() == 0
    }

    pub fn is_last_step(&self) -> bool {
        self.store.current_step_index() == self.catalog.last_index()
    }

    /// `complete` es legal cuando el paso actual es el último requerido (o
    /// directamente el último del catálogo).
    pub fn can_complete(&self) -> bool {
        if self.store.is_completed() {
            return false;
        }
        let index = self.store.current_step_index();
        index == self.catalog.last_required_index() || index == self.catalog.last_index()
    }

    // --- Efectos de transición (la validación ya ocurrió) ---

    /// Avanza un paso. Limpia errores y registra el paso entrado en el
    /// historial. Devuelve `false` (sin mutar) si el flujo está completado
    /// o ya está en el último paso — ese caso lo maneja el orquestador como
    /// `complete`.
    pub fn advance(&self) -> bool {
        if self.store.is_completed() || self.is_last_step() {
            return false;
        }
        self.apply_move(self.store.current_step_index() + 1);
        true
    }

    /// Retrocede un paso. No-op idempotente en el primer paso. No re-valida
    /// el paso que se abandona; limpia errores para no mostrar estado viejo.
    pub fn retreat(&self) -> bool {
        if self.store.is_completed() || self.is_first_step() {
            return false;
        }
        self.apply_move(self.store.current_step_index() - 1);
        true
    }

    /// Salta el paso actual sin validar. No-op si el paso no es saltable o
    /// si es el último (no hay a dónde saltar). Los datos ya introducidos en
    /// el paso saltado se conservan.
    pub fn skip(&self) -> bool {
        if !self.can_skip() {
            return false;
        }
        self.apply_move(self.store.current_step_index() + 1);
        true
    }

    /// Salta directamente al paso `step_id`, sin validar los pasos
    /// intermedios. Un id inexistente es un error de programación.
    pub fn jump_to(&self, step_id: &str) -> Result<bool> {
        if self.store.is_completed() {
            return Ok(false);
        }
        let index = self.catalog
                        .index_of(step_id)
                        .ok_or_else(|| FlowError::NotFound(format!("paso {}", step_id)))?;
        self.apply_move(index);
        Ok(true)
    }

    /// Marca el flujo como terminal. `completed_at` se fija como mucho una
    /// vez; las invocaciones posteriores son no-ops.
    pub fn finish(&self) -> bool {
        if self.store.is_completed() {
            return false;
        }
        self.store.update_state(|state| {
                      state.completed_at = Some(Utc::now());
                      state.errors.clear();
                  });
        true
    }

    fn apply_move(&self, new_index: usize) {
        // `new_index` proviene del catálogo o de aritmética acotada arriba,
        // por lo que siempre es válido.
        let step_id = self.catalog.get(new_index).map(|s| s.id().to_string());
        self.store.update_state(|state| {
                      state.current_step_index = new_index;
                      state.errors.clear();
                      if let Some(id) = step_id {
                          state.visit(&id);
                      }
                  });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_domain::{FlowState, StepDefinition};

    fn fixture() -> (Arc<StepCatalog>, Arc<FlowStateStore>, NavigationController) {
        let catalog = Arc::new(StepCatalog::new(vec![StepDefinition::new("personal", ["email"]),
                                                     StepDefinition::new("security", ["password"]).with_skippable(true),
                                                     StepDefinition::new("review", Vec::<String>::new())]).unwrap());
        let store = Arc::new(FlowStateStore::new(FlowState::new("personal")));
        let nav = NavigationController::new(catalog.clone(), store.clone());
        (catalog, store, nav)
    }

    #[test]
    fn retreat_on_first_step_is_a_no_op() {
        let (_, store, nav) = fixture();
        assert!(!nav.retreat());
        assert_eq!(store.current_step_index(), 0);
    }

    #[test]
    fn advance_clears_errors_and_records_history() {
        let (_, store, nav) = fixture();
        store.set_field_error("email", Some("inválido".into()));
        assert!(nav.advance());
        let snap = store.snapshot();
        assert_eq!(snap.current_step_index, 1);
        assert!(snap.errors.is_empty());
        assert_eq!(snap.step_history, vec!["personal", "security"]);
    }

    #[test]
    fn advance_stops_at_last_step() {
        let (_, store, nav) = fixture();
        assert!(nav.advance());
        assert!(nav.advance());
        // último paso: advance no mueve; complete es responsabilidad del
        // orquestador
        assert!(!nav.advance());
        assert_eq!(store.current_step_index(), 2);
    }

    #[test]
    fn skip_requires_skippable_step() {
        let (_, store, nav) = fixture();
        // personal no es saltable
        assert!(!nav.skip());
        assert_eq!(store.current_step_index(), 0);

        assert!(nav.advance());
        assert!(nav.can_skip());
        assert!(nav.skip());
        assert_eq!(store.current_step_index(), 2);
    }

    #[test]
    fn jump_to_unknown_step_is_an_error() {
        let (_, _, nav) = fixture();
        assert!(matches!(nav.jump_to("no_existe"), Err(FlowError::NotFound(_))));
        assert!(nav.jump_to("review").unwrap());
    }

    #[test]
    fn transitions_after_finish_are_no_ops() {
        let (_, store, nav) = fixture();
        assert!(nav.jump_to("review").unwrap());
        assert!(nav.finish());
        assert!(!nav.finish());
        assert!(!nav.advance());
        assert!(!nav.retreat());
        assert!(!nav.skip());
        assert!(!nav.jump_to("personal").unwrap());
        assert_eq!(store.current_step_index(), 2);
        assert!(store.is_completed());
    }

    #[test]
    fn can_complete_on_last_required_step() {
        let catalog = Arc::new(StepCatalog::new(vec![StepDefinition::new("a", ["x"]),
                                                     StepDefinition::new("b", Vec::<String>::new()).with_required_for_completion(false)]).unwrap());
        let store = Arc::new(FlowStateStore::new(FlowState::new("a")));
        let nav = NavigationController::new(catalog, store);
        // "a" es el último requerido aunque no sea el último paso
        assert!(nav.can_complete());
    }
}
