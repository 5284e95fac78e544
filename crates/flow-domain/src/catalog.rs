// catalog.rs
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Clave de un campo de datos del flujo (por ejemplo `"email"`).
pub type FieldKey = String;

/// Definición inmutable de un paso dentro de un flujo.
///
/// Cada paso posee un subconjunto de los campos del flujo. `skippable`
/// indica si el usuario puede saltarlo sin validar; `required_for_completion`
/// indica si el paso forma parte del camino obligatorio hacia `complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
  id: String,
  fields: Vec<FieldKey>,
  skippable: bool,
  required_for_completion: bool,
}

impl StepDefinition {
  /// Crea un paso con los valores por defecto: no saltable y requerido.
  /// Los campos duplicados se descartan conservando el primero.
  pub fn new<I, S>(id: impl Into<String>, fields: I) -> Self
    where I: IntoIterator<Item = S>,
          S: Into<String>
  {
    let mut seen = HashSet::new();
    let fields: Vec<FieldKey> = fields.into_iter().map(Into::into).filter(|f| seen.insert(f.clone())).collect();
    Self { id: id.into(), fields, skippable: false, required_for_completion: true }
  }

  pub fn with_skippable(&self, skippable: bool) -> Self {
    let mut step = self.clone();
    step.skippable = skippable;
    step
  }

  pub fn with_required_for_completion(&self, required: bool) -> Self {
    let mut step = self.clone();
    step.required_for_completion = required;
    step
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn fields(&self) -> &[FieldKey] {
    &self.fields
  }

  pub fn is_skippable(&self) -> bool {
    self.skippable
  }

  pub fn is_required_for_completion(&self) -> bool {
    self.required_for_completion
  }

  /// Indica si el campo pertenece a este paso.
  pub fn owns_field(&self, key: &str) -> bool {
    self.fields.iter().any(|f| f == key)
  }
}

/// Catálogo ordenado e inmutable de pasos de un flujo.
///
/// Se valida en construcción: debe haber al menos un paso y los ids deben
/// ser únicos. Una vez creado no se modifica.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCatalog {
  steps: Vec<StepDefinition>,
}

impl StepCatalog {
  pub fn new<I>(steps: I) -> Result<Self, ConfigError>
    where I: IntoIterator<Item = StepDefinition>
  {
    let steps: Vec<StepDefinition> = steps.into_iter().collect();
    if steps.is_empty() {
      return Err(ConfigError::EmptySteps);
    }
    let mut seen = HashSet::new();
    for step in &steps {
      if !seen.insert(step.id().to_string()) {
        return Err(ConfigError::DuplicateStepId(step.id().to_string()));
      }
    }
    Ok(Self { steps })
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn steps(&self) -> &[StepDefinition] {
    &self.steps
  }

  pub fn get(&self, index: usize) -> Option<&StepDefinition> {
    self.steps.get(index)
  }

  /// Posición de un paso por id, si existe.
  pub fn index_of(&self, step_id: &str) -> Option<usize> {
    self.steps.iter().position(|s| s.id() == step_id)
  }

  pub fn first(&self) -> &StepDefinition {
    // El constructor garantiza que hay al menos un paso.
    &self.steps[0]
  }

  pub fn last_index(&self) -> usize {
    self.steps.len() - 1
  }

  /// Índice del último paso con `required_for_completion`. Si ningún paso
  /// es requerido, se considera el último paso del catálogo.
  pub fn last_required_index(&self) -> usize {
    self.steps
        .iter()
        .rposition(|s| s.is_required_for_completion())
        .unwrap_or(self.last_index())
  }

  /// Paso propietario de un campo, si alguno lo declara.
  pub fn field_owner(&self, key: &str) -> Option<&StepDefinition> {
    self.steps.iter().find(|s| s.owns_field(key))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn catalog_rejects_empty_and_duplicates() {
    assert_eq!(StepCatalog::new(vec![]).unwrap_err(), ConfigError::EmptySteps);

    let dup = StepCatalog::new(vec![StepDefinition::new("a", ["x"]), StepDefinition::new("a", ["y"])]);
    assert_eq!(dup.unwrap_err(), ConfigError::DuplicateStepId("a".into()));
  }

  #[test]
  fn step_builder_and_field_ownership() {
    let step = StepDefinition::new("security", ["password", "password", "password_confirm"]).with_skippable(true);
    // duplicated field collapsed
    assert_eq!(step.fields().len(), 2);
    assert!(step.is_skippable());
    assert!(step.owns_field("password"));
    assert!(!step.owns_field("email"));
  }

  #[test]
  fn last_required_index_falls_back_to_last_step() {
    let cat = StepCatalog::new(vec![StepDefinition::new("a", ["x"]),
                                    StepDefinition::new("b", Vec::<String>::new()).with_required_for_completion(false)]).unwrap();
    assert_eq!(cat.last_required_index(), 0);

    let none_required = StepCatalog::new(vec![StepDefinition::new("a", ["x"]).with_required_for_completion(false)]).unwrap();
    assert_eq!(none_required.last_required_index(), 0);

    assert_eq!(cat.index_of("b"), Some(1));
    assert_eq!(cat.index_of("zzz"), None);
  }
}
