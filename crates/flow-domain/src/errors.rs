// errors.rs
use thiserror::Error;

/// Errores de configuración de un flujo. Todos son fatales y deben
/// detectarse al construir el flujo, nunca en mitad de la ejecución.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
  /// El catálogo no contiene ningún paso.
  #[error("El catálogo de pasos está vacío")]
  EmptySteps,
  /// Dos pasos comparten el mismo id.
  #[error("Id de paso duplicado: {0}")]
  DuplicateStepId(String),
  /// Una regla de validación apunta a un campo que ningún paso posee.
  #[error("Campo desconocido: {0}")]
  UnknownField(String),
  /// Un campo de un paso requerido no tiene regla de validación asociada.
  #[error("Campo requerido sin regla de validación: {0}")]
  MissingRule(String),
  /// Autosave habilitado con un intervalo inválido (cero).
  #[error("Intervalo de autosave inválido: {0} ms")]
  InvalidAutosaveInterval(u64),
}
