// Archivo: errors.rs
// Propósito: definir los errores del motor de flujos y el alias Result<T>
// usado por las APIs del crate.
use flow_domain::ConfigError;
use thiserror::Error;

/// Errores del motor de flujos.
///
/// Nota de taxonomía: los fallos de validación de datos del usuario NO son
/// errores — se reflejan en el mapa `errors` del `FlowState`. Este enum
/// cubre fallos de programación (configuración, claves desconocidas),
/// fallos de almacenamiento y fallos de callbacks del llamador.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Entidad no encontrada (paso o campo desconocido).
    #[error("No encontrado: {0}")]
    NotFound(String),
    /// Configuración inválida del flujo (fatal, detectado en construcción).
    #[error("Error de configuración: {0}")]
    Config(#[from] ConfigError),
    /// Error genérico de almacenamiento (KV externo).
    #[error("Error de almacenamiento: {0}")]
    Storage(String),
    /// Error de serialización/deserialización del snapshot.
    #[error("Error de serialización: {0}")]
    Serialization(#[from] serde_json::Error),
    /// El callback de finalización del llamador falló; el flujo queda
    /// no-terminal y `complete` puede reintentarse.
    #[error("Error en finalización: {0}")]
    Completion(String),
    /// Otro tipo de error.
    #[error("Otro: {0}")]
    Other(String),
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, FlowError>;
