//! flow-domain: tipos de dominio para flujos multi-paso
//!
//! Estructuras de datos hoja, sin comportamiento más allá de la validación
//! en construcción: `StepDefinition`/`StepCatalog` (catálogo ordenado e
//! inmutable), `FlowConfig` (autosave, persistencia, analítica, identidad),
//! `FlowState` (snapshot serializable del progreso) y `ConfigError`
//! (errores fatales de configuración, detectados al construir el flujo).

pub mod catalog;
pub mod config;
pub mod errors;
pub mod state;

pub use catalog::{FieldKey, StepCatalog, StepDefinition};
pub use config::{AutosaveConfig, FlowConfig, FlowIdentity};
pub use errors::ConfigError;
pub use state::FlowState;
