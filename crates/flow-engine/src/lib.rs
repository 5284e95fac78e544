//! Crate `flow-engine` — motor genérico de flujos multi-paso
//!
//! Orquesta recorridos tipo asistente (registro, onboarding) sobre una
//! secuencia ordenada de pasos: gating por validación, estado reanudable y
//! eventos de ciclo de vida (vista, finalización, salto, abandono, error).
//!
//! Diseño resumido:
//! - `FlowStateStore`: portador puro del estado mutable con primitivas de
//!   merge; escritura exclusiva del orquestador.
//! - `ValidationEngine`: reglas declarativas por campo, síncronas o
//!   asíncronas; gana la primera regla fallida por campo.
//! - `NavigationController`: máquina de estados sobre el índice del paso;
//!   ningún estado fuera de rango es representable.
//! - `PersistenceGateway`: snapshot serializable sobre una superficie
//!   clave-valor (`StorageSurface`), con escritor único serializado.
//! - `FlowOrchestrator`: la fachada que envuelve cada transición con
//!   validación, persistencia y analítica. Único contrato para la UI.
//!
//! Ejemplo rápido:
//! ```rust
//! use flow_domain::{FlowConfig, FlowIdentity, StepCatalog, StepDefinition};
//! use flow_engine::stubs::{InMemoryStorage, RecordingAnalytics, RecordingHandler};
//! use flow_engine::validation::{required, RuleSet};
//! use flow_engine::FlowOrchestrator;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let catalog = StepCatalog::new(vec![StepDefinition::new("personal", ["email"]),
//!                                     StepDefinition::new("review", Vec::<String>::new())]).unwrap();
//! let rules = RuleSet::new().rule("email", required("El email es obligatorio"));
//! let flow = FlowOrchestrator::new(catalog,
//!                                  FlowConfig::new(FlowIdentity::new("demo", 1)),
//!                                  rules,
//!                                  Arc::new(InMemoryStorage::new()),
//!                                  Arc::new(RecordingAnalytics::new()),
//!                                  Arc::new(RecordingHandler::new())).unwrap();
//! flow.mount().await.unwrap();
//! assert!(!flow.next().await.unwrap()); // email vacío: no avanza
//! # });
//! ```
pub mod errors;
pub mod events;
pub mod navigation;
pub mod orchestrator;
pub mod persistence;
pub mod store;
pub mod stubs;
pub mod validation;

pub use errors::{FlowError, Result};
pub use events::{AnalyticsSink, FlowEvent, FlowEventHandler, NoopAnalytics, NoopHandler};
pub use navigation::NavigationController;
pub use orchestrator::{FlowContext, FlowOrchestrator};
pub use persistence::{PersistenceGateway, StorageSurface};
pub use store::FlowStateStore;
pub use validation::{RuleOutcome, RuleSet, StepValidation, ValidationEngine, ValidationRule};
