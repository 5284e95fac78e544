use crate::backend::{AccountBackend, AccountDirectory, RegistrationHandler};
use crate::rules::{email_format, password_format, UniqueEmailRule};
use flow_domain::{FlowConfig, FlowIdentity, StepCatalog, StepDefinition};
use flow_engine::validation::{matches_field, min_length, required, RuleSet};
use flow_engine::{AnalyticsSink, FlowEventHandler, FlowOrchestrator, StorageSurface};
use std::sync::Arc;

/// Configuración por defecto del asistente de registro. El llamador puede
/// ajustarla (autoguardado, analítica) antes de armar el flujo.
pub fn registration_config() -> FlowConfig {
  FlowConfig::new(FlowIdentity::new("registration", 1))
}

/// Configuración por defecto del asistente de onboarding.
pub fn onboarding_config() -> FlowConfig {
  FlowConfig::new(FlowIdentity::new("onboarding", 1))
}

fn registration_catalog() -> Result<StepCatalog, flow_domain::ConfigError> {
  StepCatalog::new(vec![StepDefinition::new("personal", ["first_name", "email"]),
                        StepDefinition::new("security", ["password", "password_confirm"]),
                        StepDefinition::new("review", Vec::<String>::new())])
}

fn registration_rules(directory: Arc<dyn AccountDirectory>) -> RuleSet {
  RuleSet::new().rule("first_name", required("El nombre es obligatorio"))
                .rule("email", required("El email es obligatorio"))
                .rule("email", email_format("El email no tiene un formato válido"))
                .rule("email", UniqueEmailRule::new(directory, "Ese email ya está registrado"))
                .rule("password", required("La contraseña es obligatoria"))
                .rule("password", min_length(8, "La contraseña necesita al menos 8 caracteres"))
                .rule("password", password_format("La contraseña necesita letras y números"))
                .rule("password_confirm", matches_field("password", "Las contraseñas no coinciden"))
}

/// Arma el asistente de registro: datos personales, credenciales y revisión.
///
/// El paso de revisión no tiene campos propios; `complete` solo re-valida
/// ese paso, porque los anteriores ya validaron al avanzar. Al completarse,
/// `RegistrationHandler` crea la cuenta contra `backend`; si el backend
/// falla el flujo queda reintentable.
pub fn registration_flow(config: FlowConfig,
                         directory: Arc<dyn AccountDirectory>,
                         backend: Arc<dyn AccountBackend>,
                         storage: Arc<dyn StorageSurface>,
                         analytics: Arc<dyn AnalyticsSink>)
                         -> flow_engine::Result<FlowOrchestrator> {
  let handler = Arc::new(RegistrationHandler::new(backend));
  FlowOrchestrator::new(registration_catalog()?,
                        config,
                        registration_rules(directory),
                        storage,
                        analytics,
                        handler)
}

fn onboarding_catalog() -> Result<StepCatalog, flow_domain::ConfigError> {
  StepCatalog::new(vec![StepDefinition::new("welcome", ["display_name"]),
                        StepDefinition::new("preferences", ["theme", "newsletter"]).with_skippable(true)
                                                                                  .with_required_for_completion(false),
                        StepDefinition::new("done", Vec::<String>::new())])
}

fn onboarding_rules() -> RuleSet {
  RuleSet::new().rule("display_name", required("Elegí un nombre para mostrar"))
}

/// Arma el asistente de onboarding: bienvenida, preferencias saltables y
/// cierre. Las preferencias no bloquean la finalización.
pub fn onboarding_flow(config: FlowConfig,
                       storage: Arc<dyn StorageSurface>,
                       analytics: Arc<dyn AnalyticsSink>,
                       handler: Arc<dyn FlowEventHandler>)
                       -> flow_engine::Result<FlowOrchestrator> {
  FlowOrchestrator::new(onboarding_catalog()?, config, onboarding_rules(), storage, analytics, handler)
}
