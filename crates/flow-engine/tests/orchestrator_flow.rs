use async_trait::async_trait;
use flow_domain::{FieldKey, FlowConfig, FlowIdentity, StepCatalog, StepDefinition};
use flow_engine::stubs::{InMemoryStorage, RecordingAnalytics, RecordingHandler};
use flow_engine::validation::{min_length, required, RuleOutcome, RuleSet, ValidationRule};
use flow_engine::{FlowEvent, FlowOrchestrator};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

fn catalog() -> StepCatalog {
  StepCatalog::new(vec![StepDefinition::new("personal", ["first_name", "email"]),
                        StepDefinition::new("security", ["password"]),
                        StepDefinition::new("review", Vec::<String>::new())]).expect("catalog")
}

fn rules() -> RuleSet {
  RuleSet::new().rule("first_name", required("El nombre es obligatorio"))
                .rule("email", required("El email es obligatorio"))
                .rule("password", required("La contraseña es obligatoria"))
                .rule("password", min_length(8, "Mínimo 8 caracteres"))
}

fn fixture() -> (Arc<InMemoryStorage>, Arc<RecordingAnalytics>, Arc<RecordingHandler>, FlowOrchestrator) {
  let storage = Arc::new(InMemoryStorage::new());
  let analytics = Arc::new(RecordingAnalytics::new());
  let handler = Arc::new(RecordingHandler::new());
  let config = FlowConfig::new(FlowIdentity::new("registration", 1));
  let flow = FlowOrchestrator::new(catalog(), config, rules(), storage.clone(), analytics.clone(), handler.clone()).expect("orchestrator");
  (storage, analytics, handler, flow)
}

fn fill_personal(flow: &FlowOrchestrator) {
  flow.set_data("first_name", json!("Ada"));
  flow.set_data("email", json!("ada@example.com"));
}

#[tokio::test]
async fn validation_gate_blocks_next() {
  let (_, _, _, flow) = fixture();
  flow.mount().await.expect("mount");

  assert!(!flow.next().await.expect("next"));
  let state = flow.state();
  assert_eq!(state.current_step_index, 0);
  assert!(!state.errors.is_empty());
  assert_eq!(state.errors.get("email").unwrap(), "El email es obligatorio");

  fill_personal(&flow);
  assert!(flow.next().await.expect("next"));
  let state = flow.state();
  assert_eq!(state.current_step_index, 1);
  assert!(state.errors.is_empty());
}

#[tokio::test]
async fn empty_password_blocks_security_step() {
  let (_, _, _, flow) = fixture();
  flow.mount().await.expect("mount");
  fill_personal(&flow);
  assert!(flow.next().await.expect("next"));

  // password vacío: no avanza y el error queda visible
  flow.set_data("password", json!(""));
  assert!(!flow.next().await.expect("next"));
  let state = flow.state();
  assert_eq!(state.current_step_index, 1);
  assert_eq!(state.errors.get("password").unwrap(), "La contraseña es obligatoria");

  flow.set_data("password", json!("Abc12345"));
  assert!(flow.next().await.expect("next"));
  let state = flow.state();
  assert_eq!(state.current_step_index, 2);
  assert!(state.errors.is_empty());
}

#[tokio::test]
async fn skip_on_non_skippable_step_is_a_no_op() {
  let (_, _, handler, flow) = fixture();
  flow.mount().await.expect("mount");

  assert!(!flow.skip().await.expect("skip"));
  assert_eq!(flow.state().current_step_index, 0);
  assert_eq!(handler.count("step_skipped"), 0);
}

#[tokio::test]
async fn jump_to_review_bypasses_validation_and_clears_errors() {
  let (_, _, _, flow) = fixture();
  flow.mount().await.expect("mount");

  // provocar errores en el paso 0
  assert!(!flow.next().await.expect("next"));
  assert!(!flow.state().errors.is_empty());

  assert!(flow.jump_to("review").await.expect("jump"));
  let state = flow.state();
  assert_eq!(state.current_step_index, 2);
  assert!(state.errors.is_empty());
  assert_eq!(state.step_history, vec!["personal", "review"]);
}

#[tokio::test]
async fn jump_to_unknown_step_is_an_error() {
  let (_, _, _, flow) = fixture();
  flow.mount().await.expect("mount");
  assert!(flow.jump_to("no_existe").await.is_err());
}

#[tokio::test]
async fn previous_on_first_step_is_idempotent() {
  let (_, _, _, flow) = fixture();
  flow.mount().await.expect("mount");
  let before = flow.state();
  assert!(!flow.previous().await.expect("previous"));
  let after = flow.state();
  assert_eq!(before.current_step_index, after.current_step_index);
  assert_eq!(before.step_history, after.step_history);
}

#[tokio::test]
async fn complete_clears_state_exactly_once() {
  let (storage, analytics, handler, flow) = fixture();
  flow.mount().await.expect("mount");
  fill_personal(&flow);
  assert!(flow.next().await.expect("next"));
  flow.set_data("password", json!("Abc12345"));
  assert!(flow.next().await.expect("next"));

  assert!(flow.complete().await.expect("complete"));
  let state = flow.state();
  assert!(state.is_completed());
  assert_eq!(handler.count("flow_completed"), 1);
  assert_eq!(analytics.count("flow_completed"), 1);
  // el snapshot se elimina: un próximo arranque no ofrecerá resume
  assert!(!storage.contains("flow_state:registration:v1"));

  // idempotente: no re-invoca el handler ni mueve el estado
  assert!(!flow.complete().await.expect("complete"));
  assert!(!flow.next().await.expect("next"));
  assert!(!flow.previous().await.expect("previous"));
  assert_eq!(handler.count("flow_completed"), 1);
}

#[tokio::test]
async fn next_on_last_step_behaves_as_complete() {
  let (_, _, handler, flow) = fixture();
  flow.mount().await.expect("mount");
  fill_personal(&flow);
  flow.next().await.expect("next");
  flow.set_data("password", json!("Abc12345"));
  flow.next().await.expect("next");

  // en el último paso, next no puede salirse del rango: completa
  assert!(flow.next().await.expect("next"));
  assert!(flow.state().is_completed());
  assert_eq!(flow.state().current_step_index, 2);
  assert_eq!(handler.count("flow_completed"), 1);
}

#[tokio::test]
async fn complete_before_last_required_step_is_a_no_op() {
  let (_, _, handler, flow) = fixture();
  flow.mount().await.expect("mount");
  assert!(!flow.complete().await.expect("complete"));
  assert!(!flow.state().is_completed());
  assert_eq!(handler.count("flow_completed"), 0);
}

#[tokio::test]
async fn completion_failure_keeps_flow_retryable() {
  let (storage, _, handler, flow) = fixture();
  flow.mount().await.expect("mount");
  fill_personal(&flow);
  flow.next().await.expect("next");
  flow.set_data("password", json!("Abc12345"));
  flow.next().await.expect("next");

  handler.fail_next_completion();
  assert!(flow.complete().await.is_err());
  assert!(!flow.state().is_completed());
  assert_eq!(handler.count("flow_error"), 1);
  // el snapshot sigue disponible: el flujo no terminó
  assert!(storage.contains("flow_state:registration:v1"));

  // reintento exitoso
  assert!(flow.complete().await.expect("retry"));
  assert!(flow.state().is_completed());
  assert_eq!(handler.count("flow_completed"), 2);
}

#[tokio::test]
async fn abandonment_is_emitted_exactly_once() {
  let (storage, _, handler, flow) = fixture();
  flow.mount().await.expect("mount");
  fill_personal(&flow);
  assert!(flow.next().await.expect("next"));

  flow.unmount().await;
  flow.unmount().await;
  assert_eq!(handler.count("flow_abandoned"), 1);

  let abandoned = handler.events()
                         .into_iter()
                         .find(|e| matches!(e, FlowEvent::Abandoned { .. }))
                         .expect("abandoned event");
  match abandoned {
    FlowEvent::Abandoned { step_id, data } => {
      assert_eq!(step_id, "security");
      assert_eq!(data.get("email").unwrap(), &json!("ada@example.com"));
    }
    _ => unreachable!(),
  }

  // el snapshot queda persistido para permitir resume
  assert!(storage.contains("flow_state:registration:v1"));

  // tras el unmount los intents se descartan
  assert!(!flow.next().await.expect("next"));
}

/// Regla que avisa cuando entra en evaluación y queda suspendida hasta que
/// la prueba la libera, para intercalar un unmount en el medio.
struct GatedRule {
  entered: Arc<Notify>,
  release: Arc<Notify>,
}

#[async_trait]
impl ValidationRule for GatedRule {
  async fn check(&self, _value: Option<&JsonValue>, _all: &HashMap<FieldKey, JsonValue>) -> RuleOutcome {
    self.entered.notify_one();
    self.release.notified().await;
    RuleOutcome::Valid
  }
}

#[tokio::test]
async fn in_flight_next_is_discarded_after_unmount() {
  let entered = Arc::new(Notify::new());
  let release = Arc::new(Notify::new());
  let catalog = StepCatalog::new(vec![StepDefinition::new("personal", ["first_name"]),
                                      StepDefinition::new("review", Vec::<String>::new())]).expect("catalog");
  let rules = RuleSet::new().rule("first_name",
                                  Arc::new(GatedRule { entered: entered.clone(), release: release.clone() }));

  let storage = Arc::new(InMemoryStorage::new());
  let handler = Arc::new(RecordingHandler::new());
  let config = FlowConfig::new(FlowIdentity::new("registration", 1));
  let flow = Arc::new(FlowOrchestrator::new(catalog,
                                            config,
                                            rules,
                                            storage.clone(),
                                            Arc::new(RecordingAnalytics::new()),
                                            handler.clone()).expect("orchestrator"));
  flow.mount().await.expect("mount");
  flow.set_data("first_name", json!("Ada"));

  // next queda suspendido dentro de la regla asíncrona
  let in_flight = tokio::spawn({
    let flow = flow.clone();
    async move { flow.next().await }
  });
  entered.notified().await;

  flow.unmount().await;
  assert_eq!(handler.count("flow_abandoned"), 1);
  let writes_at_unmount = storage.write_count("flow_state:registration:v1");

  // al liberar la regla, el resultado en vuelo se descarta: ni avance, ni
  // snapshot posterior al abandono
  release.notify_one();
  let advanced = in_flight.await.expect("join").expect("next");
  assert!(!advanced);
  let state = flow.state();
  assert_eq!(state.current_step_index, 0);
  assert_eq!(state.step_history, vec!["personal"]);
  assert_eq!(storage.write_count("flow_state:registration:v1"), writes_at_unmount);
}

#[tokio::test]
async fn step_viewed_is_emitted_on_mount_and_on_every_change() {
  let (_, analytics, _, flow) = fixture();
  flow.mount().await.expect("mount");
  fill_personal(&flow);
  flow.next().await.expect("next");
  flow.previous().await.expect("previous");
  assert_eq!(analytics.count("step_viewed"), 3);
}

#[tokio::test]
async fn analytics_can_be_disabled_without_touching_the_handler() {
  let storage = Arc::new(InMemoryStorage::new());
  let analytics = Arc::new(RecordingAnalytics::new());
  let handler = Arc::new(RecordingHandler::new());
  let config = FlowConfig::new(FlowIdentity::new("registration", 1)).with_analytics(false);
  let flow = FlowOrchestrator::new(catalog(), config, rules(), storage, analytics.clone(), handler.clone()).expect("orchestrator");
  flow.mount().await.expect("mount");
  assert!(analytics.records().is_empty());
  assert_eq!(handler.count("step_viewed"), 1);
}
