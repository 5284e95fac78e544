// Archivo: orchestrator.rs
// Propósito: implementar `FlowOrchestrator`, la fachada que compone estado,
// validación, navegación, persistencia y analítica. Es el único componente
// con el que interactúa la UI de los pasos; se construye una instancia por
// flujo activo y se pasa explícitamente (nunca por lookup global).
use crate::errors::Result;
use crate::events::{analytics_payload, AnalyticsSink, FlowEvent, FlowEventHandler};
use crate::navigation::NavigationController;
use crate::persistence::{PersistenceGateway, StorageSurface};
use crate::store::FlowStateStore;
use crate::validation::{RuleSet, ValidationEngine};
use flow_domain::{FieldKey, FlowConfig, FlowState, StepCatalog, StepDefinition};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Snapshot consolidado que la UI usa para renderizar el paso actual.
#[derive(Debug, Clone)]
pub struct FlowContext {
    pub state: FlowState,
    pub current_step: StepDefinition,
    pub can_go_back: bool,
    pub can_go_next: bool,
    pub can_skip: bool,
    pub is_first_step: bool,
    pub is_last_step: bool,
}

/// Orquestador de un flujo multi-paso.
///
/// Responsabilidades:
/// - Gating de `next`/`complete` tras la validación del paso actual.
/// - Envolver cada transición con persistencia y analítica; los fallos de
///   persistencia se registran y se reportan como evento `Error`, pero
///   nunca bloquean la navegación del usuario.
/// - Emitir `StepViewed` cada vez que cambia el paso actual (incluido el
///   montaje) y `Abandoned` exactamente una vez si el flujo se desmonta sin
///   completarse.
/// - Autosave periódico mientras el flujo vive, con escritor serializado.
///
/// Modelo de concurrencia: una instancia por flujo lógico; los intents se
/// procesan de principio a fin antes de aceptar el siguiente. El motor no
/// protege contra doble submit — la UI debe deshabilitar el control mientras
/// una transición esté en vuelo.
pub struct FlowOrchestrator {
    catalog: Arc<StepCatalog>,
    config: FlowConfig,
    store: Arc<FlowStateStore>,
    validator: ValidationEngine,
    nav: NavigationController,
    gateway: Arc<PersistenceGateway>,
    analytics: Arc<dyn AnalyticsSink>,
    handler: Arc<dyn FlowEventHandler>,
    /// Flag de vida: se apaga en `unmount` para descartar efectos de
    /// operaciones en vuelo y detener el autosave.
    alive: Arc<AtomicBool>,
    autosave: Mutex<Option<JoinHandle<()>>>,
}

impl FlowOrchestrator {
    /// Construye el orquestador. Falla rápido ante configuración inválida:
    /// catálogo malformado, intervalo de autosave cero, reglas sobre campos
    /// inexistentes o campos requeridos sin regla.
    pub fn new(catalog: StepCatalog,
               config: FlowConfig,
               rules: RuleSet,
               storage: Arc<dyn StorageSurface>,
               analytics: Arc<dyn AnalyticsSink>,
               handler: Arc<dyn FlowEventHandler>)
               -> Result<Self> {
        config.validate()?;
        let catalog = Arc::new(catalog);
        let validator = ValidationEngine::new(catalog.clone(), rules)?;
        let store = Arc::new(FlowStateStore::new(FlowState::new(catalog.first().id())));
        let nav = NavigationController::new(catalog.clone(), store.clone());
        let gateway = Arc::new(PersistenceGateway::new(storage, &config.identity));
        Ok(Self { catalog,
                  config,
                  store,
                  validator,
                  nav,
                  gateway,
                  analytics,
                  handler,
                  alive: Arc::new(AtomicBool::new(true)),
                  autosave: Mutex::new(None) })
    }

    /// Monta el flujo: rehidrata desde un snapshot previo si la persistencia
    /// está habilitada y existe, emite la vista del paso actual y arranca el
    /// autosave. Un snapshot corrupto no impide el arranque: se registra y
    /// el flujo comienza vacío.
    pub async fn mount(&self) -> Result<()> {
        if self.config.persistence_enabled {
            match self.gateway.load_state().await {
                Ok(Some(previous)) if !previous.is_completed() => self.store.hydrate(previous),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("no se pudo rehidratar el flujo {}: {}", self.gateway.storage_key(), e);
                    self.dispatch_background(FlowEvent::Error { message: e.to_string() }).await;
                }
            }
        }
        self.emit_step_viewed().await;
        self.start_autosave();
        Ok(())
    }

    /// Desmonta el flujo: detiene el autosave y, si nunca se completó,
    /// emite `Abandoned` (exactamente una vez) con los datos acumulados y el
    /// último paso visitado. El snapshot persistido se conserva para que un
    /// montaje posterior pueda reanudar.
    pub async fn unmount(&self) {
        let was_alive = self.alive.swap(false, Ordering::SeqCst);
        self.stop_autosave();
        if was_alive && !self.store.is_completed() {
            let snapshot = self.store.snapshot();
            let step_id = self.current_step().id().to_string();
            let event = FlowEvent::Abandoned { step_id, data: snapshot.data };
            self.record_analytics(&event);
            if let Err(e) = self.handler.handle(event).await {
                log::warn!("handler de abandono falló: {}", e);
            }
        }
    }

    // --- Intents de navegación ---

    /// Avanza al siguiente paso si el actual pasa la validación. En el
    /// último paso se comporta como `complete` (nunca existe un índice
    /// fuera de rango). Devuelve `false` sin mutar nada si la validación
    /// falla — los errores quedan visibles en el estado.
    pub async fn next(&self) -> Result<bool> {
        if !self.is_live() || self.store.is_completed() {
            return Ok(false);
        }
        if self.nav.is_last_step() {
            return self.complete().await;
        }
        if !self.validate_step().await? {
            return Ok(false);
        }
        // La validación pudo suspender; si el flujo se desmontó mientras
        // tanto, el resultado se descarta en lugar de aplicarse.
        if !self.is_live() {
            return Ok(false);
        }
        if !self.nav.advance() {
            return Ok(false);
        }
        self.persist_after_transition().await;
        self.emit_step_viewed().await;
        Ok(true)
    }

    /// Retrocede un paso sin re-validar el que se abandona. No-op
    /// idempotente en el primer paso.
    pub async fn previous(&self) -> Result<bool> {
        if !self.is_live() || !self.nav.retreat() {
            return Ok(false);
        }
        self.persist_after_transition().await;
        self.emit_step_viewed().await;
        Ok(true)
    }

    /// Salta el paso actual sin validarlo, conservando los datos ya
    /// introducidos. Emite `Skipped` con los datos acumulados. No-op si el
    /// paso no es saltable.
    pub async fn skip(&self) -> Result<bool> {
        if !self.is_live() {
            return Ok(false);
        }
        let skipped_id = self.current_step().id().to_string();
        if !self.nav.skip() {
            return Ok(false);
        }
        let data = self.store.snapshot().data;
        self.dispatch_background(FlowEvent::Skipped { step_id: skipped_id, data }).await;
        self.persist_after_transition().await;
        self.emit_step_viewed().await;
        Ok(true)
    }

    /// Salta directamente a `step_id` sin validar los pasos intermedios.
    /// Un id inexistente es un error de programación.
    pub async fn jump_to(&self, step_id: &str) -> Result<bool> {
        if !self.is_live() {
            return Ok(false);
        }
        let before = self.store.current_step_index();
        if !self.nav.jump_to(step_id)? {
            return Ok(false);
        }
        self.persist_after_transition().await;
        if self.store.current_step_index() != before {
            self.emit_step_viewed().await;
        }
        Ok(true)
    }

    /// Completa el flujo: valida el paso terminal, despacha `Completed` al
    /// handler, borra el snapshot persistido (exactamente una vez) y marca
    /// el flujo terminal. Si el handler falla, el flujo queda no-terminal y
    /// el error se propaga tras emitir el evento `Error` — el usuario puede
    /// reintentar. Llamar `complete` sobre un flujo terminado es un no-op y
    /// no re-invoca el handler.
    pub async fn complete(&self) -> Result<bool> {
        if !self.is_live() || self.store.is_completed() || !self.nav.can_complete() {
            return Ok(false);
        }
        if !self.validate_step().await? {
            return Ok(false);
        }
        // Si el flujo se desmontó durante la validación, ni el handler ni
        // la limpieza del snapshot deben ejecutarse.
        if !self.is_live() {
            return Ok(false);
        }

        let data = self.store.snapshot().data;
        let event = FlowEvent::Completed { data };
        if let Err(e) = self.handler.handle(event.clone()).await {
            log::warn!("callback de finalización falló: {}", e);
            self.dispatch_background(FlowEvent::Error { message: e.to_string() }).await;
            return Err(e);
        }
        self.record_analytics(&event);

        if self.config.persistence_enabled {
            if let Err(e) = self.gateway.clear_state().await {
                // No-fatal: el flujo ya terminó; como mucho quedará un
                // snapshot huérfano que el próximo montaje descartará.
                log::warn!("no se pudo limpiar el snapshot {}: {}", self.gateway.storage_key(), e);
                self.dispatch_background(FlowEvent::Error { message: e.to_string() }).await;
            }
        }
        self.nav.finish();
        self.stop_autosave();
        Ok(true)
    }

    // --- Datos ---

    /// Fusiona campos en los datos acumulados. Nunca falla.
    pub fn update_data(&self, fields: HashMap<FieldKey, JsonValue>) {
        self.store.update_data(fields);
    }

    pub fn get_data(&self, key: &str) -> Option<JsonValue> {
        self.store.get_data(key)
    }

    pub fn set_data(&self, key: impl Into<FieldKey>, value: JsonValue) {
        self.store.set_data(key, value);
    }

    pub fn clear_data(&self) {
        self.store.clear_data();
    }

    /// Restaura el snapshot inicial (o rehidratado). Para abandonar sin
    /// persistir el progreso en memoria.
    pub fn reset_state(&self) {
        self.store.reset_state();
    }

    // --- Validación ---

    /// Valida los campos del paso actual y publica el mapa de errores en el
    /// estado (gana la primera regla fallida por campo).
    pub async fn validate_step(&self) -> Result<bool> {
        let snapshot = self.store.snapshot();
        let result = self.validator.validate_step(snapshot.current_step_index, &snapshot.data).await?;
        // Un unmount durante una regla asíncrona descarta el resultado: el
        // mapa de errores no se toca después del desmontaje.
        if self.is_live() {
            self.store.set_errors(result.errors);
        }
        Ok(result.valid)
    }

    /// Valida un único campo y actualiza solo su entrada en el mapa de
    /// errores.
    pub async fn validate_field(&self, key: &str) -> Result<bool> {
        let snapshot = self.store.snapshot();
        let failure = self.validator.validate_field(key, &snapshot.data).await?;
        let valid = failure.is_none();
        self.store.set_field_error(key, failure);
        Ok(valid)
    }

    pub fn clear_errors(&self) {
        self.store.clear_errors();
    }

    // --- Persistencia explícita ---

    /// Guarda el snapshot actual. A diferencia de la persistencia implícita
    /// de las transiciones, aquí el error sí se propaga al llamador.
    pub async fn save_state(&self) -> Result<()> {
        if !self.config.persistence_enabled {
            return Ok(());
        }
        self.gateway.save_state(&self.store.snapshot()).await
    }

    /// Carga el snapshot persistido, rehidratando el estado si existe.
    pub async fn load_state(&self) -> Result<Option<FlowState>> {
        let loaded = self.gateway.load_state().await?;
        if let Some(state) = &loaded {
            self.store.hydrate(state.clone());
        }
        Ok(loaded)
    }

    pub async fn clear_state(&self) -> Result<()> {
        self.gateway.clear_state().await
    }

    // --- Lecturas para la UI ---

    pub fn state(&self) -> FlowState {
        self.store.snapshot()
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn current_step(&self) -> StepDefinition {
        let index = self.store.current_step_index();
        // El invariante de navegación garantiza un índice válido.
        self.catalog.get(index).cloned().unwrap_or_else(|| self.catalog.first().clone())
    }

    pub fn can_go_back(&self) -> bool {
        self.nav.can_go_back()
    }

    pub fn can_go_next(&self) -> bool {
        self.nav.can_go_next()
    }

    pub fn can_skip(&self) -> bool {
        self.nav.can_skip()
    }

    pub fn is_first_step(&self) -> bool {
        self.nav.is_first_step()
    }

    pub fn is_last_step(&self) -> bool {
        self.nav.is_last_step()
    }

    /// Snapshot consolidado para renderizar: estado + paso + flags.
    pub fn context(&self) -> FlowContext {
        FlowContext { state: self.state(),
                      current_step: self.current_step(),
                      can_go_back: self.can_go_back(),
                      can_go_next: self.can_go_next(),
                      can_skip: self.can_skip(),
                      is_first_step: self.is_first_step(),
                      is_last_step: self.is_last_step() }
    }

    // --- Internos ---

    fn is_live(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Persistencia implícita tras una transición: el fallo se registra y
    /// se reporta como evento `Error`, pero la navegación ya ocurrió y no
    /// se revierte.
    async fn persist_after_transition(&self) {
        if !self.config.persistence_enabled || !self.is_live() {
            return;
        }
        if let Err(e) = self.gateway.save_state(&self.store.snapshot()).await {
            log::warn!("fallo de persistencia en {}: {}", self.gateway.storage_key(), e);
            self.dispatch_background(FlowEvent::Error { message: e.to_string() }).await;
        }
    }

    async fn emit_step_viewed(&self) {
        let step = self.current_step();
        let event = FlowEvent::StepViewed { step_id: step.id().to_string(),
                                            step_index: self.store.current_step_index() };
        self.dispatch_background(event).await;
    }

    /// Despacha un evento cuya falla no debe interrumpir al usuario: se
    /// registra en analítica y se entrega al handler; un `Err` del handler
    /// solo se loguea.
    async fn dispatch_background(&self, event: FlowEvent) {
        self.record_analytics(&event);
        if let Err(e) = self.handler.handle(event).await {
            log::warn!("handler de eventos falló: {}", e);
        }
    }

    fn record_analytics(&self, event: &FlowEvent) {
        if self.config.analytics_enabled {
            let session_id = self.store.snapshot().session_id;
            self.analytics.record(event.name(), analytics_payload(session_id, event));
        }
    }

    fn start_autosave(&self) {
        if !self.config.autosave.enabled || !self.config.persistence_enabled {
            return;
        }
        let period = Duration::from_millis(self.config.autosave.interval_ms);
        let store = self.store.clone();
        let gateway = self.gateway.clone();
        let alive = self.alive.clone();
        let handler = self.handler.clone();
        let analytics = self.analytics.clone();
        let analytics_enabled = self.config.analytics_enabled;

        let handle = tokio::spawn(async move {
            // Primer tick en t = period, no inmediato.
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if !alive.load(Ordering::SeqCst) {
                    break;
                }
                let snapshot = store.snapshot();
                if snapshot.is_completed() {
                    break;
                }
                if let Err(e) = gateway.save_state(&snapshot).await {
                    log::warn!("autosave falló en {}: {}", gateway.storage_key(), e);
                    let event = FlowEvent::Error { message: e.to_string() };
                    if analytics_enabled {
                        analytics.record(event.name(), analytics_payload(snapshot.session_id, &event));
                    }
                    if let Err(e) = handler.handle(event).await {
                        log::warn!("handler de eventos falló: {}", e);
                    }
                }
            }
        });
        *self.autosave.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    fn stop_autosave(&self) {
        if let Some(handle) = self.autosave.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

impl Drop for FlowOrchestrator {
    fn drop(&mut self) {
        // El abandono se emite en `unmount` (async); aquí solo se garantiza
        // que el timer de autosave no sobreviva al orquestador.
        self.stop_autosave();
    }
}
