use crate::errors::RegistrationError;
use async_trait::async_trait;
use flow_domain::FieldKey;
use flow_engine::{FlowError, FlowEvent, FlowEventHandler};
use log::info;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Consulta de unicidad de emails. La usa la regla `unique_email` durante la
/// validación del paso de datos personales.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
  async fn email_taken(&self, email: &str) -> Result<bool, RegistrationError>;
}

/// Servicio que materializa la cuenta con los datos acumulados del flujo.
#[async_trait]
pub trait AccountBackend: Send + Sync {
  async fn create_account(&self, data: &HashMap<FieldKey, JsonValue>) -> Result<(), RegistrationError>;
}

/// Directorio y backend en memoria para tests y para la demo de consola.
#[derive(Default)]
pub struct InMemoryAccounts {
  emails: Mutex<Vec<String>>,
}

impl InMemoryAccounts {
  pub fn new() -> Self {
    Self::default()
  }

  /// Pre-carga un email como ya registrado.
  pub fn seed(&self, email: &str) {
    self.lock().push(email.to_string());
  }

  pub fn account_count(&self) -> usize {
    self.lock().len()
  }

  pub fn has_account(&self, email: &str) -> bool {
    self.lock().iter().any(|e| e == email)
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
    self.emails.lock().unwrap_or_else(|e| e.into_inner())
  }
}

#[async_trait]
impl AccountDirectory for InMemoryAccounts {
  async fn email_taken(&self, email: &str) -> Result<bool, RegistrationError> {
    Ok(self.has_account(email))
  }
}

#[async_trait]
impl AccountBackend for InMemoryAccounts {
  async fn create_account(&self, data: &HashMap<FieldKey, JsonValue>) -> Result<(), RegistrationError> {
    let email = string_field(data, "email")?;
    if self.has_account(&email) {
      return Err(RegistrationError::EmailTaken(email));
    }
    self.lock().push(email);
    Ok(())
  }
}

/// Handler de eventos que crea la cuenta cuando el flujo se completa.
///
/// Un fallo del backend se traduce a `FlowError::Completion`: el orquestador
/// no marca el flujo terminal y el usuario puede reintentar. El resto de los
/// eventos solo se registran en el log.
pub struct RegistrationHandler {
  backend: Arc<dyn AccountBackend>,
}

impl RegistrationHandler {
  pub fn new(backend: Arc<dyn AccountBackend>) -> Self {
    Self { backend }
  }
}

#[async_trait]
impl FlowEventHandler for RegistrationHandler {
  async fn handle(&self, event: FlowEvent) -> flow_engine::Result<()> {
    match event {
      FlowEvent::Completed { data } => {
        self.backend
            .create_account(&data)
            .await
            .map_err(|e| FlowError::Completion(e.to_string()))?;
        info!("cuenta creada");
        Ok(())
      }
      other => {
        info!("evento de flujo: {}", other.name());
        Ok(())
      }
    }
  }
}

fn string_field(data: &HashMap<FieldKey, JsonValue>, key: &str) -> Result<String, RegistrationError> {
  data.get(key)
      .and_then(|v| v.as_str())
      .map(|s| s.to_string())
      .ok_or_else(|| RegistrationError::MissingField(key.to_string()))
}
