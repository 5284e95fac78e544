// config.rs
use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// Identidad lógica de un flujo (nombre + versión). Determina la clave bajo
/// la cual se persiste el estado, de modo que flujos distintos no colisionen
/// y una nueva versión del flujo no intente reanudar snapshots viejos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowIdentity {
  pub name: String,
  pub version: u32,
}

impl FlowIdentity {
  pub fn new(name: impl Into<String>, version: u32) -> Self {
    Self { name: name.into(), version }
  }

  /// Clave de almacenamiento derivada de la identidad.
  pub fn storage_key(&self) -> String {
    format!("flow_state:{}:v{}", self.name, self.version)
  }
}

/// Política de autosave del flujo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
  pub enabled: bool,
  pub interval_ms: u64,
}

impl AutosaveConfig {
  pub fn disabled() -> Self {
    Self { enabled: false, interval_ms: 0 }
  }

  pub fn every_ms(interval_ms: u64) -> Self {
    Self { enabled: true, interval_ms }
  }
}

impl Default for AutosaveConfig {
  fn default() -> Self {
    Self::disabled()
  }
}

/// Configuración de un flujo, propiedad del llamador y de solo lectura para
/// el motor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
  pub identity: FlowIdentity,
  pub autosave: AutosaveConfig,
  pub persistence_enabled: bool,
  pub analytics_enabled: bool,
}

impl FlowConfig {
  /// Configuración por defecto: persistencia y analítica habilitadas,
  /// autosave deshabilitado.
  pub fn new(identity: FlowIdentity) -> Self {
    Self { identity,
           autosave: AutosaveConfig::disabled(),
           persistence_enabled: true,
           analytics_enabled: true }
  }

  pub fn with_autosave(&self, autosave: AutosaveConfig) -> Self {
    let mut cfg = self.clone();
    cfg.autosave = autosave;
    cfg
  }

  pub fn with_persistence(&self, enabled: bool) -> Self {
    let mut cfg = self.clone();
    cfg.persistence_enabled = enabled;
    cfg
  }

  pub fn with_analytics(&self, enabled: bool) -> Self {
    let mut cfg = self.clone();
    cfg.analytics_enabled = enabled;
    cfg
  }

  /// Valida la configuración. Falla rápido en construcción del flujo.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.autosave.enabled && self.autosave.interval_ms == 0 {
      return Err(ConfigError::InvalidAutosaveInterval(self.autosave.interval_ms));
    }
    Ok(())
  }
}
