// Archivo: persistence.rs
// Propósito: serializar/deserializar el `FlowState` hacia una superficie de
// almacenamiento clave-valor durable. La superficie concreta (disco, base
// de datos, preferencias del dispositivo) es un colaborador externo que
// implementa `StorageSurface`.
use crate::errors::Result;
use async_trait::async_trait;
use flow_domain::{FlowIdentity, FlowState};
use std::sync::Arc;

/// Superficie de almacenamiento clave-valor consumida por el gateway.
///
/// Debe soportar claves string arbitrarias y payloads de al menos unos
/// pocos kilobytes (datos del formulario + metadatos).
#[async_trait]
pub trait StorageSurface: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Gateway de persistencia de un flujo.
///
/// La clave queda fijada por la `FlowIdentity` del flujo, de modo que flujos
/// concurrentes con identidades distintas no colisionen. Todas las
/// escrituras (autosave y saves explícitos) se serializan tras un único
/// lock de escritor: una escritura en vuelo y otra recién disparada nunca
/// se entrelazan; para el lector gana la última confirmada.
pub struct PersistenceGateway {
    storage: Arc<dyn StorageSurface>,
    key: String,
    writer: tokio::sync::Mutex<()>,
}

impl PersistenceGateway {
    pub fn new(storage: Arc<dyn StorageSurface>, identity: &FlowIdentity) -> Self {
        Self { storage,
               key: identity.storage_key(),
               writer: tokio::sync::Mutex::new(()) }
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// Serializa el snapshot completo y lo escribe bajo la clave del flujo.
    pub async fn save_state(&self, state: &FlowState) -> Result<()> {
        let bytes = serde_json::to_vec(state)?;
        let _writer = self.writer.lock().await;
        self.storage.set(&self.key, bytes).await
    }

    /// Carga el snapshot previo si existe. El resume nunca re-valida
    /// retroactivamente: los errores restaurados se limpian para que el
    /// usuario vea el paso limpio.
    pub async fn load_state(&self) -> Result<Option<FlowState>> {
        match self.storage.get(&self.key).await? {
            Some(bytes) => {
                let mut state: FlowState = serde_json::from_slice(&bytes)?;
                state.errors.clear();
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// Borra el snapshot. Se invoca exactamente una vez tras un `complete`
    /// exitoso, para que un flujo terminado no se ofrezca como "resume".
    pub async fn clear_state(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        self.storage.delete(&self.key).await
    }
}
