use thiserror::Error;

// Errores del proceso de alta de cuentas.
//
// Separados de los errores del motor: el motor no sabe qué es una cuenta.
// `RegistrationHandler` los traduce a `FlowError::Completion` para que el
// orquestador mantenga el flujo reintentable.
#[derive(Error, Debug)]
pub enum RegistrationError {
  /// El email ya tiene una cuenta asociada.
  #[error("El email {0} ya está registrado")]
  EmailTaken(String),

  /// Los datos acumulados no alcanzan para crear la cuenta.
  #[error("Datos de registro incompletos: falta {0}")]
  MissingField(String),

  /// Fallo del servicio de cuentas (red, backend caído).
  #[error("Error del servicio de cuentas: {0}")]
  Backend(String),
}
