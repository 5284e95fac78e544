//! flow-registration: flujos concretos de alta de usuario
//!
//! Crate que arma, sobre el motor genérico `flow_engine`, los dos recorridos
//! de producto: el asistente de registro (datos personales, credenciales,
//! revisión) y el de onboarding (bienvenida, preferencias saltables).
//! Define además las reglas de formato propias del dominio de cuentas y el
//! handler que crea la cuenta al finalizar el flujo.

pub mod backend;
pub mod errors;
pub mod flows;
pub mod rules;

pub use backend::{AccountBackend, AccountDirectory, InMemoryAccounts, RegistrationHandler};
pub use errors::RegistrationError;
pub use flows::{onboarding_flow, registration_flow};
