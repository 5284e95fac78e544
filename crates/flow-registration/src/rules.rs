use crate::backend::AccountDirectory;
use async_trait::async_trait;
use flow_domain::FieldKey;
use flow_engine::validation::{rule_fn, RuleOutcome, ValidationRule};
use log::warn;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Regla: formato plausible de email (algo@algo.algo, sin espacios).
///
/// No pretende validar el RFC completo: el chequeo definitivo es el correo
/// de confirmación. Un valor ausente o no-string se deja pasar, de eso se
/// encarga `required`.
pub fn email_format(message: impl Into<String>) -> Arc<dyn ValidationRule> {
  let message = message.into();
  rule_fn(move |value, _all| match value.and_then(|v| v.as_str()) {
    Some(s) if !looks_like_email(s) => RuleOutcome::Invalid(message.clone()),
    _ => RuleOutcome::Valid,
  })
}

/// Regla: la contraseña debe mezclar al menos una letra y un dígito.
/// El largo mínimo lo cubre `min_length`, registrada aparte.
pub fn password_format(message: impl Into<String>) -> Arc<dyn ValidationRule> {
  let message = message.into();
  rule_fn(move |value, _all| match value.and_then(|v| v.as_str()) {
    Some(s) if !(s.chars().any(|c| c.is_alphabetic()) && s.chars().any(|c| c.is_ascii_digit())) => {
      RuleOutcome::Invalid(message.clone())
    }
    _ => RuleOutcome::Valid,
  })
}

fn looks_like_email(s: &str) -> bool {
  if s.contains(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = s.split_once('@') else {
    return false;
  };
  !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Regla asíncrona: el email no debe tener ya una cuenta en el directorio.
///
/// Si el directorio falla (red caída) la regla deja pasar el valor y lo
/// anota en el log: la unicidad se re-chequea al crear la cuenta, donde sí
/// bloquea.
pub struct UniqueEmailRule {
  directory: Arc<dyn AccountDirectory>,
  message: String,
}

impl UniqueEmailRule {
  pub fn new(directory: Arc<dyn AccountDirectory>, message: impl Into<String>) -> Arc<dyn ValidationRule> {
    Arc::new(Self { directory, message: message.into() })
  }
}

#[async_trait]
impl ValidationRule for UniqueEmailRule {
  async fn check(&self, value: Option<&JsonValue>, _all: &HashMap<FieldKey, JsonValue>) -> RuleOutcome {
    let Some(email) = value.and_then(|v| v.as_str()) else {
      return RuleOutcome::Valid;
    };
    match self.directory.email_taken(email).await {
      Ok(true) => RuleOutcome::Invalid(self.message.clone()),
      Ok(false) => RuleOutcome::Valid,
      Err(e) => {
        warn!("no se pudo consultar el directorio de cuentas: {}", e);
        RuleOutcome::Valid
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::InMemoryAccounts;
  use serde_json::json;

  async fn check(rule: &Arc<dyn ValidationRule>, value: JsonValue) -> RuleOutcome {
    rule.check(Some(&value), &HashMap::new()).await
  }

  #[tokio::test]
  async fn email_format_accepts_plausible_addresses() {
    let rule = email_format("formato inválido");
    assert_eq!(check(&rule, json!("ada@example.com")).await, RuleOutcome::Valid);
    assert_eq!(check(&rule, json!("a.b+tag@sub.example.org")).await, RuleOutcome::Valid);
  }

  #[tokio::test]
  async fn email_format_rejects_malformed_addresses() {
    let rule = email_format("formato inválido");
    for bad in ["sin-arroba", "@example.com", "ada@sindominio", "ada @example.com", "ada@.com"] {
      assert_eq!(check(&rule, json!(bad)).await, RuleOutcome::Invalid("formato inválido".into()), "caso: {bad}");
    }
  }

  #[tokio::test]
  async fn password_format_needs_letter_and_digit() {
    let rule = password_format("letra y dígito");
    assert_eq!(check(&rule, json!("Abc12345")).await, RuleOutcome::Valid);
    assert_eq!(check(&rule, json!("soloLetras")).await, RuleOutcome::Invalid("letra y dígito".into()));
    assert_eq!(check(&rule, json!("12345678")).await, RuleOutcome::Invalid("letra y dígito".into()));
  }

  #[tokio::test]
  async fn unique_email_consults_the_directory() {
    let accounts = Arc::new(InMemoryAccounts::new());
    accounts.seed("ada@example.com");
    let rule = UniqueEmailRule::new(accounts, "ya registrado");

    assert_eq!(check(&rule, json!("ada@example.com")).await, RuleOutcome::Invalid("ya registrado".into()));
    assert_eq!(check(&rule, json!("nueva@example.com")).await, RuleOutcome::Valid);
  }
}
