// Archivo: validation.rs
// Propósito: motor de validación declarativa por campo. Las reglas pueden
// ser síncronas o asíncronas (por ejemplo un chequeo de unicidad contra un
// servicio externo); el motor espera todas las reglas de los campos del paso
// antes de resolver.
use crate::errors::{FlowError, Result};
use async_trait::async_trait;
use flow_domain::{ConfigError, FieldKey, StepCatalog};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Resultado de evaluar una regla sobre un campo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Valid,
    /// Inválido, con el mensaje a mostrar al usuario.
    Invalid(String),
}

/// Regla de validación declarativa: función (pura o asíncrona) sobre el
/// valor del campo y el conjunto completo de datos acumulados.
///
/// Las reglas nunca "fallan" ante entrada inválida del usuario — eso es un
/// `RuleOutcome::Invalid`. Solo los errores de programación (campo
/// desconocido, regla ausente) se propagan como `FlowError`.
#[async_trait]
pub trait ValidationRule: Send + Sync {
    async fn check(&self, value: Option<&JsonValue>, all_data: &HashMap<FieldKey, JsonValue>) -> RuleOutcome;
}

/// Indica si un valor cuenta como "vacío" para la regla `required`.
fn is_empty(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(s)) => s.is_empty(),
        Some(JsonValue::Array(a)) => a.is_empty(),
        Some(_) => false,
    }
}

struct RequiredRule {
    message: String,
}

#[async_trait]
impl ValidationRule for RequiredRule {
    async fn check(&self, value: Option<&JsonValue>, _all: &HashMap<FieldKey, JsonValue>) -> RuleOutcome {
        if is_empty(value) {
            RuleOutcome::Invalid(self.message.clone())
        } else {
            RuleOutcome::Valid
        }
    }
}

struct MinLengthRule {
    min: usize,
    message: String,
}

#[async_trait]
impl ValidationRule for MinLengthRule {
    async fn check(&self, value: Option<&JsonValue>, _all: &HashMap<FieldKey, JsonValue>) -> RuleOutcome {
        let len = value.and_then(|v| v.as_str()).map(|s| s.chars().count()).unwrap_or(0);
        if len < self.min {
            RuleOutcome::Invalid(self.message.clone())
        } else {
            RuleOutcome::Valid
        }
    }
}

struct MatchesFieldRule {
    other: FieldKey,
    message: String,
}

#[async_trait]
impl ValidationRule for MatchesFieldRule {
    async fn check(&self, value: Option<&JsonValue>, all: &HashMap<FieldKey, JsonValue>) -> RuleOutcome {
        if value == all.get(&self.other) {
            RuleOutcome::Valid
        } else {
            RuleOutcome::Invalid(self.message.clone())
        }
    }
}

struct FnRule<F> {
    check: F,
}

#[async_trait]
impl<F> ValidationRule for FnRule<F>
    where F: Fn(Option<&JsonValue>, &HashMap<FieldKey, JsonValue>) -> RuleOutcome + Send + Sync
{
    async fn check(&self, value: Option<&JsonValue>, all: &HashMap<FieldKey, JsonValue>) -> RuleOutcome {
        (self.check)(value, all)
    }
}

/// Regla: el campo no puede estar vacío (ausente, null, "" o lista vacía).
pub fn required(message: impl Into<String>) -> Arc<dyn ValidationRule> {
    Arc::new(RequiredRule { message: message.into() })
}

/// Regla: el valor (string) debe tener al menos `min` caracteres.
pub fn min_length(min: usize, message: impl Into<String>) -> Arc<dyn ValidationRule> {
    Arc::new(MinLengthRule { min, message: message.into() })
}

/// Regla de igualdad cruzada: el valor debe coincidir con el de `other`.
pub fn matches_field(other: impl Into<FieldKey>, message: impl Into<String>) -> Arc<dyn ValidationRule> {
    Arc::new(MatchesFieldRule { other: other.into(), message: message.into() })
}

/// Adaptador para reglas síncronas ad-hoc definidas como clausuras. Las
/// reglas asíncronas implementan `ValidationRule` directamente.
pub fn rule_fn<F>(check: F) -> Arc<dyn ValidationRule>
    where F: Fn(Option<&JsonValue>, &HashMap<FieldKey, JsonValue>) -> RuleOutcome + Send + Sync + 'static
{
    Arc::new(FnRule { check })
}

/// Conjunto declarativo de reglas por campo. Las reglas de un campo se
/// evalúan en el orden de registro.
#[derive(Default)]
pub struct RuleSet {
    rules: HashMap<FieldKey, Vec<Arc<dyn ValidationRule>>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Añade una regla al final de la lista del campo.
    pub fn rule(mut self, field: impl Into<FieldKey>, rule: Arc<dyn ValidationRule>) -> Self {
        self.rules.entry(field.into()).or_default().push(rule);
        self
    }

    pub fn rules_for(&self, field: &str) -> &[Arc<dyn ValidationRule>] {
        self.rules.get(field).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn has_rules(&self, field: &str) -> bool {
        self.rules.get(field).map(|v| !v.is_empty()).unwrap_or(false)
    }

    fn fields(&self) -> impl Iterator<Item = &FieldKey> {
        self.rules.keys()
    }
}

/// Resultado de validar un paso: mapa de errores (un mensaje por campo
/// fallido; gana la primera regla que falla).
#[derive(Debug, Clone)]
pub struct StepValidation {
    pub valid: bool,
    pub errors: HashMap<FieldKey, String>,
}

/// Motor de validación: evalúa las reglas de los campos de un paso (o de un
/// campo suelto) y produce el mapa de errores. No escribe en el estado —
/// eso es responsabilidad del orquestador.
pub struct ValidationEngine {
    catalog: Arc<StepCatalog>,
    rules: RuleSet,
}

impl ValidationEngine {
    /// Construye el motor validando la configuración (falla rápido):
    /// - toda regla debe apuntar a un campo que algún paso posea;
    /// - todo campo de un paso `required_for_completion` debe tener al menos
    ///   una regla.
    pub fn new(catalog: Arc<StepCatalog>, rules: RuleSet) -> std::result::Result<Self, ConfigError> {
        for field in rules.fields() {
            if catalog.field_owner(field).is_none() {
                return Err(ConfigError::UnknownField(field.clone()));
            }
        }
        for step in catalog.steps() {
            if !step.is_required_for_completion() {
                continue;
            }
            for field in step.fields() {
                if !rules.has_rules(field) {
                    return Err(ConfigError::MissingRule(field.clone()));
                }
            }
        }
        Ok(Self { catalog, rules })
    }

    /// Valida los campos del paso `step_index` contra `data`. Gana la
    /// primera regla que falla por campo; las reglas restantes de ese campo
    /// no se evalúan.
    pub async fn validate_step(&self, step_index: usize, data: &HashMap<FieldKey, JsonValue>) -> Result<StepValidation> {
        let step = self.catalog
                       .get(step_index)
                       .ok_or_else(|| FlowError::NotFound(format!("paso con índice {}", step_index)))?;

        let mut errors = HashMap::new();
        for field in step.fields() {
            if let Some(message) = self.first_failure(field, data).await {
                errors.insert(field.clone(), message);
            }
        }
        Ok(StepValidation { valid: errors.is_empty(), errors })
    }

    /// Valida un campo arbitrario. Devuelve `None` si es válido o el mensaje
    /// de la primera regla fallida. Un campo que ningún paso posee es un
    /// error de programación.
    pub async fn validate_field(&self, key: &str, data: &HashMap<FieldKey, JsonValue>) -> Result<Option<String>> {
        if self.catalog.field_owner(key).is_none() {
            return Err(FlowError::NotFound(format!("campo {}", key)));
        }
        Ok(self.first_failure(key, data).await)
    }

    async fn first_failure(&self, field: &str, data: &HashMap<FieldKey, JsonValue>) -> Option<String> {
        let value = data.get(field);
        for rule in self.rules.rules_for(field) {
            if let RuleOutcome::Invalid(message) = rule.check(value, data).await {
                return Some(message);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_domain::StepDefinition;
    use serde_json::json;

    fn catalog() -> Arc<StepCatalog> {
        Arc::new(StepCatalog::new(vec![StepDefinition::new("security", ["password", "password_confirm"])]).unwrap())
    }

    #[tokio::test]
    async fn first_failing_rule_wins_per_field() {
        let rules = RuleSet::new().rule("password", required("obligatorio"))
                                  .rule("password", min_length(8, "mínimo 8 caracteres"))
                                  .rule("password_confirm", matches_field("password", "no coincide"));
        let engine = ValidationEngine::new(catalog(), rules).unwrap();

        let data = HashMap::new();
        let result = engine.validate_step(0, &data).await.unwrap();
        assert!(!result.valid);
        // required gana a min_length para el mismo campo
        assert_eq!(result.errors.get("password").unwrap(), "obligatorio");
    }

    #[tokio::test]
    async fn cross_field_equality() {
        let rules = RuleSet::new().rule("password", required("obligatorio"))
                                  .rule("password_confirm", matches_field("password", "no coincide"));
        let engine = ValidationEngine::new(catalog(), rules).unwrap();

        let mut data = HashMap::new();
        data.insert("password".to_string(), json!("Abc12345"));
        data.insert("password_confirm".to_string(), json!("otra"));
        let result = engine.validate_step(0, &data).await.unwrap();
        assert_eq!(result.errors.get("password_confirm").unwrap(), "no coincide");

        data.insert("password_confirm".to_string(), json!("Abc12345"));
        let result = engine.validate_step(0, &data).await.unwrap();
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn unknown_field_is_a_programmer_error() {
        let rules = RuleSet::new().rule("password", required("obligatorio"))
                                  .rule("password_confirm", required("obligatorio"));
        let engine = ValidationEngine::new(catalog(), rules).unwrap();
        let err = engine.validate_field("no_existe", &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, FlowError::NotFound(_)));
    }

    #[test]
    fn required_step_field_without_rule_fails_fast() {
        let rules = RuleSet::new().rule("password", required("obligatorio"));
        let err = ValidationEngine::new(catalog(), rules).err().unwrap();
        assert_eq!(err, ConfigError::MissingRule("password_confirm".into()));
    }

    #[test]
    fn rule_for_unowned_field_fails_fast() {
        let rules = RuleSet::new().rule("password", required("obligatorio"))
                                  .rule("password_confirm", required("obligatorio"))
                                  .rule("fantasma", required("?"));
        let err = ValidationEngine::new(catalog(), rules).err().unwrap();
        assert_eq!(err, ConfigError::UnknownField("fantasma".into()));
    }
}
