// validation.rs
use crate::{Entity, FieldValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Descripción estructurada del incumplimiento de una regla.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
  pub property_path: String,
  pub message: String,
}

impl Violation {
  pub fn new(property_path: impl Into<String>, message: impl Into<String>) -> Self {
    Self { property_path: property_path.into(), message: message.into() }
  }
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.property_path, self.message)
  }
}

/// Valida el estado candidato de una entidad. Una lista vacía significa
/// que la entidad es válida.
pub trait Validator: Send + Sync {
  fn validate(&self, entity: &Entity) -> Vec<Violation>;
}

/// Reglas derivadas del esquema: campos obligatorios y longitud máxima.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl Validator for SchemaValidator {
  fn validate(&self, entity: &Entity) -> Vec<Violation> {
    let mut violations = Vec::new();
    for def in entity.schema().fields() {
      let value = entity.get(&def.name).unwrap_or(&FieldValue::Null);
      if def.required {
        let blank = match value {
          FieldValue::Null => true,
          FieldValue::String(s) => s.trim().is_empty(),
          _ => false,
        };
        if blank {
          violations.push(Violation::new(&def.name, "Este valor no debería estar vacío."));
          continue;
        }
      }
      if let (Some(max), FieldValue::String(s)) = (def.max_length, value) {
        if s.chars().count() > max {
          violations.push(Violation::new(&def.name,
                                         format!("Este valor es demasiado largo. Debería tener {} caracteres o \
                                                  menos.",
                                                 max)));
        }
      }
    }
    violations
  }
}

/// Validador a partir de una closure; útil para reglas puntuales de un tipo.
pub struct FnValidator<F>
  where F: Fn(&Entity) -> Vec<Violation> + Send + Sync
{
  check: F,
}

impl<F> FnValidator<F> where F: Fn(&Entity) -> Vec<Violation> + Send + Sync
{
  pub fn new(check: F) -> Self {
    Self { check }
  }
}

impl<F> Validator for FnValidator<F> where F: Fn(&Entity) -> Vec<Violation> + Send + Sync
{
  fn validate(&self, entity: &Entity) -> Vec<Violation> {
    (self.check)(entity)
  }
}

/// Ejecuta varios validadores y concatena sus violaciones.
#[derive(Clone, Default)]
pub struct ValidatorChain {
  validators: Vec<Arc<dyn Validator>>,
}

impl ValidatorChain {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, validator: impl Validator + 'static) -> Self {
    self.validators.push(Arc::new(validator));
    self
  }
}

impl Validator for ValidatorChain {
  fn validate(&self, entity: &Entity) -> Vec<Violation> {
    self.validators.iter().flat_map(|v| v.validate(entity)).collect()
  }
}
