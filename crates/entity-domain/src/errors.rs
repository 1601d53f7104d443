// errors.rs
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
  #[error("Error de validación: {0}")]
  ValidationError(String),
  #[error("Campo desconocido '{field}' en '{kind}'")]
  UnknownField { kind: String, field: String },
  #[error("Asociación desconocida '{association}' en '{kind}'")]
  UnknownAssociation { kind: String, association: String },
  #[error("Tipo inválido para '{field}': se esperaba {expected}, se recibió {found}")]
  TypeMismatch { field: String, expected: String, found: String },
  #[error("Cardinalidad inválida para '{0}'")]
  CardinalityMismatch(String),
  #[error("Identificador inválido: {0}")]
  InvalidIdentifier(String),
  #[error("Error de serialización: {0}")]
  SerializationError(String),
}

impl From<serde_json::Error> for DomainError {
  fn from(e: serde_json::Error) -> Self {
    Self::SerializationError(e.to_string())
  }
}
