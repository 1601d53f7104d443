// identifier.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identificador de una entidad. Puede ser un UUID (generado al crear) o un
/// entero asignado por la secuencia del store. Una vez asignado no cambia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
  Int(i64),
  Uuid(Uuid),
}

impl EntityId {
  pub fn new_uuid() -> Self {
    Self::Uuid(Uuid::new_v4())
  }

  /// Convierte un valor JSON (número o string) en identificador.
  pub fn from_json(value: &serde_json::Value) -> Result<Self, DomainError> {
    match value {
      serde_json::Value::Number(n) => {
        n.as_i64().map(Self::Int).ok_or_else(|| DomainError::InvalidIdentifier(n.to_string()))
      }
      serde_json::Value::String(s) => s.parse(),
      other => Err(DomainError::InvalidIdentifier(other.to_string())),
    }
  }

  pub fn to_json(&self) -> serde_json::Value {
    match self {
      Self::Int(i) => serde_json::json!(i),
      Self::Uuid(u) => serde_json::json!(u.to_string()),
    }
  }
}

impl FromStr for EntityId {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
      return Ok(Self::Int(i));
    }
    Uuid::parse_str(s).map(Self::Uuid).map_err(|_| DomainError::InvalidIdentifier(s.to_string()))
  }
}

impl fmt::Display for EntityId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int(i) => write!(f, "{}", i),
      Self::Uuid(u) => write!(f, "{}", u),
    }
  }
}

impl From<Uuid> for EntityId {
  fn from(u: Uuid) -> Self {
    Self::Uuid(u)
  }
}

impl From<i64> for EntityId {
  fn from(i: i64) -> Self {
    Self::Int(i)
  }
}

/// Referencia ligera (tipo + id) hacia otra entidad. Es lo que guardan las
/// asociaciones; nunca contiene la entidad cargada.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
  pub kind: String,
  pub id: EntityId,
}

impl EntityRef {
  pub fn new(kind: impl Into<String>, id: impl Into<EntityId>) -> Self {
    Self { kind: kind.into(), id: id.into() }
  }
}

impl fmt::Display for EntityRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}#{}", self.kind, self.id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_integers_before_uuids() {
    assert_eq!("42".parse::<EntityId>().unwrap(), EntityId::Int(42));
    let u = Uuid::new_v4();
    assert_eq!(u.to_string().parse::<EntityId>().unwrap(), EntityId::Uuid(u));
    assert!("not-an-id".parse::<EntityId>().is_err());
  }

  #[test]
  fn json_identifiers() {
    assert_eq!(EntityId::from_json(&serde_json::json!(7)).unwrap(), EntityId::Int(7));
    assert!(EntityId::from_json(&serde_json::json!(true)).is_err());
    let id = EntityId::new_uuid();
    assert_eq!(EntityId::from_json(&id.to_json()).unwrap(), id);
  }
}
