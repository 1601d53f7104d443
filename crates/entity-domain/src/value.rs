// value.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Tipo declarado de un campo en el esquema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
  String,
  Integer,
  Float,
  Boolean,
  Timestamp,
  Json,
}

impl FieldType {
  /// Interpreta un valor JSON como valor de este tipo. `null` siempre se
  /// acepta aquí; si el campo lo admite lo decide el validador.
  pub fn parse_json(&self, value: &serde_json::Value) -> Option<FieldValue> {
    use serde_json::Value as J;
    if value.is_null() {
      return Some(FieldValue::Null);
    }
    match (self, value) {
      (FieldType::String, J::String(s)) => Some(FieldValue::String(s.clone())),
      (FieldType::Integer, J::Number(n)) => n.as_i64().map(FieldValue::Integer),
      (FieldType::Float, J::Number(n)) => n.as_f64().map(FieldValue::Float),
      (FieldType::Boolean, J::Bool(b)) => Some(FieldValue::Boolean(*b)),
      (FieldType::Timestamp, J::String(s)) => {
        DateTime::parse_from_rfc3339(s).ok().map(|d| FieldValue::Timestamp(d.with_timezone(&Utc)))
      }
      (FieldType::Json, v) => Some(FieldValue::Json(v.clone())),
      _ => None,
    }
  }

  /// Valor de ejemplo del tipo, usado por las pruebas de conformidad.
  pub fn sample(&self) -> FieldValue {
    match self {
      FieldType::String => FieldValue::String("sample".into()),
      FieldType::Integer => FieldValue::Integer(42),
      FieldType::Float => FieldValue::Float(4.2),
      FieldType::Boolean => FieldValue::Boolean(true),
      FieldType::Timestamp => FieldValue::Timestamp(Utc::now()),
      FieldType::Json => FieldValue::Json(serde_json::json!({"sample": true})),
    }
  }
}

impl fmt::Display for FieldType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      FieldType::String => "string",
      FieldType::Integer => "integer",
      FieldType::Float => "float",
      FieldType::Boolean => "boolean",
      FieldType::Timestamp => "timestamp",
      FieldType::Json => "json",
    };
    f.write_str(s)
  }
}

/// Valor de un campo de entidad.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
  Null,
  String(String),
  Integer(i64),
  Float(f64),
  Boolean(bool),
  Timestamp(DateTime<Utc>),
  Json(serde_json::Value),
}

impl FieldValue {
  pub fn field_type(&self) -> Option<FieldType> {
    match self {
      FieldValue::Null => None,
      FieldValue::String(_) => Some(FieldType::String),
      FieldValue::Integer(_) => Some(FieldType::Integer),
      FieldValue::Float(_) => Some(FieldType::Float),
      FieldValue::Boolean(_) => Some(FieldType::Boolean),
      FieldValue::Timestamp(_) => Some(FieldType::Timestamp),
      FieldValue::Json(_) => Some(FieldType::Json),
    }
  }

  pub fn type_name(&self) -> String {
    self.field_type().map(|t| t.to_string()).unwrap_or_else(|| "null".into())
  }

  pub fn is_null(&self) -> bool {
    matches!(self, FieldValue::Null)
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      FieldValue::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      FieldValue::Integer(i) => Some(*i),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      FieldValue::Boolean(b) => Some(*b),
      _ => None,
    }
  }

  pub fn to_json(&self) -> serde_json::Value {
    match self {
      FieldValue::Null => serde_json::Value::Null,
      FieldValue::String(s) => serde_json::json!(s),
      FieldValue::Integer(i) => serde_json::json!(i),
      FieldValue::Float(x) => serde_json::json!(x),
      FieldValue::Boolean(b) => serde_json::json!(b),
      FieldValue::Timestamp(t) => serde_json::json!(t.to_rfc3339()),
      FieldValue::Json(v) => v.clone(),
    }
  }

  /// Búsqueda de texto: `needle` debe venir ya en minúsculas.
  pub fn contains_text(&self, needle: &str) -> bool {
    match self {
      FieldValue::String(s) => s.to_lowercase().contains(needle),
      FieldValue::Integer(i) => i.to_string().contains(needle),
      FieldValue::Float(x) => x.to_string().contains(needle),
      _ => false,
    }
  }

  /// Orden total usado al ordenar resultados: `Null` primero, luego por
  /// tipo y dentro del mismo tipo por valor.
  pub fn compare(&self, other: &FieldValue) -> Ordering {
    use FieldValue::*;
    match (self, other) {
      (Null, Null) => Ordering::Equal,
      (Null, _) => Ordering::Less,
      (_, Null) => Ordering::Greater,
      (String(a), String(b)) => a.cmp(b),
      (Integer(a), Integer(b)) => a.cmp(b),
      (Float(a), Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
      (Integer(a), Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
      (Float(a), Integer(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
      (Boolean(a), Boolean(b)) => a.cmp(b),
      (Timestamp(a), Timestamp(b)) => a.cmp(b),
      (Json(a), Json(b)) => a.to_string().cmp(&b.to_string()),
      (a, b) => a.rank().cmp(&b.rank()),
    }
  }

  fn rank(&self) -> u8 {
    match self {
      FieldValue::Null => 0,
      FieldValue::Boolean(_) => 1,
      FieldValue::Integer(_) | FieldValue::Float(_) => 2,
      FieldValue::String(_) => 3,
      FieldValue::Timestamp(_) => 4,
      FieldValue::Json(_) => 5,
    }
  }
}

impl fmt::Display for FieldValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FieldValue::Null => f.write_str("null"),
      FieldValue::String(s) => f.write_str(s),
      FieldValue::Integer(i) => write!(f, "{}", i),
      FieldValue::Float(x) => write!(f, "{}", x),
      FieldValue::Boolean(b) => write!(f, "{}", b),
      FieldValue::Timestamp(t) => f.write_str(&t.to_rfc3339()),
      FieldValue::Json(v) => write!(f, "{}", v),
    }
  }
}

impl From<&str> for FieldValue {
  fn from(s: &str) -> Self {
    FieldValue::String(s.to_string())
  }
}

impl From<String> for FieldValue {
  fn from(s: String) -> Self {
    FieldValue::String(s)
  }
}

impl From<i64> for FieldValue {
  fn from(i: i64) -> Self {
    FieldValue::Integer(i)
  }
}

impl From<i32> for FieldValue {
  fn from(i: i32) -> Self {
    FieldValue::Integer(i as i64)
  }
}

impl From<f64> for FieldValue {
  fn from(x: f64) -> Self {
    FieldValue::Float(x)
  }
}

impl From<bool> for FieldValue {
  fn from(b: bool) -> Self {
    FieldValue::Boolean(b)
  }
}

impl From<DateTime<Utc>> for FieldValue {
  fn from(t: DateTime<Utc>) -> Self {
    FieldValue::Timestamp(t)
  }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
  fn from(v: Option<T>) -> Self {
    v.map(Into::into).unwrap_or(FieldValue::Null)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn parse_json_respects_declared_type() {
    assert_eq!(FieldType::String.parse_json(&json!("a")), Some(FieldValue::from("a")));
    assert_eq!(FieldType::Integer.parse_json(&json!("a")), None);
    assert_eq!(FieldType::Float.parse_json(&json!(3)), Some(FieldValue::Float(3.0)));
    assert_eq!(FieldType::Boolean.parse_json(&json!(null)), Some(FieldValue::Null));
    let ts = FieldType::Timestamp.parse_json(&json!("2024-01-02T03:04:05Z")).unwrap();
    assert_eq!(ts.field_type(), Some(FieldType::Timestamp));
    assert!(FieldType::Timestamp.parse_json(&json!("ayer")).is_none());
  }

  #[test]
  fn null_sorts_first() {
    assert_eq!(FieldValue::Null.compare(&FieldValue::from("a")), Ordering::Less);
    assert_eq!(FieldValue::from(2).compare(&FieldValue::Float(1.5)), Ordering::Greater);
    assert_eq!(FieldValue::from("b").compare(&FieldValue::from("a")), Ordering::Greater);
  }

  #[test]
  fn text_search_is_case_insensitive_on_value() {
    assert!(FieldValue::from("Rust en Acción").contains_text("acción"));
    assert!(!FieldValue::Boolean(true).contains_text("true"));
  }
}
