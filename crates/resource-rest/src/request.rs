// Archivo: request.rs
// Propósito: petición REST independiente del transporte y su decodificación
// a parámetros del servicio.
use crate::errors::RestError;
use entity_domain::{EntityId, EntitySchema, FieldValue};
use indexmap::IndexMap;
use resource::{Condition, Criteria, Direction, FindParams, OrderBy, Payload};
use serde_json::Value;

/// Acciones REST soportadas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Find,
    FindOne,
    Create,
    Update,
    Delete,
}

/// Formato de respuesta negociado por `Accept`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Xml,
}

impl Format {
    /// JSON salvo que la cabecera pida XML explícitamente.
    pub fn from_accept(accept: &str) -> Self {
        let accept = accept.to_ascii_lowercase();
        if accept.contains("xml") && !accept.contains("json") {
            Format::Xml
        } else {
            Format::Json
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Xml => "application/xml",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub action: Action,
    pub id: Option<String>,
    pub query: IndexMap<String, String>,
    pub body: Option<String>,
    pub format: Format,
    pub if_match: Option<String>,
}

impl RestRequest {
    fn new(action: Action, id: Option<String>, body: Option<String>) -> Self {
        Self { action,
               id,
               query: IndexMap::new(),
               body,
               format: Format::Json,
               if_match: None }
    }

    pub fn find() -> Self {
        Self::new(Action::Find, None, None)
    }

    pub fn find_one(id: impl Into<String>) -> Self {
        Self::new(Action::FindOne, Some(id.into()), None)
    }

    pub fn create(body: impl Into<String>) -> Self {
        Self::new(Action::Create, None, Some(body.into()))
    }

    pub fn update(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(Action::Update, Some(id.into()), Some(body.into()))
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::new(Action::Delete, Some(id.into()), None)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn accept(mut self, accept: &str) -> Self {
        self.format = Format::from_accept(accept);
        self
    }

    pub fn if_match(mut self, etag: impl Into<String>) -> Self {
        self.if_match = Some(etag.into());
        self
    }

    /// Identificador de la ruta.
    pub fn entity_id(&self) -> Result<EntityId, RestError> {
        let raw = self.id.as_deref().ok_or_else(|| RestError::Malformed("falta el identificador".into()))?;
        Ok(raw.parse()?)
    }

    /// Cuerpo JSON como payload.
    pub fn payload(&self) -> Result<Payload, RestError> {
        let raw = self.body.as_deref().unwrap_or("{}");
        let value: Value = serde_json::from_str(raw)?;
        Ok(Payload::from_json(value)?)
    }

    /// Decodifica `where`, `order`, `limit`, `offset` y `search`.
    pub fn find_params(&self, schema: &EntitySchema) -> Result<FindParams, RestError> {
        let mut params = FindParams::new();
        if let Some(raw) = self.query.get("where") {
            params.criteria = decode_criteria(schema, &serde_json::from_str(raw)?)?;
        }
        if let Some(raw) = self.query.get("order") {
            params.order_by = Some(decode_order(raw)?);
        }
        params.limit = self.number("limit")?;
        params.offset = self.number("offset")?;
        if let Some(raw) = self.query.get("search") {
            params.search = Some(raw.split_whitespace().map(str::to_string).collect());
        }
        Ok(params)
    }

    fn number(&self, key: &str) -> Result<Option<usize>, RestError> {
        self.query
            .get(key)
            .map(|raw| {
                raw.trim()
                   .parse::<usize>()
                   .map_err(|_| RestError::Malformed(format!("'{}' debe ser un entero no negativo", key)))
            })
            .transpose()
    }
}

/// `{"campo": valor}` → igualdad; lista → alguno de; `null` → nulo. Los
/// valores de campo se interpretan según su tipo declarado y los de
/// asociación como identificadores.
fn decode_criteria(schema: &EntitySchema, value: &Value) -> Result<Criteria, RestError> {
    let Value::Object(map) = value else {
        return Err(RestError::Malformed("'where' debe ser un objeto JSON".into()));
    };
    let mut criteria = Criteria::new();
    for (name, raw) in map {
        let condition = match raw {
            Value::Null => Condition::IsNull,
            Value::Array(items) => {
                Condition::OneOf(items.iter().map(|v| decode_value(schema, name, v)).collect::<Result<_, _>>()?)
            }
            other => Condition::Eq(decode_value(schema, name, other)?),
        };
        criteria.insert(name.as_str(), condition);
    }
    Ok(criteria)
}

fn decode_value(schema: &EntitySchema, name: &str, value: &Value) -> Result<FieldValue, RestError> {
    if let Some(def) = schema.field(name) {
        return def.field_type
                  .parse_json(value)
                  .ok_or_else(|| RestError::Malformed(format!("valor inválido para '{}'", name)));
    }
    // id o asociación: el identificador tal cual, texto o entero
    match value {
        Value::String(s) => Ok(FieldValue::String(s.clone())),
        Value::Number(n) => n.as_i64()
                             .map(FieldValue::Integer)
                             .ok_or_else(|| RestError::Malformed(format!("identificador inválido en '{}'", name))),
        _ => Err(RestError::Malformed(format!("identificador inválido en '{}'", name))),
    }
}

/// `{"campo": "ASC|DESC"}` o el nombre de un campo (ascendente).
fn decode_order(raw: &str) -> Result<OrderBy, RestError> {
    let mut order = OrderBy::new();
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => {
            for (name, dir) in map {
                let direction = match dir.as_str().map(str::to_ascii_uppercase).as_deref() {
                    Some("ASC") => Direction::Asc,
                    Some("DESC") => Direction::Desc,
                    _ => return Err(RestError::Malformed(format!("dirección inválida para '{}'", name))),
                };
                order.push(name, direction);
            }
        }
        _ if !raw.trim().is_empty() && !raw.trim_start().starts_with('{') => order.push(raw.trim(), Direction::Asc),
        _ => return Err(RestError::Malformed("'order' inválido".into())),
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity_domain::Catalog;

    #[test]
    fn decodes_find_query() {
        let schema = Catalog::book();
        let req = RestRequest::find().with_query("where", r#"{"title": ["a", "b"], "description": null, "author": 3}"#)
                                     .with_query("order", r#"{"title": "desc"}"#)
                                     .with_query("limit", "10")
                                     .with_query("offset", "5")
                                     .with_query("search", "rust  tokio");
        let params = req.find_params(&schema).unwrap();
        assert_eq!(params.criteria.get("title"), Some(&Condition::OneOf(vec!["a".into(), "b".into()])));
        assert_eq!(params.criteria.get("description"), Some(&Condition::IsNull));
        assert_eq!(params.criteria.get("author"), Some(&Condition::Eq(FieldValue::Integer(3))));
        assert_eq!(params.order_by, Some(OrderBy::new().desc("title")));
        assert_eq!((params.limit, params.offset), (Some(10), Some(5)));
        assert_eq!(params.search, Some(vec!["rust".to_string(), "tokio".to_string()]));
    }

    #[test]
    fn plain_order_is_ascending() {
        let params = RestRequest::find().with_query("order", "title").find_params(&Catalog::book()).unwrap();
        assert_eq!(params.order_by, Some(OrderBy::new().asc("title")));
    }

    #[test]
    fn rejects_bad_input() {
        let schema = Catalog::book();
        for (key, raw) in [("limit", "-1"), ("where", "[1]"), ("where", "{"), ("order", r#"{"title": "UP"}"#)] {
            let err = RestRequest::find().with_query(key, raw).find_params(&schema).unwrap_err();
            assert!(matches!(err, RestError::Malformed(_)), "{}={}", key, raw);
        }
        assert!(RestRequest::find_one("nope").entity_id().is_err());
        assert!(RestRequest::create("[]").payload().is_err());
    }

    #[test]
    fn accept_header_selects_format() {
        assert_eq!(Format::from_accept("application/xml"), Format::Xml);
        assert_eq!(Format::from_accept("application/json, text/xml"), Format::Json);
        assert_eq!(Format::from_accept("*/*"), Format::Json);
    }
}
