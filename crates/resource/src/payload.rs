// Archivo: payload.rs
// Propósito: representar la entrada estructurada de create/update y
// aplicarla sobre una entidad, acumulando todas las violaciones.
use crate::errors::Result;
use entity_domain::{Cardinality, DomainError, Entity, EntityId, EntityRef, Violation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Objeto JSON con claves de campo o de asociación.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construye el payload desde un valor JSON, que debe ser un objeto.
    pub fn from_json(value: Value) -> std::result::Result<Self, DomainError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(DomainError::SerializationError(format!("se esperaba un objeto JSON, se recibió {}",
                                                                 other))),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.0)
    }
}

/// Convierte un identificador JSON en referencia existente. El error
/// interno es el mensaje de la violación.
fn resolve<F>(value: &Value, target: &str, exists: &mut F) -> Result<std::result::Result<EntityRef, &'static str>>
    where F: FnMut(&str, &EntityId) -> Result<bool>
{
    let Ok(id) = EntityId::from_json(value) else {
        return Ok(Err("Identificador inválido."));
    };
    if !exists(target, &id)? {
        return Ok(Err("La entidad referenciada no existe."));
    }
    Ok(Ok(EntityRef::new(target, id)))
}

/// Aplica `payload` sobre `entity`. Las claves ausentes no se tocan.
///
/// `exists` responde si una entidad referenciada existe; sus errores de
/// almacenamiento se propagan. Los problemas del payload se devuelven como
/// violaciones y la entidad puede quedar aplicada a medias, por lo que debe
/// trabajarse sobre una copia.
pub fn apply_payload<F>(entity: &mut Entity, payload: &Payload, mut exists: F) -> Result<Vec<Violation>>
    where F: FnMut(&str, &EntityId) -> Result<bool>
{
    let schema = entity.schema().clone();
    let mut violations = Vec::new();

    for (key, value) in payload.iter() {
        if key == "id" {
            match EntityId::from_json(value) {
                Ok(id) if &id == entity.id() => {}
                _ => violations.push(Violation::new("id", "El identificador no coincide con la entidad.")),
            }
            continue;
        }

        if let Some(def) = schema.field(key) {
            match def.field_type.parse_json(value) {
                Some(v) => {
                    entity.set(key, v)?;
                }
                None => violations.push(Violation::new(key.as_str(),
                                                       format!("Este valor debería ser de tipo {}.", def.field_type))),
            }
            continue;
        }

        let Some(def) = schema.association(key) else {
            violations.push(Violation::new(key.as_str(), "Este campo no existe."));
            continue;
        };

        match def.cardinality {
            Cardinality::ToOne => {
                if value.is_null() {
                    entity.set_one(key, None)?;
                    continue;
                }
                match resolve(value, &def.target, &mut exists)? {
                    Ok(target) => {
                        entity.link(key, target)?;
                    }
                    Err(message) => violations.push(Violation::new(key.as_str(), message)),
                }
            }
            Cardinality::ToMany => {
                let Some(items) = value.as_array() else {
                    violations.push(Violation::new(key.as_str(), "Se esperaba una lista de identificadores."));
                    continue;
                };
                let mut refs = Vec::with_capacity(items.len());
                let before = violations.len();
                for (i, item) in items.iter().enumerate() {
                    let path = format!("{}[{}]", key, i);
                    match resolve(item, &def.target, &mut exists)? {
                        Ok(target) => refs.push(target),
                        Err(message) => violations.push(Violation::new(path, message)),
                    }
                }
                if violations.len() == before {
                    entity.clear(key)?;
                    for r in refs {
                        entity.link(key, r)?;
                    }
                }
            }
        }
    }
    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity_domain::{Catalog, FieldValue};
    use serde_json::json;

    fn always(_: &str, _: &EntityId) -> Result<bool> {
        Ok(true)
    }

    #[test]
    fn applies_fields_and_associations() {
        let mut book = Entity::new(Catalog::book(), EntityId::Int(1));
        let payload = Payload::from_json(json!({
            "title": "Dune",
            "releaseDate": "1965-08-01T00:00:00Z",
            "author": 4
        })).unwrap();
        let violations = apply_payload(&mut book, &payload, always).unwrap();
        assert!(violations.is_empty());
        assert_eq!(book.get_str("title"), Some("Dune"));
        assert!(matches!(book.get("releaseDate"), Some(FieldValue::Timestamp(_))));
        assert_eq!(book.get_one("author").unwrap(), Some(&EntityRef::new("author", 4)));
    }

    #[test]
    fn collects_every_problem() {
        let mut book = Entity::new(Catalog::book(), EntityId::Int(1));
        let payload = Payload::new().with("id", 2)
                                    .with("title", 12)
                                    .with("author", 9)
                                    .with("pages", 300);
        let violations = apply_payload(&mut book, &payload, |_, _| Ok(false)).unwrap();
        let mut paths: Vec<&str> = violations.iter().map(|v| v.property_path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["author", "id", "pages", "title"]);
    }

    #[test]
    fn to_many_replaces_the_set_only_when_every_id_is_valid() {
        let mut author = Entity::new(Catalog::author(), EntityId::Int(1));
        author.link("books", EntityRef::new("book", 1)).unwrap();
        let bad = Payload::new().with("books", json!([2, "nope"]));
        assert_eq!(apply_payload(&mut author, &bad, always).unwrap().len(), 1);
        assert_eq!(author.refs("books").unwrap(), vec![EntityRef::new("book", 1)]);

        let good = Payload::new().with("books", json!([2, 3]));
        assert!(apply_payload(&mut author, &good, always).unwrap().is_empty());
        assert_eq!(author.refs("books").unwrap(),
                   vec![EntityRef::new("book", 2), EntityRef::new("book", 3)]);
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(Payload::from_json(json!([1, 2])).is_err());
    }
}
