// entity.rs
use crate::schema::{AssociationDef, Cardinality, EntitySchema};
use crate::{DomainError, EntityId, EntityRef, FieldType, FieldValue};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Estado del ciclo de vida de una entidad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityState {
  /// Construida pero nunca escrita en el store.
  Transient,
  /// Escrita con éxito al menos una vez.
  Persisted,
  /// Eliminada del store; no debe volver a escribirse.
  Removed,
}

/// Valor de una asociación: referencia única opcional o conjunto de
/// referencias (el orden no es significativo, se itera por inserción).
#[derive(Debug, Clone, PartialEq)]
pub enum Association {
  ToOne(Option<EntityRef>),
  ToMany(IndexSet<EntityRef>),
}

impl Association {
  pub fn refs(&self) -> Vec<EntityRef> {
    match self {
      Association::ToOne(r) => r.iter().cloned().collect(),
      Association::ToMany(set) => set.iter().cloned().collect(),
    }
  }

  pub fn contains(&self, target: &EntityRef) -> bool {
    match self {
      Association::ToOne(r) => r.as_ref() == Some(target),
      Association::ToMany(set) => set.contains(target),
    }
  }

  fn to_json(&self) -> serde_json::Value {
    match self {
      Association::ToOne(Some(r)) => r.id.to_json(),
      Association::ToOne(None) => serde_json::Value::Null,
      Association::ToMany(set) => serde_json::Value::Array(set.iter().map(|r| r.id.to_json()).collect()),
    }
  }
}

/// Registro de negocio identificado: campos tipados según su esquema y
/// asociaciones hacia otras entidades por referencia.
///
/// Los accesores de asociación (`add`, `remove`, `set_one`, `unset_one`)
/// mantienen la simetría con la entidad contraria que reciben. `clear` sólo toca el lado
/// propietario; el servicio reconcilia el resto al escribir.
#[derive(Debug, Clone)]
pub struct Entity {
  schema: Arc<EntitySchema>,
  id: EntityId,
  state: EntityState,
  version: u64,
  fields: IndexMap<String, FieldValue>,
  associations: IndexMap<String, Association>,
}

impl Entity {
  /// Crea una entidad transitoria con todos los campos a `Null` y las
  /// asociaciones vacías.
  pub fn new(schema: Arc<EntitySchema>, id: EntityId) -> Self {
    let fields = schema.fields().iter().map(|f| (f.name.clone(), FieldValue::Null)).collect();
    let associations = schema.associations()
                             .iter()
                             .map(|a| {
                               let empty = match a.cardinality {
                                 Cardinality::ToOne => Association::ToOne(None),
                                 Cardinality::ToMany => Association::ToMany(IndexSet::new()),
                               };
                               (a.name.clone(), empty)
                             })
                             .collect();
    Self { schema, id, state: EntityState::Transient, version: 0, fields, associations }
  }

  pub fn id(&self) -> &EntityId {
    &self.id
  }

  pub fn kind(&self) -> &str {
    self.schema.kind()
  }

  pub fn schema(&self) -> &Arc<EntitySchema> {
    &self.schema
  }

  pub fn state(&self) -> EntityState {
    self.state
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn is_persisted(&self) -> bool {
    self.state == EntityState::Persisted
  }

  pub fn reference(&self) -> EntityRef {
    EntityRef::new(self.kind(), self.id)
  }

  /// Marca la entidad como escrita con la versión indicada. Uso reservado a
  /// implementaciones de store.
  pub fn mark_persisted(&mut self, version: u64) {
    self.state = EntityState::Persisted;
    self.version = version;
  }

  /// Marca la entidad como eliminada. Uso reservado a implementaciones de
  /// store.
  pub fn mark_removed(&mut self) {
    self.state = EntityState::Removed;
  }

  // --- campos ---

  pub fn get(&self, field: &str) -> Option<&FieldValue> {
    self.fields.get(field)
  }

  pub fn get_str(&self, field: &str) -> Option<&str> {
    self.fields.get(field).and_then(FieldValue::as_str)
  }

  pub fn fields(&self) -> &IndexMap<String, FieldValue> {
    &self.fields
  }

  /// Asigna un campo comprobando el tipo declarado. Un entero se acepta en
  /// un campo `float`; `Null` siempre se acepta (lo rechaza el validador si
  /// el campo es obligatorio).
  pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> Result<&mut Self, DomainError> {
    let schema = self.schema.clone();
    let def = schema.require_field(field)?;
    let value = match (def.field_type, value.into()) {
      (_, FieldValue::Null) => FieldValue::Null,
      (FieldType::Float, FieldValue::Integer(i)) => FieldValue::Float(i as f64),
      (expected, v) if v.field_type() == Some(expected) => v,
      (expected, v) => {
        return Err(DomainError::TypeMismatch { field: field.to_string(),
                                               expected: expected.to_string(),
                                               found: v.type_name() })
      }
    };
    self.fields.insert(field.to_string(), value);
    Ok(self)
  }

  // --- asociaciones ---

  pub fn association(&self, name: &str) -> Option<&Association> {
    self.associations.get(name)
  }

  pub fn associations(&self) -> &IndexMap<String, Association> {
    &self.associations
  }

  /// Referencias actuales de una asociación, sea cual sea su cardinalidad.
  pub fn refs(&self, name: &str) -> Result<Vec<EntityRef>, DomainError> {
    self.schema.require_association(name)?;
    Ok(self.associations.get(name).map(Association::refs).unwrap_or_default())
  }

  pub fn get_one(&self, name: &str) -> Result<Option<&EntityRef>, DomainError> {
    match self.associations.get(name) {
      Some(Association::ToOne(r)) => Ok(r.as_ref()),
      Some(Association::ToMany(_)) => Err(DomainError::CardinalityMismatch(name.to_string())),
      None => Err(self.unknown_association(name)),
    }
  }

  pub fn get_many(&self, name: &str) -> Result<&IndexSet<EntityRef>, DomainError> {
    match self.associations.get(name) {
      Some(Association::ToMany(set)) => Ok(set),
      Some(Association::ToOne(_)) => Err(DomainError::CardinalityMismatch(name.to_string())),
      None => Err(self.unknown_association(name)),
    }
  }

  /// Añade `other` a la colección `name` (idempotente) y, si la relación es
  /// bidireccional, refleja el cambio en la inversa de `other`.
  pub fn add(&mut self, name: &str, other: &mut Entity) -> Result<&mut Self, DomainError> {
    let schema = self.schema.clone();
    let def = schema.require_association(name)?;
    if def.cardinality != Cardinality::ToMany {
      return Err(DomainError::CardinalityMismatch(name.to_string()));
    }
    self.link(name, other.reference())?;
    if let Some(inverse) = &def.inverse {
      other.link(inverse, self.reference())?;
    }
    Ok(self)
  }

  /// Quita `other` de la colección `name` (idempotente), también en la
  /// inversa cuando existe.
  pub fn remove(&mut self, name: &str, other: &mut Entity) -> Result<&mut Self, DomainError> {
    let schema = self.schema.clone();
    let def = schema.require_association(name)?;
    if def.cardinality != Cardinality::ToMany {
      return Err(DomainError::CardinalityMismatch(name.to_string()));
    }
    self.unlink(name, &other.reference())?;
    if let Some(inverse) = &def.inverse {
      other.unlink(inverse, &self.reference())?;
    }
    Ok(self)
  }

  /// Vacía la colección del lado propietario sin condiciones.
  pub fn clear(&mut self, name: &str) -> Result<&mut Self, DomainError> {
    match self.associations.get_mut(name) {
      Some(Association::ToMany(set)) => {
        set.clear();
        Ok(self)
      }
      Some(Association::ToOne(_)) => Err(DomainError::CardinalityMismatch(name.to_string())),
      None => Err(self.unknown_association(name)),
    }
  }

  /// Asigna (o limpia) una asociación a uno. Con `Some(other)` y relación
  /// bidireccional también enlaza la inversa en `other`.
  ///
  /// La contraparte anterior sólo se conoce por referencia, así que su
  /// inversa no se toca aquí: se libera con `unset_one` o la reconcilia el
  /// servicio al escribir.
  pub fn set_one(&mut self, name: &str, other: Option<&mut Entity>) -> Result<&mut Self, DomainError> {
    let schema = self.schema.clone();
    let def = schema.require_association(name)?;
    if def.cardinality != Cardinality::ToOne {
      return Err(DomainError::CardinalityMismatch(name.to_string()));
    }
    match other {
      Some(other) => {
        self.link(name, other.reference())?;
        if let Some(inverse) = &def.inverse {
          other.link(inverse, self.reference())?;
        }
      }
      None => {
        self.associations.insert(name.to_string(), Association::ToOne(None));
      }
    }
    Ok(self)
  }

  /// Suelta la asociación a uno `name` si apunta a `previous` y quita
  /// `self` de la inversa de `previous`. Devuelve `true` si hubo cambio.
  pub fn unset_one(&mut self, name: &str, previous: &mut Entity) -> Result<bool, DomainError> {
    let schema = self.schema.clone();
    let def = schema.require_association(name)?;
    if def.cardinality != Cardinality::ToOne {
      return Err(DomainError::CardinalityMismatch(name.to_string()));
    }
    if !self.unlink(name, &previous.reference())? {
      return Ok(false);
    }
    if let Some(inverse) = &def.inverse {
      previous.unlink(inverse, &self.reference())?;
    }
    Ok(true)
  }

  /// Enlace de bajo nivel, sin tocar la inversa. En una asociación a uno
  /// reemplaza la referencia. Devuelve `true` si hubo cambio.
  pub fn link(&mut self, name: &str, target: EntityRef) -> Result<bool, DomainError> {
    let schema = self.schema.clone();
    let def = schema.require_association(name)?;
    Self::check_target(def, &target)?;
    match self.associations.get_mut(name) {
      Some(Association::ToOne(slot)) => {
        let changed = slot.as_ref() != Some(&target);
        *slot = Some(target);
        Ok(changed)
      }
      Some(Association::ToMany(set)) => Ok(set.insert(target)),
      None => Err(self.unknown_association(name)),
    }
  }

  /// Desenlace de bajo nivel, sin tocar la inversa. Devuelve `true` si la
  /// referencia estaba presente.
  pub fn unlink(&mut self, name: &str, target: &EntityRef) -> Result<bool, DomainError> {
    match self.associations.get_mut(name) {
      Some(Association::ToOne(slot)) if slot.as_ref() == Some(target) => {
        *slot = None;
        Ok(true)
      }
      Some(Association::ToOne(_)) => Ok(false),
      Some(Association::ToMany(set)) => Ok(set.shift_remove(target)),
      None => Err(self.unknown_association(name)),
    }
  }

  fn check_target(def: &AssociationDef, target: &EntityRef) -> Result<(), DomainError> {
    if def.target != target.kind {
      return Err(DomainError::ValidationError(format!("'{}' espera entidades '{}', se recibió '{}'",
                                                      def.name, def.target, target.kind)));
    }
    Ok(())
  }

  fn unknown_association(&self, name: &str) -> DomainError {
    DomainError::UnknownAssociation { kind: self.kind().to_string(), association: name.to_string() }
  }

  /// Representación JSON: `id`, campos y asociaciones como identificadores.
  pub fn to_json(&self) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("id".into(), self.id.to_json());
    for (name, value) in &self.fields {
      map.insert(name.clone(), value.to_json());
    }
    for (name, assoc) in &self.associations {
      map.insert(name.clone(), assoc.to_json());
    }
    serde_json::Value::Object(map)
  }
}

/// Dos entidades son iguales si coinciden tipo, id, versión, campos y
/// asociaciones. El estado del ciclo de vida no participa.
impl PartialEq for Entity {
  fn eq(&self, other: &Self) -> bool {
    self.kind() == other.kind()
    && self.id == other.id
    && self.version == other.version
    && self.fields == other.fields
    && self.associations == other.associations
  }
}

impl fmt::Display for Entity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}(id: {}, version: {})", self.kind(), self.id, self.version)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::FieldDef;

  fn schema() -> Arc<EntitySchema> {
    Arc::new(EntitySchema::new("note").with_field(FieldDef::new("title", FieldType::String))
                                      .with_field(FieldDef::new("score", FieldType::Float))
                                      .with_association(AssociationDef::to_one("parent", "note")))
  }

  #[test]
  fn new_entity_is_transient_with_null_fields() {
    let e = Entity::new(schema(), EntityId::Int(1));
    assert_eq!(e.state(), EntityState::Transient);
    assert_eq!(e.get("title"), Some(&FieldValue::Null));
    assert_eq!(e.get_one("parent").unwrap(), None);
  }

  #[test]
  fn set_checks_types_and_widens_integers() -> Result<(), DomainError> {
    let mut e = Entity::new(schema(), EntityId::Int(1));
    e.set("title", "hola")?.set("score", 3)?;
    assert_eq!(e.get("score"), Some(&FieldValue::Float(3.0)));
    assert!(matches!(e.set("title", 5), Err(DomainError::TypeMismatch { .. })));
    assert!(matches!(e.set("missing", 5), Err(DomainError::UnknownField { .. })));
    Ok(())
  }

  #[test]
  fn link_rejects_wrong_target_kind() {
    let mut e = Entity::new(schema(), EntityId::Int(1));
    assert!(e.link("parent", EntityRef::new("book", 2)).is_err());
    assert!(e.clear("parent").is_err());
  }

  #[test]
  fn to_json_includes_id_fields_and_associations() -> Result<(), DomainError> {
    let mut e = Entity::new(schema(), EntityId::Int(1));
    e.set("title", "x")?;
    e.link("parent", EntityRef::new("note", 9))?;
    let json = e.to_json();
    assert_eq!(json["id"], 1);
    assert_eq!(json["title"], "x");
    assert_eq!(json["parent"], 9);
    Ok(())
  }
}
