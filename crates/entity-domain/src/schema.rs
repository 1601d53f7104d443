// schema.rs
//
// Descripción explícita de cada tipo de entidad: campos, asociaciones y
// columnas de búsqueda. Sustituye a los metadatos que en un ORM se obtienen
// por reflexión; el servicio, el store y las pruebas de conformidad leen de
// aquí.
use crate::{DomainError, FieldType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cómo se asigna el identificador de una entidad nueva.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdStrategy {
  /// UUID v4 generado por el servicio al crear.
  Uuid,
  /// Entero asignado por el store (`next_sequence`).
  Sequence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
  ToOne,
  ToMany,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
  pub name: String,
  pub field_type: FieldType,
  pub required: bool,
  pub max_length: Option<usize>,
}

impl FieldDef {
  pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
    Self { name: name.into(), field_type, required: false, max_length: None }
  }

  pub fn required(mut self) -> Self {
    self.required = true;
    self
  }

  pub fn max_length(mut self, max: usize) -> Self {
    self.max_length = Some(max);
    self
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationDef {
  pub name: String,
  pub target: String,
  pub cardinality: Cardinality,
  /// Nombre de la asociación inversa en el esquema destino, si la relación
  /// es bidireccional.
  pub inverse: Option<String>,
}

impl AssociationDef {
  pub fn to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
    Self { name: name.into(), target: target.into(), cardinality: Cardinality::ToOne, inverse: None }
  }

  pub fn to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
    Self { name: name.into(), target: target.into(), cardinality: Cardinality::ToMany, inverse: None }
  }

  pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
    self.inverse = Some(inverse.into());
    self
  }

  pub fn is_bidirectional(&self) -> bool {
    self.inverse.is_some()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
  kind: String,
  id_strategy: IdStrategy,
  fields: Vec<FieldDef>,
  associations: Vec<AssociationDef>,
  searchable: Vec<String>,
}

impl EntitySchema {
  pub fn new(kind: impl Into<String>) -> Self {
    Self { kind: kind.into(),
           id_strategy: IdStrategy::Uuid,
           fields: Vec::new(),
           associations: Vec::new(),
           searchable: Vec::new() }
  }

  pub fn with_id_strategy(mut self, strategy: IdStrategy) -> Self {
    self.id_strategy = strategy;
    self
  }

  pub fn with_field(mut self, field: FieldDef) -> Self {
    self.fields.push(field);
    self
  }

  pub fn with_association(mut self, association: AssociationDef) -> Self {
    self.associations.push(association);
    self
  }

  /// Declara los campos sobre los que opera la búsqueda libre.
  pub fn searchable<I, S>(mut self, fields: I) -> Self
    where I: IntoIterator<Item = S>,
          S: Into<String>
  {
    self.searchable = fields.into_iter().map(Into::into).collect();
    self
  }

  pub fn kind(&self) -> &str {
    &self.kind
  }

  pub fn id_strategy(&self) -> IdStrategy {
    self.id_strategy
  }

  pub fn fields(&self) -> &[FieldDef] {
    &self.fields
  }

  pub fn associations(&self) -> &[AssociationDef] {
    &self.associations
  }

  pub fn searchable_fields(&self) -> &[String] {
    &self.searchable
  }

  pub fn field(&self, name: &str) -> Option<&FieldDef> {
    self.fields.iter().find(|f| f.name == name)
  }

  pub fn association(&self, name: &str) -> Option<&AssociationDef> {
    self.associations.iter().find(|a| a.name == name)
  }

  pub fn association_names(&self) -> Vec<&str> {
    self.associations.iter().map(|a| a.name.as_str()).collect()
  }

  /// `true` si `name` es `id`, un campo o una asociación del esquema.
  pub fn has_property(&self, name: &str) -> bool {
    name == "id" || self.field(name).is_some() || self.association(name).is_some()
  }

  pub(crate) fn require_field(&self, name: &str) -> Result<&FieldDef, DomainError> {
    self.field(name).ok_or_else(|| DomainError::UnknownField { kind: self.kind.clone(), field: name.to_string() })
  }

  pub(crate) fn require_association(&self, name: &str) -> Result<&AssociationDef, DomainError> {
    self.association(name).ok_or_else(|| DomainError::UnknownAssociation { kind: self.kind.clone(),
                                                                           association: name.to_string() })
  }
}

/// Conjunto de esquemas conocidos, indexados por tipo.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
  schemas: IndexMap<String, Arc<EntitySchema>>,
}

impl SchemaRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registra un esquema. Un tipo repetido es un error.
  pub fn register(&mut self, schema: EntitySchema) -> Result<Arc<EntitySchema>, DomainError> {
    self.register_arc(Arc::new(schema))
  }

  pub fn register_arc(&mut self, schema: Arc<EntitySchema>) -> Result<Arc<EntitySchema>, DomainError> {
    if self.schemas.contains_key(schema.kind()) {
      return Err(DomainError::ValidationError(format!("Esquema duplicado: {}", schema.kind())));
    }
    self.schemas.insert(schema.kind().to_string(), schema.clone());
    Ok(schema)
  }

  pub fn get(&self, kind: &str) -> Option<Arc<EntitySchema>> {
    self.schemas.get(kind).cloned()
  }

  pub fn schemas(&self) -> impl Iterator<Item = &Arc<EntitySchema>> {
    self.schemas.values()
  }

  /// Asociaciones (de cualquier tipo registrado) cuyo destino es `kind`.
  pub fn referencing(&self, kind: &str) -> Vec<(Arc<EntitySchema>, AssociationDef)> {
    let mut out = Vec::new();
    for schema in self.schemas.values() {
      for assoc in schema.associations().iter().filter(|a| a.target == kind) {
        out.push((schema.clone(), assoc.clone()));
      }
    }
    out
  }

  /// Comprueba que todos los destinos existen y que cada inversa apunta de
  /// vuelta a la asociación que la declara.
  pub fn check_consistency(&self) -> Result<(), DomainError> {
    for schema in self.schemas.values() {
      for searchable in schema.searchable_fields() {
        schema.require_field(searchable)?;
      }
      for assoc in schema.associations() {
        let target = self.schemas.get(&assoc.target).ok_or_else(|| {
                                                      DomainError::ValidationError(format!("{}.{} apunta a un tipo \
                                                                                            no registrado: {}",
                                                                                           schema.kind(),
                                                                                           assoc.name,
                                                                                           assoc.target))
                                                    })?;
        if let Some(inverse) = &assoc.inverse {
          let back = target.require_association(inverse)?;
          if back.target != schema.kind() || back.inverse.as_deref() != Some(assoc.name.as_str()) {
            return Err(DomainError::ValidationError(format!("La inversa {}.{} no es simétrica con {}.{}",
                                                            target.kind(),
                                                            inverse,
                                                            schema.kind(),
                                                            assoc.name)));
          }
        }
      }
    }
    Ok(())
  }
}
