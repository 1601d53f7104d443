use crate::schema::{AssociationDef, EntitySchema, FieldDef, IdStrategy, SchemaRegistry};
use crate::FieldType;
use once_cell::sync::Lazy;
use std::sync::Arc;

static BOOK: Lazy<Arc<EntitySchema>> = Lazy::new(|| {
  Arc::new(EntitySchema::new("book").with_field(FieldDef::new("title", FieldType::String).required().max_length(255))
                                    .with_field(FieldDef::new("description", FieldType::String))
                                    .with_field(FieldDef::new("releaseDate", FieldType::Timestamp))
                                    .with_association(AssociationDef::to_one("author", "author").with_inverse("books"))
                                    .searchable(["title", "description"]))
});

static AUTHOR: Lazy<Arc<EntitySchema>> = Lazy::new(|| {
  Arc::new(EntitySchema::new("author").with_field(FieldDef::new("name", FieldType::String).required().max_length(255))
                                      .with_field(FieldDef::new("description", FieldType::String))
                                      .with_association(AssociationDef::to_many("books", "book").with_inverse("author"))
                                      .searchable(["name", "description"]))
});

static USER: Lazy<Arc<EntitySchema>> = Lazy::new(|| {
  Arc::new(EntitySchema::new("user").with_field(FieldDef::new("username", FieldType::String).required()
                                                                                             .max_length(255))
                                    .with_field(FieldDef::new("email", FieldType::String).required().max_length(255))
                                    .with_field(FieldDef::new("firstname", FieldType::String).max_length(255))
                                    .with_field(FieldDef::new("surname", FieldType::String).max_length(255))
                                    .with_association(AssociationDef::to_many("userGroups", "user_group")
                                                        .with_inverse("users"))
                                    .searchable(["username", "firstname", "surname", "email"]))
});

static USER_GROUP: Lazy<Arc<EntitySchema>> = Lazy::new(|| {
  Arc::new(EntitySchema::new("user_group").with_field(FieldDef::new("name", FieldType::String).required()
                                                                                              .max_length(255))
                                          .with_field(FieldDef::new("role", FieldType::String).required()
                                                                                              .max_length(255))
                                          .with_association(AssociationDef::to_many("users", "user")
                                                              .with_inverse("userGroups"))
                                          .searchable(["name", "role"]))
});

static REQUEST_LOG: Lazy<Arc<EntitySchema>> = Lazy::new(|| {
  Arc::new(EntitySchema::new("request_log").with_id_strategy(IdStrategy::Sequence)
                                           .with_field(FieldDef::new("method", FieldType::String).required())
                                           .with_field(FieldDef::new("path", FieldType::String).required())
                                           .with_field(FieldDef::new("statusCode", FieldType::Integer))
                                           .with_field(FieldDef::new("time", FieldType::Timestamp))
                                           .with_field(FieldDef::new("headers", FieldType::Json))
                                           .with_association(AssociationDef::to_one("user", "user")))
});

/// Catálogo de esquemas de ejemplo (libros/autores y usuarios/grupos) para
/// pruebas, demos y la consola.
pub struct Catalog;

impl Catalog {
  pub fn book() -> Arc<EntitySchema> {
    BOOK.clone()
  }

  pub fn author() -> Arc<EntitySchema> {
    AUTHOR.clone()
  }

  pub fn user() -> Arc<EntitySchema> {
    USER.clone()
  }

  pub fn user_group() -> Arc<EntitySchema> {
    USER_GROUP.clone()
  }

  /// Registro de peticiones; ids por secuencia y asociación unidireccional
  /// a `user`.
  pub fn request_log() -> Arc<EntitySchema> {
    REQUEST_LOG.clone()
  }

  /// Registro con todos los esquemas del catálogo.
  pub fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    for schema in [Self::book(), Self::author(), Self::user(), Self::user_group(), Self::request_log()] {
      registry.register_arc(schema).expect("los tipos del catálogo son únicos");
    }
    registry
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn catalog_registry_is_consistent() {
    let registry = Catalog::registry();
    assert_eq!(registry.schemas().count(), 5);
    registry.check_consistency().expect("catalog must be consistent");
  }

  #[test]
  fn catalog_kinds_cannot_be_registered_twice() {
    let mut registry = Catalog::registry();
    assert!(registry.register_arc(Catalog::book()).is_err());
    assert_eq!(registry.schemas().count(), 5);
  }

  #[test]
  fn request_log_is_referenced_from_nowhere_but_references_user() {
    let registry = Catalog::registry();
    let refs = registry.referencing("user");
    let kinds: Vec<&str> = refs.iter().map(|(s, _)| s.kind()).collect();
    assert!(kinds.contains(&"request_log"));
    assert!(kinds.contains(&"user_group"));
    assert!(registry.referencing("request_log").is_empty());
  }
}
