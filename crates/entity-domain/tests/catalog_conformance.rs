use entity_domain::conformance::check_entity;
use entity_domain::{AssociationDef, Catalog, EntitySchema, FieldDef, FieldType, SchemaRegistry};
use std::sync::Arc;

#[test]
fn every_catalog_schema_passes_accessor_conformance() {
  let registry = Catalog::registry();
  for schema in registry.schemas() {
    let failures = check_entity(schema, &registry);
    assert!(failures.is_empty(), "{}: {:?}", schema.kind(), failures);
  }
}

#[test]
fn conformance_reports_missing_target() {
  let schema = Arc::new(EntitySchema::new("orphan").with_field(FieldDef::new("name", FieldType::String))
                                                   .with_association(AssociationDef::to_one("ghost", "ghost")));
  let mut registry = SchemaRegistry::new();
  registry.register_arc(schema.clone()).unwrap();
  let failures = check_entity(&schema, &registry);
  assert_eq!(failures.len(), 1);
  assert!(failures[0].contains("ghost"));
}
