use entity_domain::{Catalog, EntityId, EntityState, SchemaValidator};
use resource::{Criteria, FindOneByParams, FindParams, InMemoryStore, OrderBy, Payload, PersistenceStore, ResourceError,
               ResourceService, UpdateInput};
use serde_json::json;
use std::sync::Arc;

fn service(kind: &str) -> ResourceService<InMemoryStore> {
  let store = Arc::new(InMemoryStore::new());
  ResourceService::new(store, Arc::new(Catalog::registry()), kind, Arc::new(SchemaValidator)).unwrap()
}

fn service_on(store: &Arc<InMemoryStore>, kind: &str) -> ResourceService<InMemoryStore> {
  ResourceService::new(store.clone(), Arc::new(Catalog::registry()), kind, Arc::new(SchemaValidator)).unwrap()
}

#[test]
fn create_update_delete_scenario() -> Result<(), ResourceError> {
  let authors = service("author");

  let created = authors.create(Payload::new().with("name", "A"))?;
  let id = *created.id();
  assert_eq!(created.state(), EntityState::Persisted);
  assert_eq!(authors.find_one(id)?, Some(created.clone()));

  let updated = authors.update(id, Payload::new().with("name", "B"))?;
  assert_eq!(updated.get_str("name"), Some("B"));
  assert_eq!(updated.version(), created.version() + 1);
  assert_eq!(authors.find_one(id)?, Some(updated.clone()));

  let removed = authors.delete(id)?;
  assert_eq!(removed.state(), EntityState::Removed);
  assert_eq!(removed.get_str("name"), Some("B"));
  assert_eq!(authors.find_one(id)?, None);
  assert!(matches!(authors.delete(id), Err(ResourceError::NotFound(_))));
  Ok(())
}

#[test]
fn partial_update_keeps_absent_fields() -> Result<(), ResourceError> {
  let books = service("book");
  let created = books.create(Payload::new().with("title", "Dune").with("description", "arena"))?;
  let updated = books.update(*created.id(), Payload::new().with("description", "especia"))?;
  assert_eq!(updated.get_str("title"), Some("Dune"));
  assert_eq!(updated.get_str("description"), Some("especia"));
  assert_eq!(books.find_one(*created.id())?, Some(updated));
  Ok(())
}

#[test]
fn update_of_missing_entity_is_not_found() {
  let books = service("book");
  let err = books.update(EntityId::new_uuid(), Payload::new().with("title", "x")).unwrap_err();
  assert!(matches!(err, ResourceError::NotFound(_)));
}

#[test]
fn invalid_create_leaves_store_untouched() {
  let store = Arc::new(InMemoryStore::new());
  let books = service_on(&store, "book");

  let err = books.create(Payload::new().with("description", "sin título")).unwrap_err();
  assert!(!err.violations().is_empty());
  assert_eq!(err.violations()[0].property_path, "title");

  let err = books.create(Payload::new().with("title", "x".repeat(256))).unwrap_err();
  assert!(matches!(err, ResourceError::ValidationFailed(_)));

  let err = books.create(Payload::new().with("title", "ok").with("author", EntityId::new_uuid().to_json()))
                 .unwrap_err();
  assert_eq!(err.violations().len(), 1);
  assert_eq!(store.count("book").unwrap(), 0);
}

#[test]
fn invalid_update_keeps_previous_state() -> Result<(), ResourceError> {
  let books = service("book");
  let created = books.create(Payload::new().with("title", "Dune"))?;
  let err = books.update(*created.id(), Payload::new().with("title", "").with("description", "x"))
                 .unwrap_err();
  assert!(matches!(err, ResourceError::ValidationFailed(_)));
  assert_eq!(books.find_one(*created.id())?, Some(created));
  Ok(())
}

#[test]
fn find_paginates_in_insertion_order() -> Result<(), ResourceError> {
  let authors = service("author");
  let mut ids = Vec::new();
  for name in ["a", "b", "c", "d", "e"] {
    ids.push(*authors.create(Payload::new().with("name", name))?.id());
  }

  let first: Vec<EntityId> = authors.find(FindParams::new().limit(2).offset(0))?.iter().map(|e| *e.id()).collect();
  let second: Vec<EntityId> = authors.find(FindParams::new().limit(2).offset(2))?.iter().map(|e| *e.id()).collect();
  assert_eq!(first, ids[0..2].to_vec());
  assert_eq!(second, ids[2..4].to_vec());
  assert!(authors.find(FindParams::new().offset(10))?.is_empty());
  Ok(())
}

#[test]
fn find_filters_orders_and_rejects_unknown_properties() -> Result<(), ResourceError> {
  let authors = service("author");
  for name in ["Zoe", "Ana", "Luis"] {
    authors.create(Payload::new().with("name", name))?;
  }

  let sorted = authors.find(FindParams::new().order_by(OrderBy::new().asc("name")))?;
  let names: Vec<&str> = sorted.iter().filter_map(|e| e.get_str("name")).collect();
  assert_eq!(names, vec!["Ana", "Luis", "Zoe"]);

  let only = authors.find(FindParams::new().criteria(Criteria::new().one_of("name", ["Ana", "Zoe"])))?;
  assert_eq!(only.len(), 2);

  let first = authors.find_one_by(FindOneByParams::new(Criteria::new()).order_by(OrderBy::new().desc("name")))?;
  assert_eq!(first.and_then(|e| e.get_str("name").map(str::to_string)), Some("Zoe".to_string()));
  assert_eq!(authors.find_one_by(FindOneByParams::new(Criteria::new().eq("name", "Nadie")))?, None);

  let err = authors.find(FindParams::new().criteria(Criteria::new().eq("age", 3))).unwrap_err();
  assert!(matches!(err, ResourceError::InvalidQuery(_)));
  Ok(())
}

#[test]
fn search_matches_any_term_in_searchable_fields() -> Result<(), ResourceError> {
  let books = service("book");
  books.create(Payload::new().with("title", "Rust en acción"))?;
  books.create(Payload::new().with("title", "Otro").with("description", "Programación de SISTEMAS"))?;
  books.create(Payload::new().with("title", "Cocina"))?;

  assert_eq!(books.find(FindParams::new().search(["rust", "sistemas"]))?.len(), 2);
  assert_eq!(books.find(FindParams::new().search(["  "]))?.len(), 3);
  let narrowed = books.find(FindParams::new().search(["rust", "sistemas"])
                                             .criteria(Criteria::new().eq("title", "Otro")))?;
  assert_eq!(narrowed.len(), 1);
  Ok(())
}

#[test]
fn search_on_kind_without_searchable_fields_matches_nothing() -> Result<(), ResourceError> {
  let logs = service("request_log");
  logs.create(Payload::new().with("method", "GET").with("path", "/books"))?;
  assert!(logs.find(FindParams::new().search(["GET"]))?.is_empty());
  assert_eq!(logs.find(FindParams::new())?.len(), 1);
  Ok(())
}

#[test]
fn sequence_ids_are_allocated_by_the_store() -> Result<(), ResourceError> {
  let logs = service("request_log");
  let first = logs.create(Payload::new().with("method", "GET")
                                        .with("path", "/")
                                        .with("statusCode", 200)
                                        .with("headers", json!({"accept": "application/json"})))?;
  let second = logs.create(Payload::new().with("method", "POST").with("path", "/books"))?;
  assert_eq!(*first.id(), EntityId::Int(1));
  assert_eq!(*second.id(), EntityId::Int(2));
  Ok(())
}

#[test]
fn expected_version_mismatch_is_a_conflict() -> Result<(), ResourceError> {
  let authors = service("author");
  let created = authors.create(Payload::new().with("name", "A"))?;
  let input = UpdateInput::new(*created.id(), Payload::new().with("name", "B")).expecting(created.version() + 5);
  assert!(matches!(authors.update_versioned(input), Err(ResourceError::Conflict(_))));

  let input = UpdateInput::new(*created.id(), Payload::new().with("name", "B")).expecting(created.version());
  assert_eq!(authors.update_versioned(input)?.get_str("name"), Some("B"));
  Ok(())
}

#[test]
fn saving_a_stale_copy_is_a_conflict() -> Result<(), ResourceError> {
  let authors = service("author");
  let mut draft = authors.new_entity()?;
  draft.set("name", "A")?;
  let saved = authors.save(draft, false)?;

  let mut first = saved.clone();
  first.set("name", "B")?;
  authors.save(first, false)?;

  let mut stale = saved;
  stale.set("name", "C")?;
  assert!(matches!(authors.save(stale, false), Err(ResourceError::Conflict(_))));
  Ok(())
}

#[test]
fn save_can_skip_validation() -> Result<(), ResourceError> {
  let authors = service("author");
  let draft = authors.new_entity()?;
  assert!(matches!(authors.save(draft.clone(), false), Err(ResourceError::ValidationFailed(_))));
  let saved = authors.save(draft, true)?;
  assert!(saved.is_persisted());
  Ok(())
}

#[test]
fn get_reference_loads_lazily() -> Result<(), ResourceError> {
  let authors = service("author");
  let created = authors.create(Payload::new().with("name", "A"))?;

  let lazy = authors.get_reference(*created.id())?;
  assert!(!lazy.is_loaded());
  assert_eq!(lazy.reference(), &created.reference());
  assert_eq!(lazy.load()?, Some(&created));
  assert!(lazy.is_loaded());

  let missing = authors.get_reference(EntityId::new_uuid())?;
  assert_eq!(missing.load()?, None);
  Ok(())
}

#[test]
fn associations_lists_schema_associations() {
  assert_eq!(service("user").associations(), vec!["userGroups".to_string()]);
  assert_eq!(service("book").store().get_reference("book", EntityId::Int(3)).id, EntityId::Int(3));
}
