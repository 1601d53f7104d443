use entity_domain::{Catalog, SchemaValidator};
use http::StatusCode;
use resource::{InMemoryStore, NoHooks, ResourceError, ResourceHooks, ResourceService};
use resource_rest::{Principal, RestController, RestRequest, RoleHierarchyPolicy, ROLE_ADMIN, ROLE_USER};
use serde_json::json;
use std::sync::Arc;

fn controller(kind: &str) -> RestController<InMemoryStore, NoHooks> {
  let store = Arc::new(InMemoryStore::new());
  let service = ResourceService::new(store, Arc::new(Catalog::registry()), kind, Arc::new(SchemaValidator)).unwrap();
  RestController::new(Arc::new(service), Arc::new(RoleHierarchyPolicy::default()))
}

fn admin() -> Principal {
  Principal::user("root", [ROLE_ADMIN])
}

#[test]
fn crud_round_trip_over_rest() {
  let books = controller("book");

  let created = books.handle(&admin(), &RestRequest::create(r#"{"title": "Dune"}"#));
  assert_eq!(created.status, StatusCode::CREATED);
  let id = created.json()["id"].as_str().unwrap().to_string();

  let found = books.handle(&admin(), &RestRequest::find_one(id.as_str()));
  assert_eq!(found.status, StatusCode::OK);
  assert_eq!(found.json()["title"], "Dune");

  let updated = books.handle(&admin(), &RestRequest::update(id.as_str(), r#"{"description": "arena"}"#));
  assert_eq!(updated.status, StatusCode::OK);
  assert_eq!(updated.json()["title"], "Dune");
  assert_eq!(updated.json()["description"], "arena");

  let deleted = books.handle(&admin(), &RestRequest::delete(id.as_str()));
  assert_eq!(deleted.status, StatusCode::OK);
  assert_eq!(books.handle(&admin(), &RestRequest::find_one(id.as_str())).status, StatusCode::NOT_FOUND);
  assert_eq!(books.handle(&admin(), &RestRequest::delete(id.as_str())).status, StatusCode::NOT_FOUND);
}

#[test]
fn roles_gate_each_action() {
  let books = controller("book");
  let reader = Principal::user("ana", [ROLE_USER]);

  assert_eq!(books.handle(&Principal::anonymous(), &RestRequest::find()).status, StatusCode::UNAUTHORIZED);
  assert_eq!(books.handle(&reader, &RestRequest::find()).status, StatusCode::OK);
  let denied = books.handle(&reader, &RestRequest::create(r#"{"title": "x"}"#));
  assert_eq!(denied.status, StatusCode::FORBIDDEN);
  assert_eq!(denied.json()["code"], "forbidden");
  assert_eq!(books.service().store().count("book").unwrap(), 0);
}

#[test]
fn bad_requests_map_to_client_errors() {
  let books = controller("book");
  assert_eq!(books.handle(&admin(), &RestRequest::find_one("not-an-id")).status, StatusCode::BAD_REQUEST);
  assert_eq!(books.handle(&admin(), &RestRequest::create("{")).status, StatusCode::BAD_REQUEST);
  let unknown = RestRequest::find().with_query("where", r#"{"pages": 3}"#);
  assert_eq!(books.handle(&admin(), &unknown).status, StatusCode::BAD_REQUEST);

  let invalid = books.handle(&admin(), &RestRequest::create(r#"{"description": "sin título"}"#));
  assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(invalid.json()["violations"][0]["propertyPath"], "title");
}

#[test]
fn find_decodes_query_parameters() {
  let authors = controller("author");
  for name in ["c", "a", "b", "d"] {
    let body = json!({ "name": name }).to_string();
    assert_eq!(authors.handle(&admin(), &RestRequest::create(body)).status, StatusCode::CREATED);
  }
  let request = RestRequest::find().with_query("order", r#"{"name": "DESC"}"#)
                                   .with_query("limit", "2")
                                   .with_query("offset", "1");
  let names: Vec<String> = authors.handle(&admin(), &request)
                                  .json()
                                  .as_array()
                                  .unwrap()
                                  .iter()
                                  .map(|a| a["name"].as_str().unwrap().to_string())
                                  .collect();
  assert_eq!(names, vec!["c", "b"]);

  let filtered = RestRequest::find().with_query("where", r#"{"name": ["a", "d"]}"#);
  assert_eq!(authors.handle(&admin(), &filtered).json().as_array().unwrap().len(), 2);
}

#[test]
fn if_match_guards_updates() {
  let authors = controller("author");
  let created = authors.handle(&admin(), &RestRequest::create(r#"{"name": "A"}"#));
  let id = created.json()["id"].as_str().unwrap().to_string();
  let tag = created.header("ETag").unwrap().to_string();

  let first = authors.handle(&admin(), &RestRequest::update(id.as_str(), r#"{"name": "B"}"#).if_match(tag.as_str()));
  assert_eq!(first.status, StatusCode::OK);
  assert_eq!(first.header("X-Entity-Version"), Some("2"));

  let stale = authors.handle(&admin(), &RestRequest::update(id.as_str(), r#"{"name": "C"}"#).if_match(tag.as_str()));
  assert_eq!(stale.status, StatusCode::CONFLICT);
  assert_eq!(stale.json()["code"], "conflict");
}

/// Bloquea toda lectura individual.
struct NoSingleReads;

impl ResourceHooks for NoSingleReads {
  fn before_find_one(&self, _id: entity_domain::EntityId) -> resource::Result<entity_domain::EntityId> {
    Err(ResourceError::Rejected("lectura individual deshabilitada".into()))
  }
}

#[test]
fn if_match_does_not_go_through_read_hooks() {
  let store = Arc::new(InMemoryStore::new());
  let service = ResourceService::new(store, Arc::new(Catalog::registry()), "author", Arc::new(SchemaValidator)).unwrap();
  let authors = RestController::new(Arc::new(service.with_hooks(NoSingleReads)),
                                    Arc::new(RoleHierarchyPolicy::default()));
  let created = authors.handle(&admin(), &RestRequest::create(r#"{"name": "A"}"#));
  let id = created.json()["id"].as_str().unwrap().to_string();
  let tag = created.header("ETag").unwrap().to_string();

  assert_eq!(authors.handle(&admin(), &RestRequest::find_one(id.as_str())).status,
             StatusCode::UNPROCESSABLE_ENTITY);
  let updated = authors.handle(&admin(), &RestRequest::update(id.as_str(), r#"{"name": "B"}"#).if_match(tag.as_str()));
  assert_eq!(updated.status, StatusCode::OK);
  assert_eq!(updated.header("X-Entity-Version"), Some("2"));
}

#[test]
fn xml_is_negotiated_by_accept() {
  let authors = controller("author");
  let created = authors.handle(&admin(), &RestRequest::create(r#"{"name": "Ana"}"#).accept("application/xml"));
  assert_eq!(created.content_type, "application/xml");
  assert!(created.body.contains("<name><![CDATA[Ana]]></name>"));
}
