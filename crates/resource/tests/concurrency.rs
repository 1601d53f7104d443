use entity_domain::{Catalog, SchemaValidator};
use resource::{FindParams, InMemoryStore, Payload, PersistenceStore, ResourceError, ResourceService};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

fn service_on(store: &Arc<InMemoryStore>, kind: &str) -> ResourceService<InMemoryStore> {
  ResourceService::new(store.clone(), Arc::new(Catalog::registry()), kind, Arc::new(SchemaValidator)).unwrap()
}

#[test]
fn concurrent_updates_are_applied_or_rejected_never_lost() {
  let store = Arc::new(InMemoryStore::new());
  let authors = service_on(&store, "author");
  let created = authors.create(Payload::new().with("name", "Ana")).unwrap();
  let id = *created.id();
  let succeeded = AtomicU64::new(0);

  thread::scope(|s| {
    for worker in 0..8 {
      let authors = &authors;
      let succeeded = &succeeded;
      s.spawn(move || {
        for i in 0..300 {
          match authors.update(id, Payload::new().with("name", format!("w{}-{}", worker, i))) {
            Ok(_) => {
              succeeded.fetch_add(1, Ordering::SeqCst);
            }
            Err(ResourceError::Conflict(_)) => {}
            Err(e) => panic!("error inesperado: {}", e),
          }
        }
      });
    }
  });

  let stored = authors.find_one(id).unwrap().unwrap();
  assert_eq!(stored.version(), created.version() + succeeded.load(Ordering::SeqCst));
}

#[test]
fn racing_delete_never_leaves_a_dangling_reference() {
  let store = Arc::new(InMemoryStore::new());
  let users = service_on(&store, "user");
  let logs = service_on(&store, "request_log");

  for i in 0..200 {
    let user = users.create(Payload::new().with("username", format!("u{}", i))
                                          .with("email", format!("u{}@example.com", i)))
                    .unwrap();
    let id = *user.id();
    thread::scope(|s| {
      let users = &users;
      let logs = &logs;
      s.spawn(move || match users.delete(id) {
        Ok(_) | Err(ResourceError::Conflict(_)) => {}
        Err(e) => panic!("error inesperado: {}", e),
      });
      s.spawn(move || {
        let payload = Payload::new().with("method", "GET").with("path", "/").with("user", id.to_json());
        match logs.create(payload) {
          Ok(_) | Err(ResourceError::Conflict(_)) | Err(ResourceError::ValidationFailed(_)) => {}
          Err(e) => panic!("error inesperado: {}", e),
        }
      });
    });
  }

  for log in logs.find(FindParams::new()).unwrap() {
    if let Some(target) = log.get_one("user").unwrap() {
      assert!(store.get_by_id(&target.kind, &target.id).unwrap().is_some(), "{} apunta a {}", log.reference(), target);
    }
  }
}
