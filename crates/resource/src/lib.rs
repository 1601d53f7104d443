//! Crate `resource` — servicio CRUD genérico con hooks de ciclo de vida
//!
//! Este crate define el contrato de persistencia (`PersistenceStore` y
//! `StoreTransaction`), una implementación en memoria útil para pruebas y
//! demos (`InMemoryStore`) y el orquestador `ResourceService`, que envuelve
//! un store, valida y ejecuta los hooks alrededor de cada operación.
//!
//! Diseño resumido:
//! - Hooks por valor: cada `before_*` recibe la entrada y devuelve la
//!   revisada; cada `after_*` ve la entrada usada y el resultado.
//! - Transacciones: toda operación que escribe usa exactamente una; los
//!   hooks posteriores escriben en la misma.
//! - Locking optimista: cada entidad lleva una versión y el store rechaza
//!   escrituras obsoletas con `ResourceError::Conflict`.
//!
//! Ejemplo rápido:
//! ```rust
//! use entity_domain::{Catalog, SchemaValidator};
//! use resource::{InMemoryStore, Payload, ResourceService};
//! use std::sync::Arc;
//! let store = Arc::new(InMemoryStore::new());
//! let registry = Arc::new(Catalog::registry());
//! let authors = ResourceService::new(store, registry, "author", Arc::new(SchemaValidator)).unwrap();
//! let created = authors.create(Payload::new().with("name", "Ursula")).unwrap();
//! assert_eq!(created.get_str("name"), Some("Ursula"));
//! ```
pub mod errors;
pub mod hooks;
pub mod integrity;
pub mod payload;
pub mod query;
pub mod reference;
pub mod repository;
pub mod service;
pub mod stubs;

pub use errors::*;
pub use hooks::*;
pub use payload::*;
pub use query::*;
pub use reference::*;
pub use repository::*;
pub use service::*;
pub use stubs::*;
