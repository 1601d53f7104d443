//! Modelo de entidades genérico: identificadores, valores de campo,
//! esquemas explícitos, asociaciones con simetría de inversas y validación.
mod catalog;
pub mod conformance;
mod entity;
mod errors;
mod identifier;
pub mod schema;
mod validation;
mod value;

pub use catalog::Catalog;
pub use entity::{Association, Entity, EntityState};
pub use errors::DomainError;
pub use identifier::{EntityId, EntityRef};
pub use schema::{AssociationDef, Cardinality, EntitySchema, FieldDef, IdStrategy, SchemaRegistry};
pub use validation::{FnValidator, SchemaValidator, Validator, ValidatorChain, Violation};
pub use value::{FieldType, FieldValue};
