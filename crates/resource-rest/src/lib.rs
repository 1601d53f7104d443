//! Crate `resource-rest` — adaptador REST para `ResourceService`
//!
//! Traduce peticiones independientes del transporte (`RestRequest`) a
//! llamadas al servicio y sus resultados a `RestResponse` con código HTTP y
//! cuerpo JSON o XML. Antes de cada acción evalúa una `AccessPolicy`; la
//! incluida (`RoleHierarchyPolicy`) exige `ROLE_USER` para leer y
//! `ROLE_ADMIN` para escribir.
pub mod controller;
pub mod errors;
pub mod policy;
pub mod request;
pub mod response;

pub use controller::RestController;
pub use errors::RestError;
pub use policy::{AccessPolicy, Principal, RoleHierarchyPolicy, ROLE_ADMIN, ROLE_USER};
pub use request::{Action, Format, RestRequest};
pub use response::{etag, to_xml, ErrorResponse, RestResponse, ViolationBody};
