// Archivo: controller.rs
// Propósito: controlador REST genérico. Comprueba la política de acceso,
// decodifica la petición, llama al servicio y presenta el resultado.
use crate::errors::RestError;
use crate::policy::{AccessPolicy, Principal};
use crate::request::{Action, RestRequest};
use crate::response::{etag, RestResponse};
use http::StatusCode;
use resource::{PersistenceStore, ResourceError, ResourceHooks, ResourceService, UpdateInput};
use std::sync::Arc;

pub struct RestController<S, H>
    where S: PersistenceStore,
          H: ResourceHooks
{
    service: Arc<ResourceService<S, H>>,
    policy: Arc<dyn AccessPolicy>,
}

impl<S, H> RestController<S, H>
    where S: PersistenceStore,
          H: ResourceHooks
{
    pub fn new(service: Arc<ResourceService<S, H>>, policy: Arc<dyn AccessPolicy>) -> Self {
        Self { service, policy }
    }

    pub fn service(&self) -> &Arc<ResourceService<S, H>> {
        &self.service
    }

    /// Atiende una petición. Los errores se devuelven como respuesta con su
    /// código HTTP, nunca como `Err`.
    pub fn handle(&self, principal: &Principal, request: &RestRequest) -> RestResponse {
        let kind = self.service.kind();
        log::debug!("{:?} {} ({:?})", request.action, kind, request.id);
        match self.dispatch(principal, request) {
            Ok(response) => response,
            Err(err) => {
                if err.status().is_server_error() {
                    log::error!("{:?} {}: {}", request.action, kind, err);
                } else {
                    log::debug!("{:?} {}: {}", request.action, kind, err);
                }
                RestResponse::error(&err, request.format)
            }
        }
    }

    fn dispatch(&self, principal: &Principal, request: &RestRequest) -> Result<RestResponse, RestError> {
        self.policy.check(principal, request.action, self.service.kind())?;
        let format = request.format;
        match request.action {
            Action::Find => {
                let params = request.find_params(self.service.schema())?;
                let found = self.service.find(params)?;
                Ok(RestResponse::list(&found, format))
            }
            Action::FindOne => {
                let id = request.entity_id()?;
                let found = self.service
                                .find_one(id)?
                                .ok_or_else(|| ResourceError::NotFound(format!("{}#{}", self.service.kind(), id)))?;
                Ok(RestResponse::entity(StatusCode::OK, &found, format))
            }
            Action::Create => {
                let created = self.service.create(request.payload()?)?;
                Ok(RestResponse::entity(StatusCode::CREATED, &created, format))
            }
            Action::Update => {
                let id = request.entity_id()?;
                let mut input = UpdateInput::new(id, request.payload()?);
                if let Some(expected) = &request.if_match {
                    input.expected_version = Some(self.version_for_etag(id, expected)?);
                }
                let updated = self.service.update_versioned(input)?;
                Ok(RestResponse::entity(StatusCode::OK, &updated, format))
            }
            Action::Delete => {
                let removed = self.service.delete(request.entity_id()?)?;
                Ok(RestResponse::entity(StatusCode::OK, &removed, format))
            }
        }
    }

    /// Traduce un `If-Match` a la versión esperada: la etiqueta debe ser la
    /// de la entidad actual. Se lee directamente del store para no disparar
    /// los hooks de lectura.
    fn version_for_etag(&self, id: entity_domain::EntityId, expected: &str) -> Result<u64, RestError> {
        let current = self.service
                          .store()
                          .get_by_id(self.service.kind(), &id)?
                          .ok_or_else(|| ResourceError::NotFound(format!("{}#{}", self.service.kind(), id)))?;
        if expected.trim() != "*" && expected.trim() != etag(&current) {
            return Err(ResourceError::Conflict(format!("{} cambió desde {}", current.reference(), expected)).into());
        }
        Ok(current.version())
    }
}
