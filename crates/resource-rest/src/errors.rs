// Archivo: errors.rs
// Propósito: errores del adaptador REST y su traducción a códigos HTTP.
use entity_domain::DomainError;
use http::StatusCode;
use resource::ResourceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestError {
    /// Petición mal formada (id, JSON o parámetros de consulta).
    #[error("Petición inválida: {0}")]
    Malformed(String),
    #[error("Autenticación requerida")]
    Unauthenticated,
    /// El principal no tiene el rol que exige la acción.
    #[error("Acceso denegado: se requiere {0}")]
    Forbidden(String),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

impl From<DomainError> for RestError {
    fn from(e: DomainError) -> Self {
        Self::Malformed(e.to_string())
    }
}

impl From<serde_json::Error> for RestError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

impl RestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::Malformed(_) => StatusCode::BAD_REQUEST,
            RestError::Unauthenticated => StatusCode::UNAUTHORIZED,
            RestError::Forbidden(_) => StatusCode::FORBIDDEN,
            RestError::Resource(err) => match err {
                ResourceError::NotFound(_) => StatusCode::NOT_FOUND,
                ResourceError::ValidationFailed(_) | ResourceError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ResourceError::Conflict(_) => StatusCode::CONFLICT,
                ResourceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ResourceError::InvalidQuery(_) | ResourceError::Domain(_) => StatusCode::BAD_REQUEST,
            },
        }
    }

    /// Código estable para clientes (`ErrorResponse.code`).
    pub fn code(&self) -> &'static str {
        match self {
            RestError::Malformed(_) => "malformed_request",
            RestError::Unauthenticated => "unauthenticated",
            RestError::Forbidden(_) => "forbidden",
            RestError::Resource(err) => match err {
                ResourceError::NotFound(_) => "not_found",
                ResourceError::ValidationFailed(_) => "validation_failed",
                ResourceError::Rejected(_) => "rejected",
                ResourceError::Conflict(_) => "conflict",
                ResourceError::Persistence(_) => "persistence_error",
                ResourceError::InvalidQuery(_) => "invalid_query",
                ResourceError::Domain(_) => "domain_error",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_errors_map_to_http_status() {
        let cases = [(ResourceError::NotFound("x".into()), StatusCode::NOT_FOUND),
                     (ResourceError::ValidationFailed(vec![]), StatusCode::UNPROCESSABLE_ENTITY),
                     (ResourceError::Conflict("x".into()), StatusCode::CONFLICT),
                     (ResourceError::Persistence("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
                     (ResourceError::InvalidQuery("x".into()), StatusCode::BAD_REQUEST)];
        for (err, status) in cases {
            assert_eq!(RestError::from(err).status(), status);
        }
        assert_eq!(RestError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(RestError::Forbidden("ROLE_ADMIN".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(RestError::from(DomainError::InvalidIdentifier("?".into())).code(), "malformed_request");
    }
}
