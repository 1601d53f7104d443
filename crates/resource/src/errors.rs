// Archivo: errors.rs
// Propósito: definir los errores del servicio de recursos y el alias
// Result<T> usado por las APIs del crate.
use entity_domain::{DomainError, Violation};
use thiserror::Error;

/// Errores del servicio de recursos.
///
/// - `NotFound`: el identificador no corresponde a ninguna entidad viva.
/// - `ValidationFailed`: la entidad candidata incumple una o más reglas.
/// - `Conflict`: modificación concurrente detectada por el store.
/// - `Persistence`: fallo de E/S del store.
/// - `Rejected`: un hook abortó la operación.
/// - `InvalidQuery`: criterios u orden sobre propiedades inexistentes.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// Entidad no encontrada.
    #[error("No encontrado: {0}")]
    NotFound(String),
    /// Violaciones de validación (nunca vacío).
    #[error("Validación fallida: {}", join_violations(.0))]
    ValidationFailed(Vec<Violation>),
    /// Conflicto optimista (versión distinta a la esperada).
    #[error("Conflicto: {0}")]
    Conflict(String),
    /// Error genérico de almacenamiento.
    #[error("Error de almacenamiento: {0}")]
    Persistence(String),
    /// Error de dominio lanzado por un hook.
    #[error("Operación rechazada: {0}")]
    Rejected(String),
    #[error("Consulta inválida: {0}")]
    InvalidQuery(String),
    #[error("Error de dominio: {0}")]
    Domain(#[from] DomainError),
}

impl ResourceError {
    /// Violaciones asociadas; vacío para cualquier otra variante.
    pub fn violations(&self) -> &[Violation] {
        match self {
            ResourceError::ValidationFailed(v) => v,
            _ => &[],
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; ")
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, ResourceError>;
