// Archivo: repository.rs
// Propósito: definir el contrato del store de persistencia (`PersistenceStore`)
// y de sus transacciones (`StoreTransaction`). Cualquier backend (memoria,
// SQL, etc.) debe implementar estos traits para usarse con el servicio.
use crate::errors::Result;
use crate::query::StoreQuery;
use entity_domain::{Entity, EntityId, EntityRef};

/// Contrato del store de entidades.
///
/// Las lecturas fuera de transacción ven sólo datos confirmados. Toda
/// escritura pasa por una `StoreTransaction`, que se confirma de forma
/// atómica o se descarta entera.
pub trait PersistenceStore: Send + Sync {
    /// Carga una entidad confirmada por tipo e id.
    fn get_by_id(&self, kind: &str, id: &EntityId) -> Result<Option<Entity>>;

    /// Devuelve las entidades de `kind` que cumplen la consulta, ya
    /// ordenadas y paginadas.
    fn get_by_criteria(&self, kind: &str, query: &StoreQuery) -> Result<Vec<Entity>>;

    /// Referencia sin cargar. No hace E/S ni comprueba existencia.
    fn get_reference(&self, kind: &str, id: EntityId) -> EntityRef {
        EntityRef::new(kind, id)
    }

    /// Siguiente valor de la secuencia de `kind` (para ids enteros).
    fn next_sequence(&self, kind: &str) -> Result<i64>;

    /// Abre una transacción. Soltarla sin `commit` equivale a rollback.
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>>;
}

/// Unidad de trabajo sobre el store.
pub trait StoreTransaction {
    /// Lectura que ve las escrituras pendientes de esta misma transacción.
    fn get_by_id(&mut self, kind: &str, id: &EntityId) -> Result<Option<Entity>>;

    /// Programa la escritura de la entidad. Devuelve la entidad tal como
    /// quedará almacenada (estado persistido y versión incrementada).
    ///
    /// Una entidad transitoria que ya existe, o una persistida cuya versión
    /// no coincide con la almacenada, produce `ResourceError::Conflict`.
    fn write(&mut self, entity: Entity) -> Result<Entity>;

    /// Programa el borrado de la entidad.
    fn remove(&mut self, entity: &Entity) -> Result<()>;

    /// Confirma todos los cambios de forma atómica.
    ///
    /// Falla con `ResourceError::Conflict`, sin aplicar nada, si otra
    /// transacción cambió alguna fila leída o escrita por ésta, o si el
    /// resultado dejaría una asociación apuntando a una entidad borrada.
    fn commit(self: Box<Self>) -> Result<()>;
}
