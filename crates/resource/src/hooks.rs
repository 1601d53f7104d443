// Archivo: hooks.rs
// Propósito: puntos de extensión alrededor de cada operación del servicio.
//
// Cada operación `op` tiene un `before_op`, que recibe la entrada por valor
// y devuelve la entrada revisada (o un error que la corta), y un `after_op`,
// que recibe la entrada usada y el resultado. En las operaciones que
// escriben, el `after_op` recibe la transacción abierta: sus escrituras se
// confirman junto a la principal y un error deshace todo.
use crate::errors::Result;
use crate::payload::Payload;
use crate::query::{FindOneByParams, FindParams};
use crate::repository::StoreTransaction;
use entity_domain::{Entity, EntityId, EntityRef};

/// Entrada de `update`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInput {
    pub id: EntityId,
    pub payload: Payload,
    /// Versión que el cliente cree actual (p.ej. de un `If-Match`).
    pub expected_version: Option<u64>,
}

impl UpdateInput {
    pub fn new(id: EntityId, payload: Payload) -> Self {
        Self { id, payload, expected_version: None }
    }

    pub fn expecting(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Hooks de ciclo de vida. Todas las implementaciones por defecto son
/// no-ops que devuelven la entrada tal cual.
#[allow(unused_variables)]
pub trait ResourceHooks: Send + Sync {
    fn before_find(&self, params: FindParams) -> Result<FindParams> {
        Ok(params)
    }

    fn after_find(&self, params: &FindParams, found: &[Entity]) -> Result<()> {
        Ok(())
    }

    fn before_find_one(&self, id: EntityId) -> Result<EntityId> {
        Ok(id)
    }

    fn after_find_one(&self, id: &EntityId, found: Option<&Entity>) -> Result<()> {
        Ok(())
    }

    fn before_find_one_by(&self, params: FindOneByParams) -> Result<FindOneByParams> {
        Ok(params)
    }

    fn after_find_one_by(&self, params: &FindOneByParams, found: Option<&Entity>) -> Result<()> {
        Ok(())
    }

    fn before_create(&self, payload: Payload) -> Result<Payload> {
        Ok(payload)
    }

    fn after_create(&self, tx: &mut dyn StoreTransaction, payload: &Payload, created: &Entity) -> Result<()> {
        Ok(())
    }

    fn before_save(&self, entity: Entity) -> Result<Entity> {
        Ok(entity)
    }

    fn after_save(&self, tx: &mut dyn StoreTransaction, saved: &Entity) -> Result<()> {
        Ok(())
    }

    fn before_update(&self, input: UpdateInput) -> Result<UpdateInput> {
        Ok(input)
    }

    fn after_update(&self, tx: &mut dyn StoreTransaction, input: &UpdateInput, updated: &Entity) -> Result<()> {
        Ok(())
    }

    fn before_delete(&self, id: EntityId) -> Result<EntityId> {
        Ok(id)
    }

    fn after_delete(&self, tx: &mut dyn StoreTransaction, id: &EntityId, removed: &Entity) -> Result<()> {
        Ok(())
    }

    fn before_get_reference(&self, id: EntityId) -> Result<EntityId> {
        Ok(id)
    }

    fn after_get_reference(&self, reference: &EntityRef) -> Result<()> {
        Ok(())
    }
}

/// Hooks vacíos.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ResourceHooks for NoHooks {}
