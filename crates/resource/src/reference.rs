// Archivo: reference.rs
// Propósito: referencia perezosa devuelta por `get_reference`. No toca el
// store hasta el primer `load`.
use crate::errors::Result;
use crate::repository::PersistenceStore;
use entity_domain::{Entity, EntityRef};
use once_cell::sync::OnceCell;
use std::sync::Arc;

pub struct LazyEntity<S: PersistenceStore> {
    store: Arc<S>,
    target: EntityRef,
    loaded: OnceCell<Option<Entity>>,
}

impl<S: PersistenceStore> LazyEntity<S> {
    pub fn new(store: Arc<S>, target: EntityRef) -> Self {
        Self { store, target, loaded: OnceCell::new() }
    }

    pub fn reference(&self) -> &EntityRef {
        &self.target
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Carga la entidad la primera vez; las siguientes llamadas reutilizan
    /// el resultado. `None` si ya no existe.
    pub fn load(&self) -> Result<Option<&Entity>> {
        let loaded = self.loaded
                         .get_or_try_init(|| self.store.get_by_id(&self.target.kind, &self.target.id))?;
        Ok(loaded.as_ref())
    }
}

impl<S: PersistenceStore> std::fmt::Debug for LazyEntity<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyEntity")
         .field("target", &self.target)
         .field("loaded", &self.is_loaded())
         .finish()
    }
}
