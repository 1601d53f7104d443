// Archivo: stubs.rs
// Propósito: store en memoria con transacciones optimistas, para pruebas y
// wiring rápido (CLI). No es durable.
use crate::errors::{ResourceError, Result};
use crate::query::StoreQuery;
use crate::repository::{PersistenceStore, StoreTransaction};
use entity_domain::{Association, Entity, EntityId, EntityRef, EntityState};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    /// Tablas por tipo; el orden de inserción es el orden por defecto.
    tables: HashMap<String, IndexMap<EntityId, Entity>>,
    sequences: HashMap<String, i64>,
}

/// Store en memoria. Las transacciones acumulan cambios y los validan de
/// nuevo contra las versiones confirmadas al hacer `commit`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Número de entidades confirmadas de `kind`.
    pub fn count(&self, kind: &str) -> Result<usize> {
        Ok(self.lock()?.tables.get(kind).map(IndexMap::len).unwrap_or(0))
    }

    /// Helper para mapear `Mutex::lock()` a `ResourceError::Persistence`.
    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| ResourceError::Persistence(format!("mutex poisoned: {:?}", e)))
    }
}

impl PersistenceStore for InMemoryStore {
    fn get_by_id(&self, kind: &str, id: &EntityId) -> Result<Option<Entity>> {
        Ok(self.lock()?.tables.get(kind).and_then(|t| t.get(id)).cloned())
    }

    fn get_by_criteria(&self, kind: &str, query: &StoreQuery) -> Result<Vec<Entity>> {
        let rows: Vec<Entity> = self.lock()?
                                    .tables
                                    .get(kind)
                                    .map(|t| t.values().cloned().collect())
                                    .unwrap_or_default();
        Ok(query.apply(rows))
    }

    fn next_sequence(&self, kind: &str) -> Result<i64> {
        let mut state = self.lock()?;
        let seq = state.sequences.entry(kind.to_string()).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>> {
        Ok(Box::new(InMemoryTransaction { store: self,
                                          reads: HashMap::new(),
                                          staged: IndexMap::new(),
                                          committed: false }))
    }
}

#[derive(Debug)]
enum Staged {
    Write(Entity),
    Remove,
}

/// Transacción sobre `InMemoryStore`.
///
/// Cada fila leída queda anotada con la versión confirmada que se observó
/// (`None` si no existía). `commit` falla con `Conflict` si alguna cambió
/// desde entonces, o si aplicar los cambios dejaría una asociación apuntando
/// a una entidad inexistente.
pub struct InMemoryTransaction<'a> {
    store: &'a InMemoryStore,
    reads: HashMap<(String, EntityId), Option<u64>>,
    staged: IndexMap<(String, EntityId), Staged>,
    committed: bool,
}

impl StoreTransaction for InMemoryTransaction<'_> {
    fn get_by_id(&mut self, kind: &str, id: &EntityId) -> Result<Option<Entity>> {
        let key = (kind.to_string(), *id);
        match self.staged.get(&key) {
            Some(Staged::Write(entity)) => Ok(Some(entity.clone())),
            Some(Staged::Remove) => Ok(None),
            None => {
                let found = self.store.get_by_id(kind, id)?;
                self.reads.entry(key).or_insert_with(|| found.as_ref().map(Entity::version));
                Ok(found)
            }
        }
    }

    fn write(&mut self, mut entity: Entity) -> Result<Entity> {
        let visible = self.get_by_id(entity.kind(), entity.id())?;
        match (entity.state(), &visible) {
            (EntityState::Transient, Some(_)) => {
                return Err(ResourceError::Conflict(format!("{} ya existe", entity.reference())));
            }
            (EntityState::Persisted, None) => {
                return Err(ResourceError::Conflict(format!("{} ya no existe", entity.reference())));
            }
            (EntityState::Persisted, Some(current)) if current.version() != entity.version() => {
                return Err(ResourceError::Conflict(format!("{}: versión {} obsoleta (actual {})",
                                                           entity.reference(),
                                                           entity.version(),
                                                           current.version())));
            }
            (EntityState::Removed, _) => {
                return Err(ResourceError::Conflict(format!("{} fue eliminada", entity.reference())));
            }
            _ => {}
        }
        let next = entity.version() + 1;
        entity.mark_persisted(next);
        self.staged.insert((entity.kind().to_string(), *entity.id()), Staged::Write(entity.clone()));
        Ok(entity)
    }

    fn remove(&mut self, entity: &Entity) -> Result<()> {
        let current = self.get_by_id(entity.kind(), entity.id())?
                          .ok_or_else(|| ResourceError::NotFound(entity.reference().to_string()))?;
        if current.version() != entity.version() {
            return Err(ResourceError::Conflict(format!("{}: versión {} obsoleta (actual {})",
                                                       entity.reference(),
                                                       entity.version(),
                                                       current.version())));
        }
        self.staged.insert((entity.kind().to_string(), *entity.id()), Staged::Remove);
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        let reads = std::mem::take(&mut self.reads);
        self.committed = true;
        let mut state = self.store.lock()?;

        // Revalidar todo antes de aplicar nada.
        for ((kind, id), observed) in &reads {
            let actual = state.tables.get(kind).and_then(|t| t.get(id)).map(Entity::version);
            if actual != *observed {
                return Err(ResourceError::Conflict(format!("{}#{} modificada por otra transacción", kind, id)));
            }
        }
        check_references(&state, &staged)?;

        for ((kind, id), change) in staged {
            let table = state.tables.entry(kind).or_default();
            match change {
                Staged::Write(entity) => {
                    table.insert(id, entity);
                }
                Staged::Remove => {
                    table.shift_remove(&id);
                }
            }
        }
        Ok(())
    }
}

/// Existencia de `target` tal como quedaría tras aplicar `staged`.
fn exists_after(state: &State, staged: &IndexMap<(String, EntityId), Staged>, target: &EntityRef) -> bool {
    match staged.get(&(target.kind.clone(), target.id)) {
        Some(Staged::Write(_)) => true,
        Some(Staged::Remove) => false,
        None => state.tables.get(&target.kind).is_some_and(|t| t.contains_key(&target.id)),
    }
}

/// Ninguna asociación puede quedar apuntando a una entidad borrada: ni las
/// filas que escribe la transacción ni las confirmadas que no toca.
fn check_references(state: &State, staged: &IndexMap<(String, EntityId), Staged>) -> Result<()> {
    for change in staged.values() {
        let Staged::Write(entity) = change else {
            continue;
        };
        for target in entity.associations().values().flat_map(Association::refs) {
            if !exists_after(state, staged, &target) {
                return Err(ResourceError::Conflict(format!("{} referencia {}, que ya no existe",
                                                           entity.reference(),
                                                           target)));
            }
        }
    }

    let removed: Vec<EntityRef> = staged.iter()
                                        .filter(|(_, change)| matches!(change, Staged::Remove))
                                        .map(|((kind, id), _)| EntityRef::new(kind.as_str(), *id))
                                        .collect();
    if removed.is_empty() {
        return Ok(());
    }
    for (kind, table) in &state.tables {
        for (id, row) in table {
            if staged.contains_key(&(kind.clone(), *id)) {
                continue;
            }
            if let Some(target) = removed.iter().find(|r| row.associations().values().any(|a| a.contains(r))) {
                return Err(ResourceError::Conflict(format!("{} sigue referenciando {}", row.reference(), target)));
            }
        }
    }
    Ok(())
}

impl Drop for InMemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.staged.is_empty() {
            log::debug!("rollback de {} cambios pendientes", self.staged.len());
        }
    }
}
