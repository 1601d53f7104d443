// Archivo: service.rs
// Propósito: implementar `ResourceService`, el orquestador CRUD genérico.
// Cada operación sigue el mismo orden: hook previo, validación (sólo en las
// que escriben), store y hook posterior.
use crate::errors::{ResourceError, Result};
use crate::hooks::{NoHooks, ResourceHooks, UpdateInput};
use crate::integrity::{detach_references, reconcile};
use crate::payload::{apply_payload, Payload};
use crate::query::{Criteria, FindOneByParams, FindParams, OrderBy, SearchFilter, StoreQuery};
use crate::reference::LazyEntity;
use crate::repository::PersistenceStore;
use entity_domain::{DomainError, Entity, EntityId, EntitySchema, IdStrategy, SchemaRegistry, Validator};
use std::sync::Arc;

/// Servicio de recursos para un tipo de entidad.
///
/// No guarda estado mutable propio: sólo las referencias inyectadas (store,
/// registro de esquemas, validador y hooks). Todo estado compartido vive en
/// el store.
pub struct ResourceService<S, H = NoHooks>
    where S: PersistenceStore,
          H: ResourceHooks
{
    store: Arc<S>,
    registry: Arc<SchemaRegistry>,
    schema: Arc<EntitySchema>,
    validator: Arc<dyn Validator>,
    hooks: H,
}

impl<S> ResourceService<S, NoHooks> where S: PersistenceStore
{
    /// Crea el servicio para `kind`, que debe estar registrado.
    pub fn new(store: Arc<S>,
               registry: Arc<SchemaRegistry>,
               kind: &str,
               validator: Arc<dyn Validator>)
               -> Result<Self> {
        let schema = registry.get(kind)
                             .ok_or_else(|| DomainError::ValidationError(format!("Tipo no registrado: {}", kind)))?;
        Ok(Self { store,
                  registry,
                  schema,
                  validator,
                  hooks: NoHooks })
    }
}

impl<S, H> ResourceService<S, H>
    where S: PersistenceStore,
          H: ResourceHooks
{
    /// Sustituye los hooks del servicio.
    pub fn with_hooks<H2: ResourceHooks>(self, hooks: H2) -> ResourceService<S, H2> {
        ResourceService { store: self.store,
                          registry: self.registry,
                          schema: self.schema,
                          validator: self.validator,
                          hooks }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn kind(&self) -> &str {
        self.schema.kind()
    }

    /// Nombres de las asociaciones de la entidad.
    pub fn associations(&self) -> Vec<String> {
        self.schema.associations().iter().map(|a| a.name.clone()).collect()
    }

    /// Entidad transitoria con identidad ya asignada, para usar con `save`.
    pub fn new_entity(&self) -> Result<Entity> {
        Ok(Entity::new(self.schema.clone(), self.next_id()?))
    }

    // --- lecturas ---

    /// Busca entidades por criterios, orden, paginación y términos de
    /// búsqueda. Un resultado vacío no es un error.
    pub fn find(&self, params: FindParams) -> Result<Vec<Entity>> {
        let params = self.hooks.before_find(params).map_err(|e| self.hook_failed("before_find", e))?;
        self.check_query(&params.criteria, params.order_by.as_ref())?;
        let query = StoreQuery { criteria: params.criteria.clone(),
                                 order_by: params.order_by.clone(),
                                 limit: params.limit,
                                 offset: params.offset,
                                 search: self.search_filter(params.search.as_deref()) };
        log::debug!("find {}: {:?}", self.kind(), query);
        let found = self.store.get_by_criteria(self.kind(), &query)?;
        self.hooks
            .after_find(&params, &found)
            .map_err(|e| self.hook_failed("after_find", e))?;
        Ok(found)
    }

    pub fn find_one(&self, id: EntityId) -> Result<Option<Entity>> {
        let id = self.hooks.before_find_one(id).map_err(|e| self.hook_failed("before_find_one", e))?;
        log::debug!("find_one {}#{}", self.kind(), id);
        let found = self.store.get_by_id(self.kind(), &id)?;
        self.hooks
            .after_find_one(&id, found.as_ref())
            .map_err(|e| self.hook_failed("after_find_one", e))?;
        Ok(found)
    }

    /// Primera entidad que cumple los criterios según el orden dado.
    pub fn find_one_by(&self, params: FindOneByParams) -> Result<Option<Entity>> {
        let params = self.hooks
                         .before_find_one_by(params)
                         .map_err(|e| self.hook_failed("before_find_one_by", e))?;
        self.check_query(&params.criteria, params.order_by.as_ref())?;
        let query = StoreQuery { criteria: params.criteria.clone(),
                                 order_by: params.order_by.clone(),
                                 limit: Some(1),
                                 ..Default::default() };
        let found = self.store.get_by_criteria(self.kind(), &query)?.into_iter().next();
        self.hooks
            .after_find_one_by(&params, found.as_ref())
            .map_err(|e| self.hook_failed("after_find_one_by", e))?;
        Ok(found)
    }

    /// Referencia perezosa: no consulta el store hasta `load`.
    pub fn get_reference(&self, id: EntityId) -> Result<LazyEntity<S>> {
        let id = self.hooks
                     .before_get_reference(id)
                     .map_err(|e| self.hook_failed("before_get_reference", e))?;
        let reference = self.store.get_reference(self.kind(), id);
        self.hooks
            .after_get_reference(&reference)
            .map_err(|e| self.hook_failed("after_get_reference", e))?;
        Ok(LazyEntity::new(self.store.clone(), reference))
    }

    // --- escrituras ---

    /// Crea una entidad a partir del payload. Si hay violaciones el store no
    /// se toca.
    pub fn create(&self, payload: Payload) -> Result<Entity> {
        let payload = self.hooks.before_create(payload).map_err(|e| self.hook_failed("before_create", e))?;
        let mut entity = self.new_entity()?;
        self.materialize(&mut entity, &payload)?;

        let mut tx = self.store.begin()?;
        reconcile(&mut *tx, &self.registry, None, &mut entity)?;
        let created = tx.write(entity)?;
        self.hooks
            .after_create(&mut *tx, &payload, &created)
            .map_err(|e| self.hook_failed("after_create", e))?;
        tx.commit().map_err(|e| self.store_failed("create", e))?;
        log::info!("creado {}", created.reference());
        Ok(created)
    }

    /// Escribe una entidad construida por código de confianza: inserta si es
    /// transitoria, actualiza (con control de versión) si ya está
    /// persistida. `skip_validation` omite el validador.
    pub fn save(&self, entity: Entity, skip_validation: bool) -> Result<Entity> {
        let mut entity = self.hooks.before_save(entity).map_err(|e| self.hook_failed("before_save", e))?;
        if entity.kind() != self.kind() {
            return Err(DomainError::ValidationError(format!("{} no es de tipo {}",
                                                            entity.reference(),
                                                            self.kind())).into());
        }
        if !skip_validation {
            self.validate(&entity)?;
        }

        let mut tx = self.store.begin()?;
        let before = if entity.is_persisted() {
            tx.get_by_id(self.kind(), entity.id())?
        } else {
            None
        };
        reconcile(&mut *tx, &self.registry, before.as_ref(), &mut entity)?;
        let saved = tx.write(entity).map_err(|e| self.store_failed("save", e))?;
        self.hooks
            .after_save(&mut *tx, &saved)
            .map_err(|e| self.hook_failed("after_save", e))?;
        tx.commit().map_err(|e| self.store_failed("save", e))?;
        log::info!("guardado {} (versión {})", saved.reference(), saved.version());
        Ok(saved)
    }

    /// Actualización parcial: las claves ausentes del payload no cambian.
    pub fn update(&self, id: EntityId, payload: Payload) -> Result<Entity> {
        self.update_versioned(UpdateInput::new(id, payload))
    }

    /// Como `update`, comprobando además `expected_version` si viene.
    pub fn update_versioned(&self, input: UpdateInput) -> Result<Entity> {
        let input = self.hooks.before_update(input).map_err(|e| self.hook_failed("before_update", e))?;
        let current = self.load(&input.id)?;
        if let Some(expected) = input.expected_version {
            if expected != current.version() {
                let err = ResourceError::Conflict(format!("{}: se esperaba la versión {}, actual {}",
                                                          current.reference(),
                                                          expected,
                                                          current.version()));
                return Err(self.store_failed("update", err));
            }
        }
        let mut candidate = current.clone();
        self.materialize(&mut candidate, &input.payload)?;

        let mut tx = self.store.begin()?;
        reconcile(&mut *tx, &self.registry, Some(&current), &mut candidate)?;
        let updated = tx.write(candidate).map_err(|e| self.store_failed("update", e))?;
        self.hooks
            .after_update(&mut *tx, &input, &updated)
            .map_err(|e| self.hook_failed("after_update", e))?;
        tx.commit().map_err(|e| self.store_failed("update", e))?;
        log::info!("actualizado {} (versión {})", updated.reference(), updated.version());
        Ok(updated)
    }

    /// Borra la entidad y la desenlaza de quienes la referencian. Devuelve
    /// la entidad tal como estaba, marcada como eliminada.
    pub fn delete(&self, id: EntityId) -> Result<Entity> {
        let id = self.hooks.before_delete(id).map_err(|e| self.hook_failed("before_delete", e))?;
        let current = self.load(&id)?;

        let mut tx = self.store.begin()?;
        let detached = detach_references(self.store.as_ref(), &mut *tx, &self.registry, &current)?;
        tx.remove(&current).map_err(|e| self.store_failed("delete", e))?;
        let mut removed = current;
        removed.mark_removed();
        self.hooks
            .after_delete(&mut *tx, &id, &removed)
            .map_err(|e| self.hook_failed("after_delete", e))?;
        tx.commit().map_err(|e| self.store_failed("delete", e))?;
        log::info!("eliminado {} ({} referencias desenlazadas)", removed.reference(), detached);
        Ok(removed)
    }

    // --- helpers ---

    fn next_id(&self) -> Result<EntityId> {
        match self.schema.id_strategy() {
            IdStrategy::Uuid => Ok(EntityId::new_uuid()),
            IdStrategy::Sequence => Ok(EntityId::Int(self.store.next_sequence(self.kind())?)),
        }
    }

    fn load(&self, id: &EntityId) -> Result<Entity> {
        self.store
            .get_by_id(self.kind(), id)?
            .ok_or_else(|| ResourceError::NotFound(format!("{}#{}", self.kind(), id)))
    }

    /// Aplica el payload y valida el resultado. Los problemas del payload
    /// se informan antes que los del validador.
    fn materialize(&self, entity: &mut Entity, payload: &Payload) -> Result<()> {
        let store = &self.store;
        let violations = apply_payload(entity, payload, |kind, id| Ok(store.get_by_id(kind, id)?.is_some()))?;
        if !violations.is_empty() {
            log::warn!("payload inválido para {}: {} violaciones", self.kind(), violations.len());
            return Err(ResourceError::ValidationFailed(violations));
        }
        self.validate(entity)
    }

    fn validate(&self, entity: &Entity) -> Result<()> {
        let violations = self.validator.validate(entity);
        if violations.is_empty() {
            return Ok(());
        }
        log::warn!("{} no supera la validación: {} violaciones", entity.reference(), violations.len());
        Err(ResourceError::ValidationFailed(violations))
    }

    /// Rechaza criterios u orden sobre propiedades que el esquema no tiene.
    fn check_query(&self, criteria: &Criteria, order_by: Option<&OrderBy>) -> Result<()> {
        let order_names = order_by.into_iter().flat_map(|o| o.keys().iter().map(|(n, _)| n.as_str()));
        for name in criteria.names().chain(order_names) {
            if !self.schema.has_property(name) {
                return Err(ResourceError::InvalidQuery(format!("'{}' no es una propiedad de {}", name, self.kind())));
            }
        }
        Ok(())
    }

    /// Filtro de búsqueda; `None` si no hay términos útiles.
    fn search_filter(&self, terms: Option<&[String]>) -> Option<SearchFilter> {
        let filter = SearchFilter::new(self.schema.searchable_fields().to_vec(), terms?);
        if filter.terms.is_empty() {
            None
        } else {
            Some(filter)
        }
    }

    fn hook_failed(&self, hook: &str, err: ResourceError) -> ResourceError {
        log::warn!("{} de {} abortó la operación: {}", hook, self.kind(), err);
        err
    }

    fn store_failed(&self, op: &str, err: ResourceError) -> ResourceError {
        if matches!(err, ResourceError::Conflict(_)) {
            log::warn!("{} de {}: {}", op, self.kind(), err);
        }
        err
    }
}
