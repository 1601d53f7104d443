// Archivo: query.rs
// Propósito: tipos de consulta (criterios, orden, paginación, búsqueda) y la
// evaluación en memoria que cualquier store puede reutilizar.
use entity_domain::{Association, Entity, EntityId, FieldValue};
use indexmap::IndexMap;
use std::cmp::Ordering;

/// Condición sobre un campo, una asociación o el pseudo-campo `id`.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Igualdad. Sobre una asociación compara el identificador referenciado.
    Eq(FieldValue),
    /// Igual a cualquiera de los valores.
    OneOf(Vec<FieldValue>),
    /// Campo nulo o asociación vacía.
    IsNull,
    /// La asociación apunta a (o contiene) la entidad con este id.
    RefersTo(EntityId),
}

/// Criterios de filtrado, combinados con AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    conditions: IndexMap<String, Condition>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.conditions.insert(name.into(), Condition::Eq(value.into()));
        self
    }

    pub fn one_of<I, V>(mut self, name: impl Into<String>, values: I) -> Self
        where I: IntoIterator<Item = V>,
              V: Into<FieldValue>
    {
        self.conditions
            .insert(name.into(), Condition::OneOf(values.into_iter().map(Into::into).collect()));
        self
    }

    pub fn is_null(mut self, name: impl Into<String>) -> Self {
        self.conditions.insert(name.into(), Condition::IsNull);
        self
    }

    pub fn refers_to(mut self, name: impl Into<String>, id: EntityId) -> Self {
        self.conditions.insert(name.into(), Condition::RefersTo(id));
        self
    }

    /// Inserta o reemplaza la condición de `name`. Pensado para hooks que
    /// fuerzan un filtro.
    pub fn insert(&mut self, name: impl Into<String>, condition: Condition) {
        self.conditions.insert(name.into(), condition);
    }

    pub fn get(&self, name: &str) -> Option<&Condition> {
        self.conditions.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Condition)> {
        self.conditions.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.conditions.iter().all(|(name, cond)| condition_matches(entity, name, cond))
    }
}

fn id_of(value: &FieldValue) -> Option<EntityId> {
    match value {
        FieldValue::Integer(i) => Some(EntityId::Int(*i)),
        FieldValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn condition_matches(entity: &Entity, name: &str, cond: &Condition) -> bool {
    if name == "id" {
        return match cond {
            Condition::Eq(v) => id_of(v).as_ref() == Some(entity.id()),
            Condition::OneOf(vs) => vs.iter().any(|v| id_of(v).as_ref() == Some(entity.id())),
            Condition::RefersTo(id) => id == entity.id(),
            Condition::IsNull => false,
        };
    }
    if let Some(value) = entity.get(name) {
        return match cond {
            Condition::Eq(v) => value.compare(v) == Ordering::Equal,
            Condition::OneOf(vs) => vs.iter().any(|v| value.compare(v) == Ordering::Equal),
            Condition::IsNull => value.is_null(),
            Condition::RefersTo(_) => false,
        };
    }
    if let Some(assoc) = entity.association(name) {
        let refs = assoc.refs();
        let holds = |id: &EntityId| refs.iter().any(|r| &r.id == id);
        return match cond {
            Condition::Eq(v) => id_of(v).map(|id| holds(&id)).unwrap_or(false),
            Condition::OneOf(vs) => vs.iter().filter_map(id_of).any(|id| holds(&id)),
            Condition::IsNull => refs.is_empty(),
            Condition::RefersTo(id) => holds(id),
        };
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Orden de resultados: lista de (propiedad, dirección) aplicada en orden.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBy {
    keys: Vec<(String, Direction)>,
}

impl OrderBy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(mut self, name: impl Into<String>) -> Self {
        self.keys.push((name.into(), Direction::Asc));
        self
    }

    pub fn desc(mut self, name: impl Into<String>) -> Self {
        self.keys.push((name.into(), Direction::Desc));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, direction: Direction) {
        self.keys.push((name.into(), direction));
    }

    pub fn keys(&self) -> &[(String, Direction)] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn compare(&self, a: &Entity, b: &Entity) -> Ordering {
        for (name, direction) in &self.keys {
            let ord = sort_key(a, name).compare(&sort_key(b, name));
            let ord = match direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

fn sort_key(entity: &Entity, name: &str) -> FieldValue {
    let id_value = |id: &EntityId| match id {
        EntityId::Int(i) => FieldValue::Integer(*i),
        EntityId::Uuid(u) => FieldValue::String(u.to_string()),
    };
    if name == "id" {
        return id_value(entity.id());
    }
    if let Some(value) = entity.get(name) {
        return value.clone();
    }
    match entity.association(name) {
        Some(Association::ToOne(Some(r))) => id_value(&r.id),
        _ => FieldValue::Null,
    }
}

/// Filtro de búsqueda libre ya resuelto contra el esquema: alguna de las
/// `fields` contiene alguno de los `terms` (en minúsculas). Sin campos no
/// coincide nada.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFilter {
    pub fields: Vec<String>,
    pub terms: Vec<String>,
}

impl SearchFilter {
    pub fn new(fields: Vec<String>, terms: &[String]) -> Self {
        let terms = terms.iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()).collect();
        Self { fields, terms }
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.fields.iter().any(|field| {
                              entity.get(field)
                                    .map(|v| self.terms.iter().any(|t| v.contains_text(t)))
                                    .unwrap_or(false)
                          })
    }
}

/// Consulta completa que recibe el store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreQuery {
    pub criteria: Criteria,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub search: Option<SearchFilter>,
}

impl StoreQuery {
    pub fn new(criteria: Criteria) -> Self {
        Self { criteria, ..Default::default() }
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.criteria.matches(entity) && self.search.as_ref().map(|s| s.matches(entity)).unwrap_or(true)
    }

    /// Filtra, ordena (estable: los empates conservan el orden de entrada)
    /// y pagina.
    pub fn apply<I>(&self, entities: I) -> Vec<Entity>
        where I: IntoIterator<Item = Entity>
    {
        let mut out: Vec<Entity> = entities.into_iter().filter(|e| self.matches(e)).collect();
        if let Some(order) = &self.order_by {
            out.sort_by(|a, b| order.compare(a, b));
        }
        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(usize::MAX);
        out.into_iter().skip(offset).take(limit).collect()
    }
}

/// Parámetros de `find` tal como los ven los hooks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindParams {
    pub criteria: Criteria,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub search: Option<Vec<String>>,
}

impl FindParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn search<I, S>(mut self, terms: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        self.search = Some(terms.into_iter().map(Into::into).collect());
        self
    }
}

/// Parámetros de `find_one_by`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOneByParams {
    pub criteria: Criteria,
    pub order_by: Option<OrderBy>,
}

impl FindOneByParams {
    pub fn new(criteria: Criteria) -> Self {
        Self { criteria, order_by: None }
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }
}
