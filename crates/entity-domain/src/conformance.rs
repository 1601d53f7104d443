// conformance.rs
//
// Comprobaciones genéricas de accesores generadas a partir del esquema
// explícito: para cada campo, asignar un valor de ejemplo y leerlo; para
// cada asociación, ejercitar add/remove/clear o set/get y la simetría de la
// inversa. Devuelve la lista de fallos (vacía si todo es correcto).
use crate::schema::{AssociationDef, Cardinality, EntitySchema, SchemaRegistry};
use crate::{Entity, EntityId, FieldType, FieldValue};
use std::sync::Arc;

pub fn check_entity(schema: &Arc<EntitySchema>, registry: &SchemaRegistry) -> Vec<String> {
  let mut failures = Vec::new();
  for def in schema.fields() {
    let mut entity = Entity::new(schema.clone(), EntityId::new_uuid());
    let sample = def.field_type.sample();
    if let Err(e) = entity.set(&def.name, sample.clone()) {
      failures.push(format!("{}.{}: set falló: {}", schema.kind(), def.name, e));
      continue;
    }
    if entity.get(&def.name) != Some(&sample) {
      failures.push(format!("{}.{}: get no devuelve el valor asignado", schema.kind(), def.name));
    }
    let wrong = wrong_type_sample(def.field_type);
    if entity.set(&def.name, wrong).is_ok() {
      failures.push(format!("{}.{}: acepta un valor de tipo incorrecto", schema.kind(), def.name));
    }
  }
  for assoc in schema.associations() {
    let Some(target) = registry.get(&assoc.target) else {
      failures.push(format!("{}.{}: tipo destino '{}' no registrado", schema.kind(), assoc.name, assoc.target));
      continue;
    };
    let mut owner = Entity::new(schema.clone(), EntityId::new_uuid());
    let mut other = Entity::new(target, EntityId::new_uuid());
    let result = match assoc.cardinality {
      Cardinality::ToMany => check_to_many(assoc, &mut owner, &mut other),
      Cardinality::ToOne => check_to_one(assoc, &mut owner, &mut other),
    };
    if let Err(msg) = result {
      failures.push(format!("{}.{}: {}", schema.kind(), assoc.name, msg));
    }
  }
  failures
}

fn wrong_type_sample(ty: FieldType) -> FieldValue {
  match ty {
    FieldType::String => FieldValue::Boolean(false),
    _ => FieldValue::String("tipo incorrecto".into()),
  }
}

fn inverse_contains(assoc: &AssociationDef, other: &Entity, owner: &Entity) -> Result<bool, String> {
  match &assoc.inverse {
    Some(inverse) => {
      let refs = other.refs(inverse).map_err(|e| e.to_string())?;
      Ok(refs.contains(&owner.reference()))
    }
    None => Ok(false),
  }
}

fn check_to_many(assoc: &AssociationDef, owner: &mut Entity, other: &mut Entity) -> Result<(), String> {
  let name = assoc.name.as_str();
  owner.add(name, other).map_err(|e| e.to_string())?;
  // add es idempotente
  owner.add(name, other).map_err(|e| e.to_string())?;
  let set = owner.get_many(name).map_err(|e| e.to_string())?;
  if set.len() != 1 || !set.contains(&other.reference()) {
    return Err("add no registra la entidad".into());
  }
  if assoc.is_bidirectional() && !inverse_contains(assoc, other, owner)? {
    return Err("add no actualiza la inversa".into());
  }
  owner.remove(name, other).map_err(|e| e.to_string())?;
  owner.remove(name, other).map_err(|e| e.to_string())?;
  if !owner.get_many(name).map_err(|e| e.to_string())?.is_empty() {
    return Err("remove no vacía la colección".into());
  }
  if inverse_contains(assoc, other, owner)? {
    return Err("remove no actualiza la inversa".into());
  }
  owner.add(name, other).map_err(|e| e.to_string())?;
  owner.clear(name).map_err(|e| e.to_string())?;
  if !owner.get_many(name).map_err(|e| e.to_string())?.is_empty() {
    return Err("clear no vacía la colección".into());
  }
  Ok(())
}

fn check_to_one(assoc: &AssociationDef, owner: &mut Entity, other: &mut Entity) -> Result<(), String> {
  let name = assoc.name.as_str();
  owner.set_one(name, Some(other)).map_err(|e| e.to_string())?;
  if owner.get_one(name).map_err(|e| e.to_string())? != Some(&other.reference()) {
    return Err("set no asigna la referencia".into());
  }
  if assoc.is_bidirectional() && !inverse_contains(assoc, other, owner)? {
    return Err("set no actualiza la inversa".into());
  }
  owner.set_one(name, None).map_err(|e| e.to_string())?;
  if owner.get_one(name).map_err(|e| e.to_string())?.is_some() {
    return Err("set(None) no limpia la referencia".into());
  }
  Ok(())
}
