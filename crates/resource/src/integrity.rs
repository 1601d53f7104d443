// Archivo: integrity.rs
// Propósito: mantener la simetría de las asociaciones bidireccionales y la
// integridad referencial a nivel de store, dentro de la transacción de la
// escritura principal.
use crate::errors::{ResourceError, Result};
use crate::query::{Criteria, StoreQuery};
use crate::repository::{PersistenceStore, StoreTransaction};
use entity_domain::{Cardinality, Entity, EntityRef, SchemaRegistry, Violation};

/// Reconcilia las contrapartes de `entity` respecto a su estado anterior
/// (`before`, `None` si es nueva).
///
/// - Referencias ganadas: la contraparte debe existir y se enlaza su
///   inversa. Si la inversa es a uno y apuntaba a otro dueño, ese dueño
///   pierde la referencia.
/// - Referencias perdidas: se desenlaza la inversa de la contraparte.
///
/// Las contrapartes modificadas se escriben en `tx`; `entity` no se escribe.
pub fn reconcile(tx: &mut dyn StoreTransaction,
                 registry: &SchemaRegistry,
                 before: Option<&Entity>,
                 entity: &mut Entity)
                 -> Result<()> {
    let schema = entity.schema().clone();
    let me = entity.reference();
    let mut violations = Vec::new();

    for def in schema.associations() {
        let old = match before {
            Some(b) => b.refs(&def.name)?,
            None => Vec::new(),
        };
        let new = entity.refs(&def.name)?;

        for target in new.iter().filter(|r| !old.contains(r)) {
            if *target == me {
                if let Some(inverse) = &def.inverse {
                    entity.link(inverse, me.clone())?;
                }
                continue;
            }
            let Some(mut other) = tx.get_by_id(&target.kind, &target.id)? else {
                violations.push(Violation::new(def.name.as_str(), format!("{} no existe.", target)));
                continue;
            };
            let Some(inverse) = &def.inverse else {
                continue;
            };
            let inverse_is_to_one = registry.get(&target.kind)
                                            .and_then(|s| s.association(inverse).map(|a| a.cardinality))
                                            == Some(Cardinality::ToOne);
            if inverse_is_to_one {
                if let Some(previous) = other.get_one(inverse)?.cloned() {
                    if previous != me {
                        steal(tx, &previous, &def.name, target)?;
                    }
                }
            }
            if other.link(inverse, me.clone())? {
                tx.write(other)?;
            }
        }

        let Some(inverse) = &def.inverse else {
            continue;
        };
        for target in old.iter().filter(|r| !new.contains(r)) {
            if *target == me {
                entity.unlink(inverse, &me)?;
                continue;
            }
            if let Some(mut other) = tx.get_by_id(&target.kind, &target.id)? {
                if other.unlink(inverse, &me)? {
                    tx.write(other)?;
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ResourceError::ValidationFailed(violations))
    }
}

/// Quita `target` de la asociación `name` de su dueño anterior.
fn steal(tx: &mut dyn StoreTransaction, owner: &EntityRef, name: &str, target: &EntityRef) -> Result<()> {
    if let Some(mut previous) = tx.get_by_id(&owner.kind, &owner.id)? {
        if previous.unlink(name, target)? {
            log::debug!("{} deja de referenciar {} en '{}'", owner, target, name);
            tx.write(previous)?;
        }
    }
    Ok(())
}

/// Desenlaza `entity` de toda entidad registrada que la referencie, para
/// que ninguna asociación apunte a una entidad borrada.
pub fn detach_references<S>(store: &S,
                            tx: &mut dyn StoreTransaction,
                            registry: &SchemaRegistry,
                            entity: &Entity)
                            -> Result<usize>
    where S: PersistenceStore + ?Sized
{
    let me = entity.reference();
    let mut detached = 0;
    for (schema, def) in registry.referencing(entity.kind()) {
        let query = StoreQuery::new(Criteria::new().refers_to(def.name.clone(), *entity.id()));
        for holder in store.get_by_criteria(schema.kind(), &query)? {
            if holder.reference() == me {
                continue;
            }
            // Releer dentro de la transacción por si ya se tocó.
            if let Some(mut holder) = tx.get_by_id(schema.kind(), holder.id())? {
                if holder.unlink(&def.name, &me)? {
                    tx.write(holder)?;
                    detached += 1;
                }
            }
        }
    }
    Ok(detached)
}
