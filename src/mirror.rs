//! Degraded-mode mirror.
//!
//! A local copy of a resource list, stored as a JSON array under the
//! resource's mirror key. It is replaced wholesale after every successful
//! remote list fetch and written directly when a remote mutation cannot be
//! performed. Locally created records get `max(id) + 1`; those ids are not
//! reconciled with backend-assigned ids later.

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::db::DbState;
use crate::resource::Resource;

/// Read the mirror. Returns an empty list on a miss or a corrupt value.
pub fn read<R: Resource>(db: &DbState) -> Result<Vec<R>, String> {
    let Some(raw) = db.read(R::MIRROR_KEY)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Vec<R>>(&raw) {
        Ok(list) => Ok(list),
        Err(e) => {
            error!(key = R::MIRROR_KEY, error = %e, "mirror JSON parse error, treating as empty");
            Ok(Vec::new())
        }
    }
}

/// Replace the whole mirror.
pub fn replace<R: Resource>(db: &DbState, list: &[R]) -> Result<(), String> {
    let json = serde_json::to_string(list).map_err(|e| format!("serialize {}: {e}", R::KIND))?;
    db.write(R::MIRROR_KEY, &json)?;
    debug!(
        key = R::MIRROR_KEY,
        count = list.len(),
        at = %Utc::now().to_rfc3339(),
        "mirror replaced"
    );
    Ok(())
}

/// Next locally synthesized id.
pub fn next_local_id<R: Resource>(list: &[R]) -> i64 {
    list.iter()
        .map(|r| r.id())
        .max()
        .unwrap_or(0)
        .max(0)
        .saturating_add(1)
}

/// Replace the record with `id`, or append it when missing.
pub fn upsert<R: Resource>(db: &DbState, id: i64, draft: &R::Draft) -> Result<R, String> {
    let mut list = read::<R>(db)?;
    let mut record = R::from_draft(id, draft);
    match list.iter_mut().find(|r| r.id() == id) {
        Some(existing) => {
            record.complete_local(Some(existing), db);
            *existing = record.clone();
        }
        None => {
            record.complete_local(None, db);
            list.push(record.clone());
        }
    }
    replace(db, &list)?;
    Ok(record)
}

/// Append a new record with a synthesized id.
pub fn insert_new<R: Resource>(db: &DbState, draft: &R::Draft) -> Result<R, String> {
    let mut list = read::<R>(db)?;
    let id = next_local_id(&list);
    let mut record = R::from_draft(id, draft);
    record.complete_local(None, db);
    list.push(record.clone());
    replace(db, &list)?;
    warn!(kind = R::KIND, id, "record created locally with synthesized id");
    Ok(record)
}

/// Remove the record with `id`. Returns whether it was present.
pub fn remove<R: Resource>(db: &DbState, id: i64) -> Result<bool, String> {
    let mut list = read::<R>(db)?;
    let before = list.len();
    list.retain(|r| r.id() != id);
    if list.len() == before {
        return Ok(false);
    }
    replace(db, &list)?;
    Ok(true)
}
