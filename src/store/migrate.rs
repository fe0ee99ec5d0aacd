use crate::store::{Store, StoreError};

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Current on-disk schema version. Bump together with a migration step below.
pub const CURRENT_VERSION: u32 = 1;

pub fn run(store: &Store) -> Result<(), StoreError> {
    let stored = read_version(store)?;

    if stored > CURRENT_VERSION {
        return Err(StoreError::Migration {
            version: stored,
            message: format!(
                "store schema {stored} is newer than supported {CURRENT_VERSION}"
            ),
        });
    }

    if stored < CURRENT_VERSION {
        // Version 0 -> 1: fresh store, nothing to rewrite.
        write_version(store, CURRENT_VERSION)?;
        tracing::info!(from = stored, to = CURRENT_VERSION, "Store schema migrated");
    }

    Ok(())
}

fn read_version(store: &Store) -> Result<u32, StoreError> {
    match store.meta.get(SCHEMA_VERSION_KEY)? {
        Some(raw) => {
            let text = String::from_utf8(raw.to_vec()).map_err(|_| StoreError::Migration {
                version: 0,
                message: "schema_version is not valid utf-8".to_string(),
            })?;
            text.parse::<u32>().map_err(|_| StoreError::Migration {
                version: 0,
                message: format!("schema_version is not a number: {text}"),
            })
        }
        None => Ok(0),
    }
}

fn write_version(store: &Store, version: u32) -> Result<(), StoreError> {
    store
        .meta
        .insert(SCHEMA_VERSION_KEY, version.to_string().as_bytes())?;
    Ok(())
}
