use crate::store::keys;
use crate::store::{Store, StoreError};

/// Persisted copy of a computed readiness record, stored as a JSON blob.
/// This is a cache of derivable data: it can be discarded and rebuilt from
/// the performance records at any time and is never read as a source of
/// truth by the engine itself.
impl Store {
    pub fn set_readiness_record(
        &self,
        user_id: &str,
        scope_key: &str,
        value: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let key = keys::readiness_key(user_id, scope_key)?;
        self.readiness_records
            .insert(key.as_bytes(), Self::serialize(value)?)?;
        Ok(())
    }

    pub fn get_readiness_record(
        &self,
        user_id: &str,
        scope_key: &str,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        let key = keys::readiness_key(user_id, scope_key)?;
        match self.readiness_records.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }
}
