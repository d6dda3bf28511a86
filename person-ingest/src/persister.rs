use std::sync::Arc;

use person_common::models::{EnrichedRecord, NewUser, PersistedUser};
use person_common::store::UserStore;

use crate::error::PersistenceError;

/// Writes enriched records to the system of record.
#[derive(Clone)]
pub struct Persister {
    store: Arc<dyn UserStore>,
}

impl Persister {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Insert `record`, reducing its nationality candidates to the most probable one.
    pub async fn persist(&self, record: &EnrichedRecord) -> Result<PersistedUser, PersistenceError> {
        let user = NewUser::from(record);
        let id = self.store.insert(&user).await?;

        Ok(user.with_id(id))
    }
}
