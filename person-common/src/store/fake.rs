use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{StoreError, StoreResult, UserStore};
use crate::models::{ListQuery, NewUser, PersistedUser, UserPatch};

/// An in-memory `UserStore` with the same observable semantics as `PgUserStore`.
///
/// Ids are assigned sequentially from 1. Individual commands can be made to fail,
/// and every call is recorded for later inspection.
#[derive(Clone, Default)]
pub struct FakeUserStore {
    state: Arc<Mutex<FakeState>>,
    failing: HashSet<&'static str>,
}

#[derive(Default)]
struct FakeState {
    rows: BTreeMap<i64, PersistedUser>,
    last_id: i64,
    calls: Vec<FakeStoreCall>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeStoreCall {
    Insert(NewUser),
    List(ListQuery),
    Update(i64, UserPatch),
    Delete(i64),
}

impl FakeUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `command` ("INSERT", "SELECT", "UPDATE" or "DELETE") fail.
    pub fn fail_on(&mut self, command: &'static str) -> Self {
        self.failing.insert(command);
        self.clone()
    }

    pub fn get_calls(&self) -> Vec<FakeStoreCall> {
        self.lock().calls.clone()
    }

    pub fn rows(&self) -> Vec<PersistedUser> {
        self.lock().rows.values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check(&self, command: &'static str) -> StoreResult<()> {
        if self.failing.contains(command) {
            return Err(StoreError::QueryError {
                command: command.to_owned(),
                error: sqlx::Error::PoolTimedOut,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for FakeUserStore {
    async fn insert(&self, user: &NewUser) -> StoreResult<i64> {
        let mut state = self.lock();
        state.calls.push(FakeStoreCall::Insert(user.clone()));
        self.check("INSERT")?;

        state.last_id += 1;
        let id = state.last_id;
        state.rows.insert(id, user.clone().with_id(id));

        Ok(id)
    }

    async fn list(&self, query: &ListQuery) -> StoreResult<Vec<PersistedUser>> {
        let mut state = self.lock();
        state.calls.push(FakeStoreCall::List(query.clone()));
        self.check("SELECT")?;

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit()).unwrap_or(usize::MAX);

        Ok(state
            .rows
            .values()
            .filter(|user| user.name.contains(query.filter.as_str()))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, patch: &UserPatch) -> StoreResult<PersistedUser> {
        let mut state = self.lock();
        state.calls.push(FakeStoreCall::Update(id, patch.clone()));
        self.check("UPDATE")?;

        let user = state.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let patch = patch.clone();

        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(surname) = patch.surname {
            user.surname = surname;
        }
        if patch.patronymic.is_some() {
            user.patronymic = patch.patronymic;
        }
        if patch.age.is_some() {
            user.age = patch.age;
        }
        if patch.gender.is_some() {
            user.gender = patch.gender;
        }
        if patch.nationality.is_some() {
            user.nationality = patch.nationality;
        }

        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let mut state = self.lock();
        state.calls.push(FakeStoreCall::Delete(id));
        self.check("DELETE")?;

        state.rows.remove(&id);
        Ok(())
    }
}
