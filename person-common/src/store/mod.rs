use std::time;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ListQuery, NewUser, PersistedUser, UserPatch};

mod fake;
mod postgres;

pub use self::fake::{FakeStoreCall, FakeUserStore};
pub use self::postgres::PgUserStore;

/// Enumeration of errors for operations with a `UserStore`.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection failed with: {error}")]
    ConnectionError { error: sqlx::Error },
    #[error("{command} query failed with: {error}")]
    QueryError { command: String, error: sqlx::Error },
    #[error("{command} query timed out after {timeout:?}")]
    Timeout {
        command: String,
        timeout: time::Duration,
    },
    #[error("user {0} not found")]
    NotFound(i64),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The system of record for users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert only the fields present on `user` and return the assigned id.
    async fn insert(&self, user: &NewUser) -> StoreResult<i64>;

    /// Fetch one page of users whose name contains the filter, ordered by id.
    async fn list(&self, query: &ListQuery) -> StoreResult<Vec<PersistedUser>>;

    /// Overwrite only the fields present on `patch` and return the full row.
    async fn update(&self, id: i64, patch: &UserPatch) -> StoreResult<PersistedUser>;

    /// Delete by id. Deleting an id that does not exist is not an error.
    async fn delete(&self, id: i64) -> StoreResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ColumnValue {
    Text(String),
    Integer(i32),
}

type Column = (&'static str, ColumnValue);

/// Columns to write, in table order. Absent optional values are skipped.
pub(crate) fn user_columns(user: &NewUser) -> Vec<Column> {
    let mut columns = vec![
        ("name", ColumnValue::Text(user.name.clone())),
        ("surname", ColumnValue::Text(user.surname.clone())),
    ];
    columns.extend(optional_columns(
        &user.patronymic,
        user.age,
        &user.gender,
        &user.nationality,
    ));
    columns
}

pub(crate) fn patch_columns(patch: &UserPatch) -> Vec<Column> {
    let mut columns = Vec::new();
    if let Some(name) = &patch.name {
        columns.push(("name", ColumnValue::Text(name.clone())));
    }
    if let Some(surname) = &patch.surname {
        columns.push(("surname", ColumnValue::Text(surname.clone())));
    }
    columns.extend(optional_columns(
        &patch.patronymic,
        patch.age,
        &patch.gender,
        &patch.nationality,
    ));
    columns
}

fn optional_columns(
    patronymic: &Option<String>,
    age: Option<i32>,
    gender: &Option<String>,
    nationality: &Option<String>,
) -> Vec<Column> {
    let mut columns = Vec::new();
    if let Some(patronymic) = patronymic {
        columns.push(("patronymic", ColumnValue::Text(patronymic.clone())));
    }
    if let Some(age) = age {
        columns.push(("age", ColumnValue::Integer(age)));
    }
    if let Some(gender) = gender {
        columns.push(("gender", ColumnValue::Text(gender.clone())));
    }
    if let Some(nationality) = nationality {
        columns.push(("nationality", ColumnValue::Text(nationality.clone())));
    }
    columns
}
