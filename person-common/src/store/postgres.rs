use std::future::Future;
use std::time;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};

use super::{patch_columns, user_columns, ColumnValue, StoreError, StoreResult, UserStore};
use crate::models::{ListQuery, NewUser, PersistedUser, UserPatch};

const USER_COLUMNS: &str = "id, name, surname, patronymic, age, gender, nationality";

/// A `UserStore` backed by the `users` table in PostgreSQL.
///
/// Every statement is bounded by the configured timeout.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
    timeout: time::Duration,
}

impl PgUserStore {
    pub async fn new(
        url: &str,
        max_connections: u32,
        timeout: time::Duration,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(timeout)
            .connect(url)
            .await
            .map_err(|error| StoreError::ConnectionError { error })?;

        Ok(Self { pool, timeout })
    }

    pub fn new_from_pool(pool: PgPool, timeout: time::Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T, F>(&self, command: &str, query: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, query).await {
            Ok(result) => result.map_err(|error| StoreError::QueryError {
                command: command.to_owned(),
                error,
            }),
            Err(_) => Err(StoreError::Timeout {
                command: command.to_owned(),
                timeout: self.timeout,
            }),
        }
    }
}

/// Escape LIKE wildcards so the filter matches as a literal substring.
fn like_pattern(filter: &str) -> String {
    let mut pattern = String::with_capacity(filter.len() + 2);
    pattern.push('%');
    for c in filter.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &NewUser) -> StoreResult<i64> {
        let columns = user_columns(user);

        let mut builder = QueryBuilder::<Postgres>::new("INSERT INTO users (");
        let mut names = builder.separated(", ");
        for (column, _) in &columns {
            names.push(*column);
        }

        builder.push(") VALUES (");
        let mut values = builder.separated(", ");
        for (_, value) in columns {
            match value {
                ColumnValue::Text(text) => values.push_bind(text),
                ColumnValue::Integer(integer) => values.push_bind(integer),
            };
        }
        builder.push(") RETURNING id");

        self.bounded(
            "INSERT",
            builder.build_query_scalar::<i64>().fetch_one(&self.pool),
        )
        .await
    }

    async fn list(&self, query: &ListQuery) -> StoreResult<Vec<PersistedUser>> {
        let statement = format!(
            r"SELECT {USER_COLUMNS} FROM users WHERE name LIKE $1 ESCAPE '\' ORDER BY id LIMIT $2 OFFSET $3"
        );

        self.bounded(
            "SELECT",
            sqlx::query_as::<_, PersistedUser>(&statement)
                .bind(like_pattern(&query.filter))
                .bind(query.limit())
                .bind(query.offset())
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn update(&self, id: i64, patch: &UserPatch) -> StoreResult<PersistedUser> {
        let columns = patch_columns(patch);

        let row = if columns.is_empty() {
            let statement = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

            self.bounded(
                "SELECT",
                sqlx::query_as::<_, PersistedUser>(&statement)
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await?
        } else {
            let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET ");
            let mut assignments = builder.separated(", ");
            for (column, value) in columns {
                assignments.push(column);
                assignments.push_unseparated(" = ");
                match value {
                    ColumnValue::Text(text) => assignments.push_bind_unseparated(text),
                    ColumnValue::Integer(integer) => assignments.push_bind_unseparated(integer),
                };
            }
            builder.push(" WHERE id = ");
            builder.push_bind(id);
            builder.push(" RETURNING ");
            builder.push(USER_COLUMNS);

            self.bounded(
                "UPDATE",
                builder
                    .build_query_as::<PersistedUser>()
                    .fetch_optional(&self.pool),
            )
            .await?
        };

        row.ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        self.bounded(
            "DELETE",
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;

        Ok(())
    }
}
