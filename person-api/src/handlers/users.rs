use std::num::NonZeroU32;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use person_common::models::{ListQuery, NewUser, PersistedUser, UserPatch};
use serde::Deserialize;
use tracing::{debug, info};

use super::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    page: Option<String>,
    size: Option<String>,
    filter: Option<String>,
}

impl ListParams {
    fn into_query(self) -> Result<ListQuery, ApiError> {
        let page = parse_positive(self.page.as_deref())
            .ok_or_else(|| ApiError::bad_request("Invalid page parameter"))?;
        let size = parse_positive(self.size.as_deref())
            .ok_or_else(|| ApiError::bad_request("Invalid size parameter"))?;

        Ok(ListQuery::new(
            page,
            size,
            self.filter.as_deref().unwrap_or_default(),
        ))
    }
}

fn parse_positive(value: Option<&str>) -> Option<NonZeroU32> {
    value?.parse().ok()
}

fn parse_body(body: Result<Json<UserPatch>, JsonRejection>) -> Result<UserPatch, ApiError> {
    match body {
        Ok(Json(patch)) => Ok(patch),
        Err(rejection) => {
            debug!(error = %rejection, "rejected request body");
            Err(ApiError::bad_request("Failed to parse request body"))
        }
    }
}

fn parse_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|_| ApiError::bad_request("Invalid id parameter"))
}

pub async fn list_users(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<PersistedUser>>, ApiError> {
    let Query(params) = params.map_err(|_| ApiError::bad_request("Invalid query parameters"))?;
    let query = params.into_query()?;

    let users = state.users.list(&query).await.map_err(ApiError::Query)?;

    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<UserPatch>, JsonRejection>,
) -> Result<(StatusCode, Json<PersistedUser>), ApiError> {
    let user = NewUser::from_patch(parse_body(body)?)?;

    let id = state
        .store
        .insert(&user)
        .await
        .map_err(ApiError::from_mutation)?;
    info!(id, "created user");

    Ok((StatusCode::CREATED, Json(user.with_id(id))))
}

pub async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UserPatch>, JsonRejection>,
) -> Result<Json<PersistedUser>, ApiError> {
    let id = parse_id(id)?;
    let patch = parse_body(body)?.into_sparse();
    if patch.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let user = state
        .store
        .update(id, &patch)
        .await
        .map_err(ApiError::from_mutation)?;
    info!(id, "updated user");

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(id)?;

    state
        .store
        .delete(id)
        .await
        .map_err(ApiError::from_mutation)?;
    info!(id, "deleted user");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_json_diff::assert_json_eq;
    use axum::{
        body::Body,
        http::{self, Request, Response},
        Router,
    };
    use http_body_util::BodyExt; // for `collect`
    use person_common::cache::MockRedisClient;
    use person_common::store::{FakeStoreCall, FakeUserStore, UserStore};
    use serde_json::{json, Value};
    use tower::ServiceExt; // for `call`, `oneshot`, and `ready`

    use super::*;
    use crate::handlers::app::add_routes;
    use crate::query::UserQueryService;

    fn app(store: &FakeUserStore) -> Router {
        let state = AppState {
            store: Arc::new(store.clone()),
            users: Arc::new(UserQueryService::new(
                Arc::new(store.clone()),
                Arc::new(MockRedisClient::new()),
            )),
        };

        add_routes(Router::new(), state, 1_000_000)
    }

    fn json_request(method: http::Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn json_body(response: Response<Body>) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    async fn seed(store: &FakeUserStore, name: &str, age: Option<i32>) -> i64 {
        store
            .insert(&NewUser {
                name: name.to_owned(),
                surname: "Ushakov".to_owned(),
                patronymic: Some("Vasilevich".to_owned()),
                age,
                gender: Some("male".to_owned()),
                nationality: Some("RU".to_owned()),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn list_users_pages() {
        let store = FakeUserStore::new();
        for name in ["Dmitriy", "Ivan", "Anna"] {
            seed(&store, name, Some(40)).await;
        }

        let response = app(&store)
            .oneshot(
                Request::builder()
                    .uri("/users?page=2&size=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_json_eq!(
            json_body(response).await,
            json!([{
                "id": 3,
                "name": "Anna",
                "surname": "Ushakov",
                "patronymic": "Vasilevich",
                "age": 40,
                "gender": "male",
                "nationality": "RU"
            }])
        );
    }

    #[tokio::test]
    async fn list_users_filters_by_name() {
        let store = FakeUserStore::new();
        seed(&store, "Dmitriy", None).await;
        seed(&store, "Ivan", None).await;

        let response = app(&store)
            .oneshot(
                Request::builder()
                    .uri("/users?page=1&size=10&filter=Iv")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "Ivan");
        assert!(body[0].get("age").is_none());
    }

    #[tokio::test]
    async fn list_users_empty_page() {
        let store = FakeUserStore::new();

        let response = app(&store)
            .oneshot(
                Request::builder()
                    .uri("/users?page=5&size=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_json_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn list_users_bad_pagination() {
        let store = FakeUserStore::new();
        let cases = [
            ("/users?size=10", "Invalid page parameter"),
            ("/users?page=abc&size=10", "Invalid page parameter"),
            ("/users?page=0&size=10", "Invalid page parameter"),
            ("/users?page=-1&size=10", "Invalid page parameter"),
            ("/users?page=1", "Invalid size parameter"),
            ("/users?page=1&size=0", "Invalid size parameter"),
        ];

        for (uri, message) in cases {
            let response = app(&store)
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            assert_json_eq!(json_body(response).await, json!({ "error": message }));
        }
        assert!(store.get_calls().is_empty());
    }

    #[tokio::test]
    async fn list_users_storage_failure() {
        let store = FakeUserStore::new().fail_on("SELECT");

        let response = app(&store)
            .oneshot(
                Request::builder()
                    .uri("/users?page=1&size=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_json_eq!(
            json_body(response).await,
            json!({ "error": "failed to fetch users" })
        );
    }

    #[tokio::test]
    async fn create_user_sparse() {
        let store = FakeUserStore::new();

        let response = app(&store)
            .oneshot(json_request(
                http::Method::POST,
                "/users",
                r#"{"name": "Dmitriy", "surname": "Ushakov", "patronymic": "", "age": 0, "gender": "male"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_json_eq!(
            json_body(response).await,
            json!({"id": 1, "name": "Dmitriy", "surname": "Ushakov", "gender": "male"})
        );
        assert_eq!(
            store.get_calls(),
            vec![FakeStoreCall::Insert(NewUser {
                name: "Dmitriy".to_owned(),
                surname: "Ushakov".to_owned(),
                patronymic: None,
                age: None,
                gender: Some("male".to_owned()),
                nationality: None,
            })]
        );
    }

    #[tokio::test]
    async fn create_user_requires_name_and_surname() {
        let store = FakeUserStore::new();
        let cases = [
            (r#"{"surname": "Ushakov"}"#, "name is required"),
            (r#"{"name": "", "surname": "Ushakov"}"#, "name is required"),
            (r#"{"name": "Dmitriy"}"#, "surname is required"),
        ];

        for (body, message) in cases {
            let response = app(&store)
                .oneshot(json_request(http::Method::POST, "/users", body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_json_eq!(json_body(response).await, json!({ "error": message }));
        }
        assert!(store.get_calls().is_empty());
    }

    #[tokio::test]
    async fn create_user_malformed_body() {
        let store = FakeUserStore::new();

        for body in ["{", r#"{"name": "Dmitriy", "surname": "Ushakov", "age": "old"}"#] {
            let response = app(&store)
                .oneshot(json_request(http::Method::POST, "/users", body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_json_eq!(
                json_body(response).await,
                json!({ "error": "Failed to parse request body" })
            );
        }
    }

    #[tokio::test]
    async fn update_user_only_touches_given_fields() {
        let store = FakeUserStore::new();
        let id = seed(&store, "Dmitriy", Some(40)).await;

        let response = app(&store)
            .oneshot(json_request(
                http::Method::PUT,
                &format!("/users/{}", id),
                r#"{"age": 41}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_json_eq!(
            json_body(response).await,
            json!({
                "id": id,
                "name": "Dmitriy",
                "surname": "Ushakov",
                "patronymic": "Vasilevich",
                "age": 41,
                "gender": "male",
                "nationality": "RU"
            })
        );
    }

    #[tokio::test]
    async fn update_user_not_found() {
        let store = FakeUserStore::new();

        let response = app(&store)
            .oneshot(json_request(http::Method::PUT, "/users/42", r#"{"age": 41}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_json_eq!(
            json_body(response).await,
            json!({ "error": "user 42 not found" })
        );
    }

    #[tokio::test]
    async fn update_user_rejects_empty_patch_and_bad_id() {
        let store = FakeUserStore::new();
        seed(&store, "Dmitriy", Some(40)).await;

        let cases = [
            ("/users/1", r#"{"name": "", "age": 0}"#, "No fields to update"),
            ("/users/1", "{}", "No fields to update"),
            ("/users/one", r#"{"age": 41}"#, "Invalid id parameter"),
        ];

        for (uri, body, message) in cases {
            let response = app(&store)
                .oneshot(json_request(http::Method::PUT, uri, body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_json_eq!(json_body(response).await, json!({ "error": message }));
        }
        assert_eq!(store.get_calls().len(), 1);
    }

    #[tokio::test]
    async fn delete_user_is_unconditional() {
        let store = FakeUserStore::new();
        let id = seed(&store, "Dmitriy", None).await;

        for uri in [format!("/users/{}", id), "/users/999".to_owned()] {
            let response = app(&store)
                .oneshot(
                    Request::builder()
                        .method(http::Method::DELETE)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::NO_CONTENT);
            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert!(body.is_empty());
        }
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn delete_user_storage_failure() {
        let store = FakeUserStore::new().fail_on("DELETE");

        let response = app(&store)
            .oneshot(
                Request::builder()
                    .method(http::Method::DELETE)
                    .uri("/users/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
