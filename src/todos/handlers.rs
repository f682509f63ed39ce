use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{extractors::AuthUser, services::required},
    error::AppError,
    response::ApiResponse,
    state::AppState,
};

use super::{
    dto::{CreateTodoRequest, Pagination, UpdateTodoRequest},
    repo_types::{NewTodo, Todo, TodoChanges},
};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todo", get(list_todos).post(create_todo))
        .route("/todo/:id", get(get_todo).patch(update_todo).delete(delete_todo))
}

fn todo_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::Validation("Invalid todo id".into()))
}

fn not_found() -> AppError {
    AppError::NotFound("Todo not found".into())
}

#[instrument(skip(state, query))]
pub async fn list_todos(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<Pagination>, QueryRejection>,
) -> Result<ApiResponse<Vec<Todo>>, AppError> {
    let Query(p) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let (limit, offset) = p.clamped();
    let todos = state.todos.list_by_user(user_id, limit, offset).await?;
    Ok(ApiResponse::ok(todos, "Todos fetched successfully"))
}

#[instrument(skip(state, payload))]
pub async fn create_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<ApiResponse<Todo>, AppError> {
    let Json(payload) = payload?;
    let title = required(payload.title, "title")?;
    let todo = state
        .todos
        .create(NewTodo {
            user_id,
            title,
            description: payload.description,
        })
        .await?;

    info!(%user_id, todo_id = %todo.id, "todo created");
    Ok(ApiResponse::new(StatusCode::CREATED, todo, "Todo created successfully"))
}

#[instrument(skip(state, path))]
pub async fn get_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Todo>, AppError> {
    let id = todo_id(path)?;
    let todo = state.todos.find(user_id, id).await?.ok_or_else(not_found)?;
    Ok(ApiResponse::ok(todo, "Todo fetched successfully"))
}

#[instrument(skip(state, path, payload))]
pub async fn update_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<ApiResponse<Todo>, AppError> {
    let id = todo_id(path)?;
    let Json(payload) = payload?;

    let title = match payload.title {
        Some(t) => Some(required(Some(t), "title")?),
        None => None,
    };
    let changes = TodoChanges {
        title,
        description: payload.description,
        completed: payload.completed,
    };

    let todo = state
        .todos
        .update(user_id, id, changes)
        .await?
        .ok_or_else(not_found)?;

    info!(%user_id, todo_id = %todo.id, "todo updated");
    Ok(ApiResponse::ok(todo, "Todo updated successfully"))
}

#[instrument(skip(state, path))]
pub async fn delete_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Uuid>, AppError> {
    let id = todo_id(path)?;
    if !state.todos.delete(user_id, id).await? {
        return Err(not_found());
    }

    info!(%user_id, todo_id = %id, "todo deleted");
    Ok(ApiResponse::ok(id, "Todo deleted successfully"))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request, StatusCode},
        response::Response,
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{app::build_app, state::AppState};

    async fn body_json(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(app: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> Response {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"));
        let req = match body {
            Some(b) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string())),
            None => builder.body(Body::empty()),
        };
        app.clone().oneshot(req.unwrap()).await.unwrap()
    }

    async fn access_token_for(app: &Router, username: &str) -> String {
        let email = format!("{username}@example.com");
        let register = json!({ "username": username, "email": email, "password": "pw-123456" });
        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/user/register")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(register.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let login = json!({ "email": email, "password": "pw-123456" });
        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/user/login")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(login.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        body_json(res).await["data"]["accessToken"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn todo_lifecycle() {
        let app = build_app(AppState::fake()).unwrap();
        let token = access_token_for(&app, "alice").await;

        let res = send(&app, "POST", "/api/v1/todo", &token, Some(json!({ "title": "buy milk" }))).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = body_json(res).await;
        assert_eq!(created["data"]["completed"], false);
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let res = send(
            &app,
            "PATCH",
            &format!("/api/v1/todo/{id}"),
            &token,
            Some(json!({ "completed": true })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let updated = body_json(res).await;
        assert_eq!(updated["data"]["completed"], true);
        assert_eq!(updated["data"]["title"], "buy milk");

        let res = send(&app, "GET", "/api/v1/todo", &token, None).await;
        let list = body_json(res).await;
        assert_eq!(list["data"].as_array().unwrap().len(), 1);

        let res = send(&app, "DELETE", &format!("/api/v1/todo/{id}"), &token, None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let res = send(&app, "GET", &format!("/api/v1/todo/{id}"), &token, None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn null_description_clears_it_and_absent_keeps_it() {
        let app = build_app(AppState::fake()).unwrap();
        let token = access_token_for(&app, "dave").await;

        let res = send(
            &app,
            "POST",
            "/api/v1/todo",
            &token,
            Some(json!({ "title": "groceries", "description": "milk, eggs" })),
        )
        .await;
        let id = body_json(res).await["data"]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/v1/todo/{id}");

        let res = send(&app, "PATCH", &uri, &token, Some(json!({ "title": "shopping" }))).await;
        let kept = body_json(res).await;
        assert_eq!(kept["data"]["title"], "shopping");
        assert_eq!(kept["data"]["description"], "milk, eggs");

        let res = send(&app, "PATCH", &uri, &token, Some(json!({ "description": null }))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_json(res).await["data"]["description"].is_null());
    }

    #[tokio::test]
    async fn todos_are_private_to_their_owner() {
        let app = build_app(AppState::fake()).unwrap();
        let alice = access_token_for(&app, "alice").await;
        let bob = access_token_for(&app, "bob").await;

        let res = send(&app, "POST", "/api/v1/todo", &alice, Some(json!({ "title": "secret" }))).await;
        let id = body_json(res).await["data"]["id"].as_str().unwrap().to_string();

        let res = send(&app, "GET", &format!("/api/v1/todo/{id}"), &bob, None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = send(&app, "DELETE", &format!("/api/v1/todo/{id}"), &bob, None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = send(&app, "GET", "/api/v1/todo", &bob, None).await;
        assert!(body_json(res).await["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn todo_input_is_validated() {
        let app = build_app(AppState::fake()).unwrap();
        let token = access_token_for(&app, "carol").await;

        let res = send(&app, "POST", "/api/v1/todo", &token, Some(json!({ "title": "  " }))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = send(&app, "GET", "/api/v1/todo/not-a-uuid", &token, None).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/api/v1/todo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
