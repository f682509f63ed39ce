//! In-memory stores for unit and router tests.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{
        jwt::JwtKeys,
        repo::{UserStore, EMAIL_TAKEN},
        repo_types::{NewUser, User},
    },
    config::JwtConfig,
    db::StoreError,
    todos::{
        repo::TodoStore,
        repo_types::{NewTodo, Todo, TodoChanges},
    },
};

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        access_secret: "test-access-secret".into(),
        refresh_secret: "test-refresh-secret".into(),
        issuer: "test-issuer".into(),
        audience: "test-aud".into(),
        ttl_minutes: 5,
        refresh_ttl_minutes: 60,
    }
}

pub fn test_keys() -> JwtKeys {
    JwtKeys::from_config(&test_jwt_config())
}

/// Users kept in a vector; email uniqueness is checked under the lock so it
/// behaves like the database constraint.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    fail_refresh_writes: bool,
}

impl MemoryUserStore {
    /// A store whose `set_refresh_token` always errors.
    pub fn failing_refresh_writes() -> Self {
        Self {
            fail_refresh_writes: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::Conflict(EMAIL_TAKEN.into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            refresh_token: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn set_refresh_token(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        if self.fail_refresh_writes {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;
        user.refresh_token = Some(token.to_string());
        Ok(())
    }
}

/// Wraps a store so the email lookup never sees an existing user, as when two
/// registrations race past the pre-check. Only `create` can catch duplicates.
#[derive(Default)]
pub struct BlindLookupUserStore {
    pub inner: MemoryUserStore,
}

#[async_trait]
impl UserStore for BlindLookupUserStore {
    async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
        Ok(None)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        self.inner.create(new_user).await
    }

    async fn set_refresh_token(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        self.inner.set_refresh_token(id, token).await
    }
}

#[derive(Default)]
pub struct MemoryTodoStore {
    todos: Mutex<Vec<Todo>>,
}

#[async_trait]
impl TodoStore for MemoryTodoStore {
    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Todo>, StoreError> {
        let todos = self.todos.lock().unwrap();
        Ok(todos
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn create(&self, new_todo: NewTodo) -> Result<Todo, StoreError> {
        let now = OffsetDateTime::now_utc();
        let todo = Todo {
            id: Uuid::new_v4(),
            user_id: new_todo.user_id,
            title: new_todo.title,
            description: new_todo.description,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        self.todos.lock().unwrap().push(todo.clone());
        Ok(todo)
    }

    async fn find(&self, user_id: Uuid, id: Uuid) -> Result<Option<Todo>, StoreError> {
        let todos = self.todos.lock().unwrap();
        Ok(todos
            .iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .cloned())
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, StoreError> {
        let mut todos = self.todos.lock().unwrap();
        let Some(todo) = todos.iter_mut().find(|t| t.id == id && t.user_id == user_id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            todo.title = title;
        }
        if let Some(description) = changes.description {
            todo.description = description;
        }
        if let Some(completed) = changes.completed {
            todo.completed = completed;
        }
        todo.updated_at = OffsetDateTime::now_utc();
        Ok(Some(todo.clone()))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut todos = self.todos.lock().unwrap();
        let before = todos.len();
        todos.retain(|t| !(t.id == id && t.user_id == user_id));
        Ok(todos.len() != before)
    }
}
