use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::StoreError;
use crate::todos::repo_types::{NewTodo, Todo, TodoChanges};

/// Todo persistence. Every query is scoped to the owning user.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Todo>, StoreError>;

    async fn create(&self, new_todo: NewTodo) -> Result<Todo, StoreError>;

    async fn find(&self, user_id: Uuid, id: Uuid) -> Result<Option<Todo>, StoreError>;

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, StoreError>;

    /// `false` when there was nothing to delete.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgTodoStore {
    db: PgPool,
}

impl PgTodoStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Todo>, StoreError> {
        let rows = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, user_id, title, description, completed, created_at, updated_at
            FROM todos
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create(&self, new_todo: NewTodo) -> Result<Todo, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (user_id, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, description, completed, created_at, updated_at
            "#,
        )
        .bind(new_todo.user_id)
        .bind(&new_todo.title)
        .bind(&new_todo.description)
        .fetch_one(&self.db)
        .await?;
        Ok(todo)
    }

    async fn find(&self, user_id: Uuid, id: Uuid) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, user_id, title, description, completed, created_at, updated_at
            FROM todos
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(todo)
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            UPDATE todos
               SET title       = COALESCE($3, title),
                   description = CASE WHEN $4::boolean THEN $5::text ELSE description END,
                   completed   = COALESCE($6, completed),
                   updated_at  = now()
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, completed, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(changes.title)
        .bind(changes.description.is_some())
        .bind(changes.description.flatten())
        .bind(changes.completed)
        .fetch_optional(&self.db)
        .await?;
        Ok(todo)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(r#"DELETE FROM todos WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
