//! Todo use cases with ownership checks

use crate::repository::TodoRepository;
use std::sync::Arc;
use todo_core::{Principal, Result, Todo, TodoError, TodoFields};
use tracing::{debug, info};

pub struct TodoManager {
    todos: Arc<TodoRepository>,
}

impl TodoManager {
    pub fn new(todos: Arc<TodoRepository>) -> Self {
        Self { todos }
    }

    /// The caller's todos, or every todo when `all` is set (admins only).
    pub async fn list_for(&self, principal: &Principal, all: bool) -> Result<Vec<Todo>> {
        if all {
            if !principal.is_admin() {
                return Err(TodoError::PermissionDenied(
                    "Listing all todos requires the admin role".to_string(),
                ));
            }
            return self.todos.list().await;
        }
        self.todos.list_by_owner(&principal.user_id).await
    }

    pub async fn get(&self, principal: &Principal, id: &str) -> Result<Todo> {
        let todo = self.todos.get_by_id(id).await?;
        authorize(principal, &todo)?;
        Ok(todo)
    }

    pub async fn create(&self, principal: &Principal, fields: TodoFields) -> Result<Todo> {
        check_fields(&fields)?;

        let todo = Todo::new(
            uuid::Uuid::new_v4().to_string(),
            principal.user_id.clone(),
            fields,
        );
        let todo = self.todos.insert(todo).await?;
        info!(todo_id = %todo.id, user_id = %todo.user_id, "Created todo");
        Ok(todo)
    }

    pub async fn update(&self, principal: &Principal, id: &str, fields: TodoFields) -> Result<Todo> {
        check_fields(&fields)?;
        self.get(principal, id).await?;

        let todo = self.todos.update(id, |todo| todo.apply(&fields)).await?;
        debug!(todo_id = %id, "Updated todo");
        Ok(todo)
    }

    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<()> {
        self.get(principal, id).await?;
        self.todos.delete_by_id(id).await?;
        info!(todo_id = %id, user_id = %principal.user_id, "Deleted todo");
        Ok(())
    }

    /// Removes every todo owned by `owner_id`, returning how many went away.
    pub async fn delete_all_owned_by(&self, owner_id: &str) -> Result<usize> {
        let mut removed = 0;
        for todo in self.todos.list_by_owner(owner_id).await? {
            match self.todos.delete_by_id(&todo.id).await {
                Ok(()) => removed += 1,
                // Already gone
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }
}

fn check_fields(fields: &TodoFields) -> Result<()> {
    if fields.title.trim().is_empty() {
        return Err(TodoError::Validation("Title is required".to_string()));
    }
    Ok(())
}

fn authorize(principal: &Principal, todo: &Todo) -> Result<()> {
    if !principal.can_access(&todo.user_id) {
        return Err(TodoError::PermissionDenied(format!(
            "Todo {} belongs to another user",
            todo.id
        )));
    }
    Ok(())
}
