//! Todo types

use serde::{Deserialize, Serialize};

/// A todo item owned by a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub user_id: String,
}

impl Todo {
    pub fn new(id: String, user_id: String, fields: TodoFields) -> Self {
        Self {
            id,
            title: fields.title,
            description: fields.description,
            due_date: fields.due_date,
            status: fields.status,
            priority: fields.priority,
            user_id,
        }
    }

    /// Replace every mutable field. `id` and `user_id` are left untouched.
    pub fn apply(&mut self, fields: &TodoFields) {
        self.title = fields.title.clone();
        self.description = fields.description.clone();
        self.due_date = fields.due_date.clone();
        self.status = fields.status.clone();
        self.priority = fields.priority.clone();
    }

    pub fn fields(&self) -> TodoFields {
        TodoFields {
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: self.due_date.clone(),
            status: self.status.clone(),
            priority: self.priority.clone(),
        }
    }
}

/// The mutable part of a todo, as submitted on create and update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoFields {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub status: String,
    pub priority: String,
}

impl TodoFields {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}
