//! Cache value codec
//!
//! Every cached value is the JSON text of an entity or of a list of entities.
//! The empty placeholders `{}` and `[]` (and an empty string) decode to
//! `None` so callers treat them as a miss.

use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

const EMPTY_OBJECT: &str = "{}";
const EMPTY_LIST: &str = "[]";

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a single cached entity.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<Option<T>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == EMPTY_OBJECT || raw == "null" {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(raw)?))
}

/// Decode a cached aggregate list.
pub fn decode_list<T: DeserializeOwned>(raw: &str) -> Result<Option<Vec<T>>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == EMPTY_LIST || raw == "null" {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(raw)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use todo_types::{Role, Todo, TodoFields, User};

    fn sample_todo(description: &str) -> Todo {
        Todo::new(
            "65f0c1".to_string(),
            "u1".to_string(),
            TodoFields {
                title: "Buy milk".to_string(),
                description: description.to_string(),
                due_date: String::new(),
                status: "open".to_string(),
                priority: String::new(),
            },
        )
    }

    #[test]
    fn test_todo_round_trip_with_empty_fields() {
        let todo = sample_todo("");
        let raw = encode(&todo).unwrap();
        let decoded: Todo = decode(&raw).unwrap().unwrap();
        assert_eq!(decoded, todo);
    }

    #[test]
    fn test_user_round_trip() {
        let user = User {
            id: "u1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
            role: Role::Admin,
        };
        let raw = encode(&user).unwrap();
        assert_eq!(decode::<User>(&raw).unwrap(), Some(user));
    }

    #[test]
    fn test_list_round_trip() {
        let todos = vec![sample_todo("first"), sample_todo("")];
        let raw = encode(&todos).unwrap();
        assert_eq!(decode_list::<Todo>(&raw).unwrap(), Some(todos));
    }

    #[test]
    fn test_placeholders_are_misses() {
        assert_eq!(decode::<Todo>("").unwrap(), None);
        assert_eq!(decode::<Todo>("{}").unwrap(), None);
        assert_eq!(decode_list::<Todo>("[]").unwrap(), None);
        assert_eq!(decode_list::<Todo>(" ").unwrap(), None);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(decode::<Todo>("not json").is_err());
        assert!(decode_list::<Todo>("{\"id\":1}").is_err());
    }
}
