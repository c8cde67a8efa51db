//! List models
//!
//! Rust structs for the rows of each staged list.
//! All models use serde for staging, caching and the wire.

use crate::staging::Entity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Todo priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Lifecycle flag shared by todos and ideas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Done,
}

/// A todo list row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub task: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
}

impl Todo {
    pub fn new(task: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task: task.into(),
            category: category.into(),
            priority: Priority::default(),
            status: Status::default(),
        }
    }
}

impl Entity for Todo {
    const TABLE: &'static str = "todos";
    const LIST: &'static str = "todos";

    fn id(&self) -> &str {
        &self.id
    }
}

/// An idea list row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    pub idea: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: Status,
}

impl Idea {
    pub fn new(idea: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            idea: idea.into(),
            category: category.into(),
            status: Status::default(),
        }
    }
}

impl Entity for Idea {
    const TABLE: &'static str = "ideas";
    const LIST: &'static str = "ideas";

    fn id(&self) -> &str {
        &self.id
    }
}
