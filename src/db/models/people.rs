//! Database models for directors and actors.
//!
//! Both are stored in tables with identical columns, so one set of models serves both.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Which table a person lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonKind {
    Director,
    Actor,
}

impl PersonKind {
    pub fn table(&self) -> &'static str {
        match self {
            PersonKind::Director => "directors",
            PersonKind::Actor => "actors",
        }
    }

    /// Singular, capitalised name for error messages
    pub fn label(&self) -> &'static str {
        match self {
            PersonKind::Director => "Director",
            PersonKind::Actor => "Actor",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PersonCreateDBRequest {
    pub name: String,
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    pub photo_url: Option<String>,
}

impl PersonCreateDBRequest {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bio: String::new(),
            birth_date: None,
            photo_url: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PersonUpdateDBRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PersonDBResponse {
    pub id: Uuid,
    pub name: String,
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
