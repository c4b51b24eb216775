use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// A row of the `course` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: i32,
    pub name: String,
}

/// The mutable columns of a `person` row.
///
/// This is what callers supply when creating or updating a person; the id is
/// generated by the store and the course list lives in the join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonFields {
    // Missing names deserialize as empty so `validate` reports them.
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Free-form role tag (e.g. "student", "professor").
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub age: i32,
}

impl PersonFields {
    /// Checks the fields the store requires to be non-empty.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.first_name.is_empty() {
            return Err(CoreError::InvalidInput(
                "firstName".to_string(),
                "must not be empty".to_string(),
            ));
        }
        if self.last_name.is_empty() {
            return Err(CoreError::InvalidInput(
                "lastName".to_string(),
                "must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A person together with the ids of the courses they are enrolled in.
///
/// `courses` is not a column; it is materialized from `person_course` when the
/// person is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub age: i32,
    pub courses: Vec<i32>,
}

impl Person {
    pub fn from_fields(id: i32, fields: PersonFields, courses: Vec<i32>) -> Self {
        Self {
            id,
            first_name: fields.first_name,
            last_name: fields.last_name,
            kind: fields.kind,
            age: fields.age,
            courses,
        }
    }
}

/// Optional equality filters for listing people.
///
/// `None` matches every row for that column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
    pub first_name: Option<String>,
    pub age: Option<i32>,
}

impl PersonFilter {
    /// Builds a filter where an empty name or a zero age means "match all".
    pub fn new(first_name: &str, age: i32) -> Self {
        Self {
            first_name: (!first_name.is_empty()).then(|| first_name.to_string()),
            age: (age != 0).then_some(age),
        }
    }

    pub fn matches(&self, fields: &PersonFields) -> bool {
        self.first_name
            .as_deref()
            .is_none_or(|name| fields.first_name == name)
            && self.age.is_none_or(|age| fields.age == age)
    }
}
