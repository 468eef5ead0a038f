use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::ObjectType;

/// A remark left on an advisory, or on a single node of its CSAF tree.
///
/// Answers are comments too; they point at the comment they answer and never
/// refer to a node themselves.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "type")]
    kind: ObjectType,
    pub advisory_id: Uuid,
    pub owner: String,
    pub text: String,
    /// JSON Pointer into the CSAF document this comment refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
    /// Comment this is an answer to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new<O, T>(
        advisory_id: Uuid,
        owner: O,
        text: T,
        field_path: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Comment
    where
        O: Into<String>,
        T: Into<String>,
    {
        Comment {
            kind: ObjectType::Comment,
            advisory_id,
            owner: owner.into(),
            text: text.into(),
            field_path,
            answer_to: None,
            created_at,
        }
    }

    /// Answer to comment `answer_to` on advisory `advisory_id`.
    pub fn answer<O, T>(
        advisory_id: Uuid,
        answer_to: Uuid,
        owner: O,
        text: T,
        created_at: DateTime<Utc>,
    ) -> Comment
    where
        O: Into<String>,
        T: Into<String>,
    {
        Comment {
            answer_to: Some(answer_to),
            ..Comment::new(advisory_id, owner, text, None, created_at)
        }
    }

    pub fn with_text<T: Into<String>>(self, text: T) -> Comment {
        Comment { text: text.into(), ..self }
    }

    pub fn is_answer(&self) -> bool {
        self.answer_to.is_some()
    }
}
