use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use quire_core::state::ActionCode;
use quire_core::state::Manuscript;
use quire_core::state::ManuscriptId;
use quire_core::state::RawComment;
use quire_core::QuireError;
use quire_core::Role;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unreadable response: {0}")]
    Decode(String),

    #[error(transparent)]
    Workflow(#[from] QuireError),
}

impl ApiError {
    /// Network failures and 5xx/408/429 are worth another try.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || matches!(status, 408 | 429),
            Self::Decode(_) | Self::Workflow(_) => false,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Status { status: 403, .. })
    }

    /// The text shown inline next to the control that failed.
    pub fn message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewComment {
    pub manuscript_id: ManuscriptId,
    #[serde(rename = "editor_id")]
    pub author_id: String,
    pub text: String,
    /// Attached on the retry after the comments service answers 403.
    #[serde(rename = "role", skip_serializing_if = "Option::is_none")]
    pub author_role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewManuscript {
    pub title: String,
    pub author_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
}

pub trait ManuscriptApi {
    fn list_manuscripts(&self) -> ApiResult<Vec<Manuscript>>;
    fn get_manuscript(&self, id: &ManuscriptId) -> ApiResult<Manuscript>;
    fn update_state(
        &self,
        id: &ManuscriptId,
        action: ActionCode,
        payload: Option<Value>,
    ) -> ApiResult<()>;
    fn create_manuscript(&self, manuscript: &NewManuscript) -> ApiResult<Manuscript>;
    fn update_manuscript(&self, manuscript: &Manuscript) -> ApiResult<Manuscript>;
}

pub trait CommentApi {
    fn list_comments(&self, manuscript_id: &ManuscriptId) -> ApiResult<Vec<RawComment>>;
    fn create_comment(&self, comment: &NewComment) -> ApiResult<()>;
}

/// Only the role endpoints matter here; person records are read-only.
pub trait PeopleApi {
    fn list_people(&self) -> ApiResult<Vec<Person>>;
    fn assign_role(&self, person_id: &str, role: Role) -> ApiResult<()>;
}

pub trait Backend: ManuscriptApi + CommentApi + PeopleApi {}

impl<T: ManuscriptApi + CommentApi + PeopleApi> Backend for T {}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ApiError::Transport("connection reset".to_string()).is_transient());
        assert!(ApiError::Status {
            status: 503,
            message: "busy".to_string()
        }
        .is_transient());
        assert!(!ApiError::Status {
            status: 403,
            message: "forbidden".to_string()
        }
        .is_transient());
        assert!(!ApiError::Decode("eof".to_string()).is_transient());
    }

    #[test]
    fn status_message_is_the_server_text() {
        let err = ApiError::Status {
            status: 409,
            message: "User already has this role".to_string(),
        };
        assert_eq!(err.message(), "User already has this role");
        assert!(!err.is_forbidden());
    }

    #[test]
    fn retried_comment_carries_role() {
        let comment = NewComment {
            manuscript_id: ManuscriptId::new("7"),
            author_id: "r1".to_string(),
            text: "ok".to_string(),
            author_role: Some(Role::Referee),
        };
        assert_eq!(
            serde_json::to_value(&comment).expect("json"),
            serde_json::json!({
                "manuscript_id": "7",
                "editor_id": "r1",
                "text": "ok",
                "role": "REFEREE",
            })
        );
    }
}
