use super::state::ActorDecision;
use super::state::Manuscript;
use super::state::ManuscriptId;
use super::state::PendingKey;
use super::state::RawComment;

#[derive(Debug, Clone)]
pub enum ReviewAction {
    User(UserAction),
    Runtime(RuntimeAction),
}

#[derive(Debug, Clone)]
pub enum UserAction {
    ToggleExpanded(ManuscriptId),
    CollapseAll,
    SelectDecision {
        manuscript_id: ManuscriptId,
        decision: ActorDecision,
    },
    SetCommentDraft {
        manuscript_id: ManuscriptId,
        text: String,
    },
    /// Editors record their decision against one referee's recommendation.
    SetDraftReferee {
        manuscript_id: ManuscriptId,
        referee_id: String,
    },
    SubmitDecision {
        manuscript_id: ManuscriptId,
    },
    MarkDone(ManuscriptId),
    Withdraw(ManuscriptId),
    AssignReferee {
        manuscript_id: ManuscriptId,
        referee_id: String,
    },
    PostComment {
        manuscript_id: ManuscriptId,
    },
    DismissMessage(ManuscriptId),
    Unmount,
}

/// Results coming back from the orchestrator.
#[derive(Debug, Clone)]
pub enum RuntimeAction {
    ManuscriptsLoaded(Vec<Manuscript>),
    CommentsLoaded {
        manuscript_id: ManuscriptId,
        comments: Vec<RawComment>,
    },
    OperationSucceeded {
        key: PendingKey,
        message: Option<String>,
    },
    OperationFailed {
        key: PendingKey,
        message: String,
    },
}
