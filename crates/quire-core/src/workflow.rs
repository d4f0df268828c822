use crate::decisions::lookup;
use crate::decisions::DecisionMap;
use crate::error::QuireError;
use crate::error::Result;
use crate::roles::Role;
use crate::state::ActionCode;
use crate::state::ActorDecision;
use crate::state::Manuscript;
use crate::state::ManuscriptState;
use crate::state::RefereeDecision;

/// The review decision table. Order matters: a rejection short-circuits
/// every accept branch, whatever the current state.
pub fn next_state(
    manuscript: &Manuscript,
    decision: ActorDecision,
    referee_id: &str,
    has_comments: bool,
    decisions: &DecisionMap,
) -> ManuscriptState {
    if decision == ActorDecision::Reject {
        return ManuscriptState::Rejected;
    }

    if decision == ActorDecision::Accept {
        return match manuscript.state {
            ManuscriptState::EditorReview => ManuscriptState::CopyEditing,
            ManuscriptState::AuthorRevision => ManuscriptState::EditorReview,
            ManuscriptState::InReview => {
                let asked_for_revisions = matches!(
                    lookup(decisions, &manuscript.id, referee_id),
                    Some(RefereeDecision::AcceptWithRevisions)
                );
                if has_comments || asked_for_revisions {
                    ManuscriptState::AuthorRevision
                } else {
                    ManuscriptState::CopyEditing
                }
            }
            _ => ManuscriptState::CopyEditing,
        };
    }

    ManuscriptState::SubmitReview
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTransition {
    pub from: ManuscriptState,
    pub to: ManuscriptState,
}

const DONE_TRANSITIONS: [StageTransition; 4] = [
    StageTransition {
        from: ManuscriptState::AuthorRevision,
        to: ManuscriptState::EditorReview,
    },
    StageTransition {
        from: ManuscriptState::CopyEditing,
        to: ManuscriptState::AuthorReview,
    },
    StageTransition {
        from: ManuscriptState::AuthorReview,
        to: ManuscriptState::Formatting,
    },
    StageTransition {
        from: ManuscriptState::Formatting,
        to: ManuscriptState::Published,
    },
];

/// Production-stage moves that are not part of the review table.
pub fn stage_transition(
    state: &ManuscriptState,
    decision: ActorDecision,
) -> Result<ManuscriptState> {
    let invalid = || QuireError::InvalidTransition {
        state: state.clone(),
        decision: decision.as_str().to_string(),
    };
    match decision {
        ActorDecision::Done => DONE_TRANSITIONS
            .iter()
            .find(|transition| transition.from == *state)
            .map(|transition| transition.to.clone())
            .ok_or_else(invalid),
        ActorDecision::Withdraw if !state.is_terminal() => Ok(ManuscriptState::Withdrawn),
        _ => Err(invalid()),
    }
}

pub fn action_for(next: &ManuscriptState) -> ActionCode {
    match next {
        ManuscriptState::Rejected => ActionCode::Reject,
        ManuscriptState::CopyEditing => ActionCode::AcceptedToCopyedit,
        ManuscriptState::AuthorRevision => ActionCode::AcceptWithRevisions,
        ManuscriptState::EditorReview => ActionCode::EditorReview,
        ManuscriptState::SubmitReview => ActionCode::SubmitReview,
        ManuscriptState::Withdrawn => ActionCode::Withdraw,
        ManuscriptState::InReview => ActionCode::SendToReview,
        _ => ActionCode::Done,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub next_state: ManuscriptState,
    pub action: ActionCode,
}

/// Routes a decision to the review table or the stage pipeline.
pub fn resolve(
    manuscript: &Manuscript,
    decision: ActorDecision,
    referee_id: &str,
    has_comments: bool,
    decisions: &DecisionMap,
) -> Result<Resolution> {
    let target = match decision {
        ActorDecision::Done | ActorDecision::Withdraw => {
            stage_transition(&manuscript.state, decision)?
        }
        _ => next_state(manuscript, decision, referee_id, has_comments, decisions),
    };
    Ok(Resolution {
        action: action_for(&target),
        next_state: target,
    })
}

const REFEREE_DECISIONS: [ActorDecision; 4] = [
    ActorDecision::Accept,
    ActorDecision::Reject,
    ActorDecision::AcceptWithRevisions,
    ActorDecision::CommentsSubmitted,
];

pub fn available_decisions(state: &ManuscriptState, role: Role) -> Vec<ActorDecision> {
    match (role, state) {
        (Role::Referee, ManuscriptState::InReview) => REFEREE_DECISIONS.to_vec(),
        (Role::Editor, ManuscriptState::Submitted) => vec![ActorDecision::Reject],
        (
            Role::Editor,
            ManuscriptState::InReview
            | ManuscriptState::EditorReview
            | ManuscriptState::AuthorRevision,
        ) => vec![ActorDecision::Accept, ActorDecision::Reject],
        (Role::Author, ManuscriptState::AuthorRevision | ManuscriptState::AuthorReview) => {
            vec![ActorDecision::Done, ActorDecision::Withdraw]
        }
        (Role::Author, state) if !state.is_terminal() => vec![ActorDecision::Withdraw],
        (Role::CopyEditor, ManuscriptState::CopyEditing)
        | (Role::Formatter, ManuscriptState::Formatting) => vec![ActorDecision::Done],
        _ => Vec::new(),
    }
}
