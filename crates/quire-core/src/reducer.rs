use super::actions::ReviewAction;
use super::actions::RuntimeAction;
use super::actions::UserAction;
use super::roles::Role;
use super::state::ActorDecision;
use super::state::InlineMessage;
use super::state::ManuscriptId;
use super::state::OperationKind;
use super::state::PendingKey;
use super::state::ReviewSession;
use super::workflow::available_decisions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionSubmission {
    pub manuscript_id: ManuscriptId,
    pub referee_id: String,
    pub decision: ActorDecision,
    pub comment: Option<String>,
}

/// Work the orchestrator has to perform on behalf of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewEffect {
    SubmitDecision(DecisionSubmission),
    AdvanceStage {
        manuscript_id: ManuscriptId,
        decision: ActorDecision,
    },
    AssignReferee {
        manuscript_id: ManuscriptId,
        referee_id: String,
    },
    PostComment {
        manuscript_id: ManuscriptId,
        text: String,
    },
    LoadComments(ManuscriptId),
}

pub fn reduce(session: &mut ReviewSession, action: ReviewAction) -> Vec<ReviewEffect> {
    match action {
        ReviewAction::User(user) => reduce_user(session, user),
        ReviewAction::Runtime(runtime) => {
            reduce_runtime(session, runtime);
            Vec::new()
        }
    }
}

fn reduce_user(session: &mut ReviewSession, action: UserAction) -> Vec<ReviewEffect> {
    match action {
        UserAction::ToggleExpanded(id) => {
            if session.expanded.remove(&id) {
                return Vec::new();
            }
            if session.manuscript(&id).is_none() {
                return Vec::new();
            }
            session.expanded.insert(id.clone());
            vec![ReviewEffect::LoadComments(id)]
        }
        UserAction::CollapseAll => {
            session.expanded.clear();
            Vec::new()
        }
        UserAction::SelectDecision {
            manuscript_id,
            decision,
        } => {
            session.drafts.entry(manuscript_id.clone()).or_default().decision = Some(decision);
            session.messages.remove(&manuscript_id);
            Vec::new()
        }
        UserAction::SetCommentDraft {
            manuscript_id,
            text,
        } => {
            session.drafts.entry(manuscript_id).or_default().comment = text;
            Vec::new()
        }
        UserAction::SetDraftReferee {
            manuscript_id,
            referee_id,
        } => {
            session.drafts.entry(manuscript_id).or_default().referee_id = Some(referee_id);
            Vec::new()
        }
        UserAction::SubmitDecision { manuscript_id } => submit_decision(session, manuscript_id),
        UserAction::MarkDone(manuscript_id) => {
            request_stage(session, manuscript_id, ActorDecision::Done)
        }
        UserAction::Withdraw(manuscript_id) => {
            request_stage(session, manuscript_id, ActorDecision::Withdraw)
        }
        UserAction::AssignReferee {
            manuscript_id,
            referee_id,
        } => assign_referee(session, manuscript_id, referee_id),
        UserAction::PostComment { manuscript_id } => post_comment(session, manuscript_id),
        UserAction::DismissMessage(manuscript_id) => {
            session.messages.remove(&manuscript_id);
            Vec::new()
        }
        UserAction::Unmount => {
            session.mounted = false;
            session.pending.clear();
            Vec::new()
        }
    }
}

fn reject(session: &mut ReviewSession, id: &ManuscriptId, text: String) -> Vec<ReviewEffect> {
    session.messages.insert(id.clone(), InlineMessage::error(text));
    Vec::new()
}

/// Marks the control busy, or reports that it already is.
fn begin(session: &mut ReviewSession, id: &ManuscriptId, operation: OperationKind) -> bool {
    let fresh = session
        .pending
        .insert(PendingKey::new(id.clone(), operation));
    if fresh {
        session.messages.remove(id);
    }
    fresh
}

/// The key a decision is recorded under when the viewer is the referee.
fn viewer_referee_key(session: &ReviewSession, id: &ManuscriptId) -> String {
    let assigned = session.manuscript(id).and_then(|manuscript| {
        session
            .viewer
            .referee_keys()
            .find(|key| manuscript.has_referee(key))
            .map(str::to_string)
    });
    assigned.unwrap_or_else(|| session.viewer.id.clone())
}

fn submit_decision(session: &mut ReviewSession, id: ManuscriptId) -> Vec<ReviewEffect> {
    let Some(manuscript) = session.manuscript(&id) else {
        return reject(session, &id, format!("Manuscript {id} is no longer listed."));
    };
    if session.is_pending(&id, OperationKind::Decide) {
        return Vec::new();
    }
    let state = manuscript.state.clone();
    let draft = session.drafts.get(&id).cloned().unwrap_or_default();
    let Some(decision) = draft.decision else {
        return reject(session, &id, "Select a decision before submitting.".to_string());
    };
    if matches!(decision, ActorDecision::Done | ActorDecision::Withdraw) {
        return request_stage(session, id, decision);
    }
    if !available_decisions(&state, session.viewer.role).contains(&decision) {
        return reject(
            session,
            &id,
            format!(
                "{} is not available while the manuscript is in {}.",
                decision.label(),
                state.label()
            ),
        );
    }
    let comment = Some(draft.comment.trim().to_string()).filter(|text| !text.is_empty());
    if decision == ActorDecision::CommentsSubmitted && comment.is_none() {
        return reject(session, &id, "Write a comment before submitting comments only.".to_string());
    }

    let referee_id = match session.viewer.role {
        Role::Referee => viewer_referee_key(session, &id),
        _ => draft
            .referee_id
            .filter(|referee| !referee.trim().is_empty())
            .unwrap_or_else(|| session.viewer.id.clone()),
    };

    begin(session, &id, OperationKind::Decide);
    vec![ReviewEffect::SubmitDecision(DecisionSubmission {
        manuscript_id: id,
        referee_id,
        decision,
        comment,
    })]
}

fn request_stage(
    session: &mut ReviewSession,
    id: ManuscriptId,
    decision: ActorDecision,
) -> Vec<ReviewEffect> {
    let Some(manuscript) = session.manuscript(&id) else {
        return reject(session, &id, format!("Manuscript {id} is no longer listed."));
    };
    let state = manuscript.state.clone();
    if !available_decisions(&state, session.viewer.role).contains(&decision) {
        return reject(
            session,
            &id,
            format!(
                "{} is not available while the manuscript is in {}.",
                decision.label(),
                state.label()
            ),
        );
    }
    let operation = match decision {
        ActorDecision::Withdraw => OperationKind::Withdraw,
        _ => OperationKind::Done,
    };
    if !begin(session, &id, operation) {
        return Vec::new();
    }
    vec![ReviewEffect::AdvanceStage {
        manuscript_id: id,
        decision,
    }]
}

fn assign_referee(
    session: &mut ReviewSession,
    id: ManuscriptId,
    referee_id: String,
) -> Vec<ReviewEffect> {
    let referee_id = referee_id.trim().to_string();
    let Some(manuscript) = session.manuscript(&id) else {
        return reject(session, &id, format!("Manuscript {id} is no longer listed."));
    };
    if session.viewer.role != Role::Editor {
        return reject(session, &id, "Only editors can assign referees.".to_string());
    }
    if referee_id.is_empty() {
        return reject(session, &id, "Enter a referee email or id.".to_string());
    }
    if manuscript.state.is_terminal() {
        let text = format!(
            "Cannot assign referees while the manuscript is {}.",
            manuscript.state.label()
        );
        return reject(session, &id, text);
    }
    if manuscript.has_referee(&referee_id) {
        session.messages.insert(
            id,
            InlineMessage::info(format!("{referee_id} is already a referee.")),
        );
        return Vec::new();
    }
    if !begin(session, &id, OperationKind::AssignReferee) {
        return Vec::new();
    }
    vec![ReviewEffect::AssignReferee {
        manuscript_id: id,
        referee_id,
    }]
}

fn post_comment(session: &mut ReviewSession, id: ManuscriptId) -> Vec<ReviewEffect> {
    if session.manuscript(&id).is_none() {
        return reject(session, &id, format!("Manuscript {id} is no longer listed."));
    }
    let text = session
        .drafts
        .get(&id)
        .map(|draft| draft.comment.trim().to_string())
        .unwrap_or_default();
    if text.is_empty() {
        return reject(session, &id, "Comment text is empty.".to_string());
    }
    if !begin(session, &id, OperationKind::Comment) {
        return Vec::new();
    }
    vec![ReviewEffect::PostComment {
        manuscript_id: id,
        text,
    }]
}

fn reduce_runtime(session: &mut ReviewSession, action: RuntimeAction) {
    // Results that land after the view is gone are dropped.
    if !session.mounted {
        return;
    }
    match action {
        RuntimeAction::ManuscriptsLoaded(manuscripts) => {
            session.manuscripts = manuscripts;
            let listed: Vec<ManuscriptId> = session
                .manuscripts
                .iter()
                .map(|manuscript| manuscript.id.clone())
                .collect();
            session.expanded.retain(|id| listed.contains(id));
            session.drafts.retain(|id, _| listed.contains(id));
            session.messages.retain(|id, _| listed.contains(id));
            session.fetched_comments.retain(|id, _| listed.contains(id));
            session
                .pending
                .retain(|key| listed.contains(&key.manuscript_id));
        }
        RuntimeAction::CommentsLoaded {
            manuscript_id,
            comments,
        } => {
            if session.manuscript(&manuscript_id).is_some() {
                session.fetched_comments.insert(manuscript_id, comments);
            }
        }
        RuntimeAction::OperationSucceeded { key, message } => {
            session.pending.remove(&key);
            if session.manuscript(&key.manuscript_id).is_none() {
                return;
            }
            match key.operation {
                OperationKind::Decide => {
                    session.drafts.remove(&key.manuscript_id);
                }
                OperationKind::Comment => {
                    if let Some(draft) = session.drafts.get_mut(&key.manuscript_id) {
                        draft.comment.clear();
                    }
                }
                OperationKind::Done | OperationKind::Withdraw | OperationKind::AssignReferee => {}
            }
            match message {
                Some(text) => {
                    session
                        .messages
                        .insert(key.manuscript_id, InlineMessage::info(text));
                }
                None => {
                    session.messages.remove(&key.manuscript_id);
                }
            }
        }
        RuntimeAction::OperationFailed { key, message } => {
            session.pending.remove(&key);
            if session.manuscript(&key.manuscript_id).is_some() {
                session
                    .messages
                    .insert(key.manuscript_id, InlineMessage::error(message));
            }
        }
    }
}

#[cfg(test)]
mod tests;
