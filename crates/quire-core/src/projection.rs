use super::comments::all_comments;
use super::completion::is_review_complete_with;
use super::completion::referees_awaiting;
use super::decisions::lookup;
use super::decisions::DecisionMap;
use super::state::ActorDecision;
use super::state::Comment;
use super::state::InlineMessage;
use super::state::Manuscript;
use super::state::ManuscriptId;
use super::state::ManuscriptState;
use super::state::RefereeDecision;
use super::state::ReviewSession;
use super::workflow::available_decisions;

/// Everything a list row needs to render one manuscript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManuscriptView {
    pub id: ManuscriptId,
    pub title: String,
    pub state: ManuscriptState,
    pub expanded: bool,
    pub pending: bool,
    pub review_complete: bool,
    pub awaiting: Vec<String>,
    pub available: Vec<ActorDecision>,
    pub can_act: bool,
    pub viewer_decision: Option<RefereeDecision>,
    pub comment_count: usize,
    /// Only filled for expanded rows.
    pub comments: Vec<Comment>,
    pub message: Option<InlineMessage>,
}

fn viewer_decision(
    session: &ReviewSession,
    manuscript: &Manuscript,
    decisions: &DecisionMap,
) -> Option<RefereeDecision> {
    session
        .viewer
        .referee_keys()
        .find_map(|key| lookup(decisions, &manuscript.id, key))
        .cloned()
}

pub fn project_one(
    session: &ReviewSession,
    manuscript: &Manuscript,
    decisions: &DecisionMap,
) -> ManuscriptView {
    let comments = all_comments(manuscript, session.fetched_comments_for(&manuscript.id));
    let expanded = session.expanded.contains(&manuscript.id);
    let pending = session.any_pending(&manuscript.id);
    let available = available_decisions(&manuscript.state, session.viewer.role);

    ManuscriptView {
        id: manuscript.id.clone(),
        title: manuscript.title.clone(),
        state: manuscript.state.clone(),
        expanded,
        pending,
        review_complete: is_review_complete_with(manuscript, decisions, &comments),
        awaiting: referees_awaiting(manuscript, decisions, &comments)
            .into_iter()
            .map(str::to_string)
            .collect(),
        can_act: !pending && !available.is_empty(),
        available,
        viewer_decision: viewer_decision(session, manuscript, decisions),
        comment_count: comments.len(),
        comments: if expanded { comments } else { Vec::new() },
        message: session.messages.get(&manuscript.id).cloned(),
    }
}

pub fn project(session: &ReviewSession, decisions: &DecisionMap) -> Vec<ManuscriptView> {
    session
        .manuscripts
        .iter()
        .map(|manuscript| project_one(session, manuscript, decisions))
        .collect()
}
