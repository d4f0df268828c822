use pretty_assertions::assert_eq;

pub(super) use super::reduce;
pub(super) use super::DecisionSubmission;
pub(super) use super::ReviewEffect;
pub(super) use crate::actions::ReviewAction;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::UserAction;
pub(super) use crate::decisions::DecisionMap;
pub(super) use crate::projection::project;
pub(super) use crate::roles::Role;
pub(super) use crate::state::ActingUser;
pub(super) use crate::state::ActorDecision;
pub(super) use crate::state::InlineMessage;
pub(super) use crate::state::Manuscript;
pub(super) use crate::state::ManuscriptId;
pub(super) use crate::state::ManuscriptState;
pub(super) use crate::state::MessageLevel;
pub(super) use crate::state::OperationKind;
pub(super) use crate::state::PendingKey;
pub(super) use crate::state::RawComment;
pub(super) use crate::state::RefereeDecision;
pub(super) use crate::state::ReviewSession;

mod projection_matrix;

fn id(raw: &str) -> ManuscriptId {
    ManuscriptId::new(raw)
}

fn manuscript(raw_id: &str, state: ManuscriptState, referees: &[&str]) -> Manuscript {
    let mut manuscript = Manuscript::new(raw_id, state);
    manuscript.title = format!("Manuscript {raw_id}");
    for referee in referees {
        manuscript.add_referee(referee);
    }
    manuscript
}

fn session_as(role: Role, manuscripts: Vec<Manuscript>) -> ReviewSession {
    let mut viewer = ActingUser::new("u1", role);
    viewer.email = Some("u1@example.org".to_string());
    let mut session = ReviewSession::new(viewer);
    run_runtime(&mut session, RuntimeAction::ManuscriptsLoaded(manuscripts));
    session
}

fn run_user(session: &mut ReviewSession, action: UserAction) -> Vec<ReviewEffect> {
    reduce(session, ReviewAction::User(action))
}

fn run_runtime(session: &mut ReviewSession, action: RuntimeAction) {
    let effects = reduce(session, ReviewAction::Runtime(action));
    assert!(effects.is_empty());
}

fn select(session: &mut ReviewSession, raw_id: &str, decision: ActorDecision) {
    let effects = run_user(
        session,
        UserAction::SelectDecision {
            manuscript_id: id(raw_id),
            decision,
        },
    );
    assert!(effects.is_empty());
}

fn write_comment(session: &mut ReviewSession, raw_id: &str, text: &str) {
    let effects = run_user(
        session,
        UserAction::SetCommentDraft {
            manuscript_id: id(raw_id),
            text: text.to_string(),
        },
    );
    assert!(effects.is_empty());
}

fn submit(session: &mut ReviewSession, raw_id: &str) -> Vec<ReviewEffect> {
    run_user(
        session,
        UserAction::SubmitDecision {
            manuscript_id: id(raw_id),
        },
    )
}

fn assert_error(session: &ReviewSession, raw_id: &str, text: &str) {
    assert_eq!(
        session.messages.get(&id(raw_id)),
        Some(&InlineMessage::error(text))
    );
}
