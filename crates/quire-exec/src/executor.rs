use serde_json::json;

use quire_core::actions::ReviewAction;
use quire_core::actions::RuntimeAction;
use quire_core::comments::all_comments;
use quire_core::decisions::DecisionMap;
use quire_core::decisions::DecisionStore;
use quire_core::monitor::AutoAdvanceMonitor;
use quire_core::persistence::save_manuscripts;
use quire_core::persistence::LocalCache;
use quire_core::reducer::reduce;
use quire_core::reducer::DecisionSubmission;
use quire_core::reducer::ReviewEffect;
use quire_core::roles::is_duplicate_role_error;
use quire_core::roles::Role;
use quire_core::state::ActingUser;
use quire_core::state::ActionCode;
use quire_core::state::ActorDecision;
use quire_core::state::Manuscript;
use quire_core::state::ManuscriptId;
use quire_core::state::ManuscriptState;
use quire_core::state::OperationKind;
use quire_core::state::PendingKey;
use quire_core::state::RawComment;
use quire_core::state::ReviewSession;
use quire_core::workflow::resolve;
use quire_core::workflow::Resolution;

use crate::contracts::ApiResult;
use crate::contracts::Backend;
use crate::contracts::NewComment;
use crate::retry::RetryPolicy;

/// Performs the I/O behind every effect the reducer asks for.
pub struct WorkflowExecutor<B, C> {
    backend: B,
    store: DecisionStore<C>,
    monitor: AutoAdvanceMonitor,
    retry: RetryPolicy,
}

impl<B: Backend, C: LocalCache> WorkflowExecutor<B, C> {
    pub fn new(backend: B, cache: C, retry: RetryPolicy) -> Self {
        Self {
            backend,
            store: DecisionStore::load(cache),
            monitor: AutoAdvanceMonitor::new(),
            retry,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn decisions(&self) -> &DecisionMap {
        self.store.decisions()
    }

    pub fn store(&self) -> &DecisionStore<C> {
        &self.store
    }

    /// Runs `action` through the reducer and performs whatever it asks for.
    pub fn dispatch(&mut self, session: &mut ReviewSession, action: ReviewAction) {
        for effect in reduce(session, action) {
            self.perform(session, effect);
        }
    }

    fn perform(&mut self, session: &mut ReviewSession, effect: ReviewEffect) {
        match effect {
            ReviewEffect::LoadComments(id) => {
                self.load_comments(session, &id);
            }
            ReviewEffect::SubmitDecision(submission) => {
                let key = PendingKey::new(submission.manuscript_id.clone(), OperationKind::Decide);
                let outcome = self
                    .submit_decision(session, &submission)
                    .map(|resolution| {
                        format!(
                            "{} recorded. Manuscript moves to {}.",
                            submission.decision.label(),
                            resolution.next_state.label()
                        )
                    });
                self.settle(session, key, outcome);
            }
            ReviewEffect::AdvanceStage {
                manuscript_id,
                decision,
            } => {
                let operation = match decision {
                    ActorDecision::Withdraw => OperationKind::Withdraw,
                    _ => OperationKind::Done,
                };
                let key = PendingKey::new(manuscript_id.clone(), operation);
                let outcome = self
                    .advance_stage(session, &manuscript_id, decision)
                    .map(|next| format!("Manuscript moved to {}.", next.label()));
                self.settle(session, key, outcome);
            }
            ReviewEffect::AssignReferee {
                manuscript_id,
                referee_id,
            } => {
                let key = PendingKey::new(manuscript_id.clone(), OperationKind::AssignReferee);
                let outcome = self
                    .assign_referee(session, &manuscript_id, &referee_id)
                    .map(|_| format!("{referee_id} assigned as referee."));
                self.settle(session, key, outcome);
            }
            ReviewEffect::PostComment {
                manuscript_id,
                text,
            } => {
                let key = PendingKey::new(manuscript_id.clone(), OperationKind::Comment);
                let outcome = self
                    .post_comment(session, &manuscript_id, &text)
                    .map(|_| "Comment posted.".to_string());
                self.settle(session, key, outcome);
            }
        }
    }

    fn settle(&mut self, session: &mut ReviewSession, key: PendingKey, outcome: ApiResult<String>) {
        let action = match outcome {
            Ok(message) => RuntimeAction::OperationSucceeded {
                key,
                message: Some(message),
            },
            Err(err) => {
                tracing::warn!(
                    manuscript = %key.manuscript_id,
                    operation = key.operation.label(),
                    error = %err,
                    "operation failed"
                );
                RuntimeAction::OperationFailed {
                    key,
                    message: err.message(),
                }
            }
        };
        reduce(session, ReviewAction::Runtime(action));
    }

    /// Re-fetches the manuscript list, then gives the auto-advance monitor a
    /// look at it.
    pub fn refresh(&mut self, session: &mut ReviewSession) -> ApiResult<()> {
        let manuscripts = self.reload(session)?;
        self.run_auto_advance(session, &manuscripts);
        Ok(())
    }

    fn reload(&mut self, session: &mut ReviewSession) -> ApiResult<Vec<Manuscript>> {
        let manuscripts = self.backend.list_manuscripts()?;
        self.store.absorb(&manuscripts);
        if let Err(err) = save_manuscripts(self.store.cache_mut(), &manuscripts) {
            tracing::warn!(error = %err, "failed to cache manuscript list");
        }
        tracing::debug!(count = manuscripts.len(), "manuscripts loaded");
        reduce(
            session,
            ReviewAction::Runtime(RuntimeAction::ManuscriptsLoaded(manuscripts.clone())),
        );
        Ok(manuscripts)
    }

    /// Fires ACCEPTED_TO_COPYEDIT for every unanimously accepted manuscript.
    /// Failures are logged only; nobody is waiting on this. Returns how many
    /// transitions were sent.
    ///
    /// A failed advance is not retried until the manuscripts or decisions
    /// change, because the monitor has already seen those inputs.
    pub fn run_auto_advance(
        &mut self,
        session: &mut ReviewSession,
        manuscripts: &[Manuscript],
    ) -> usize {
        let requests = self.monitor.observe(manuscripts, self.store.decisions());
        if requests.is_empty() {
            return 0;
        }
        for request in &requests {
            match self
                .backend
                .update_state(&request.manuscript_id, request.action, None)
            {
                Ok(()) => tracing::info!(
                    manuscript = %request.manuscript_id,
                    action = %request.action,
                    "all referees accepted, advanced automatically"
                ),
                Err(err) => tracing::warn!(
                    manuscript = %request.manuscript_id,
                    error = %err,
                    "automatic advance failed"
                ),
            }
        }
        if let Err(err) = self.reload(session) {
            tracing::warn!(error = %err, "refresh after automatic advance failed");
        }
        requests.len()
    }

    fn fetch_comments(&self, id: &ManuscriptId) -> Vec<RawComment> {
        match self
            .retry
            .run("load comments", || self.backend.list_comments(id))
        {
            Ok(comments) => comments,
            Err(err) => {
                tracing::warn!(manuscript = %id, error = %err, "comments unavailable, showing none");
                Vec::new()
            }
        }
    }

    pub fn load_comments(&mut self, session: &mut ReviewSession, id: &ManuscriptId) {
        let comments = self.fetch_comments(id);
        reduce(
            session,
            ReviewAction::Runtime(RuntimeAction::CommentsLoaded {
                manuscript_id: id.clone(),
                comments,
            }),
        );
    }

    /// The listed copy when we have one, else a fresh fetch.
    fn current(&self, session: &ReviewSession, id: &ManuscriptId) -> ApiResult<Manuscript> {
        match session.manuscript(id) {
            Some(manuscript) => Ok(manuscript.clone()),
            None => self.backend.get_manuscript(id),
        }
    }

    /// A 403 from the comments service gets one retry that names the
    /// author's role.
    fn create_comment(&self, viewer: &ActingUser, id: &ManuscriptId, text: &str) -> ApiResult<()> {
        let comment = NewComment {
            manuscript_id: id.clone(),
            author_id: viewer.id.clone(),
            text: text.to_string(),
            author_role: None,
        };
        match self.backend.create_comment(&comment) {
            Err(err) if err.is_forbidden() => {
                tracing::warn!(manuscript = %id, "comment refused, retrying with role");
                self.backend.create_comment(&NewComment {
                    author_role: Some(viewer.role),
                    ..comment
                })
            }
            other => other,
        }
    }

    pub fn post_comment(
        &mut self,
        session: &mut ReviewSession,
        id: &ManuscriptId,
        text: &str,
    ) -> ApiResult<()> {
        let viewer = session.viewer.clone();
        self.create_comment(&viewer, id, text)?;
        self.load_comments(session, id);
        Ok(())
    }

    /// Record, comment, resolve, transition, refresh. The decision is kept
    /// locally whichever remote call fails. Resolution reads the decisions
    /// as they stood before this one was recorded.
    pub fn submit_decision(
        &mut self,
        session: &mut ReviewSession,
        submission: &DecisionSubmission,
    ) -> ApiResult<Resolution> {
        let id = &submission.manuscript_id;
        let viewer = session.viewer.clone();
        let prior = self.store.decisions().clone();
        if let Some(decision) = submission.decision.as_referee_decision() {
            self.store
                .record_decision(id, &submission.referee_id, decision);
        }
        if let Some(text) = &submission.comment {
            self.create_comment(&viewer, id, text)?;
        }

        let fetched = self.fetch_comments(id);
        let manuscript = self.current(session, id)?;
        let has_comments = !all_comments(&manuscript, &fetched).is_empty();
        reduce(
            session,
            ReviewAction::Runtime(RuntimeAction::CommentsLoaded {
                manuscript_id: id.clone(),
                comments: fetched,
            }),
        );

        let resolution = resolve(
            &manuscript,
            submission.decision,
            &submission.referee_id,
            has_comments,
            &prior,
        )?;
        tracing::info!(
            manuscript = %id,
            referee = %submission.referee_id,
            decision = submission.decision.as_str(),
            next = resolution.next_state.as_str(),
            "decision resolved"
        );

        let payload = json!({
            "referee_id": submission.referee_id,
            "decision": submission.decision.as_str(),
            "next_state": resolution.next_state.as_str(),
        });
        self.backend
            .update_state(id, resolution.action, Some(payload))?;
        self.refresh(session)?;
        Ok(resolution)
    }

    /// DONE and WITHDRAW, outside the review table.
    pub fn advance_stage(
        &mut self,
        session: &mut ReviewSession,
        id: &ManuscriptId,
        decision: ActorDecision,
    ) -> ApiResult<ManuscriptState> {
        let manuscript = self.current(session, id)?;
        let resolution = resolve(
            &manuscript,
            decision,
            &session.viewer.id,
            false,
            self.store.decisions(),
        )?;
        self.backend.update_state(id, resolution.action, None)?;
        self.refresh(session)?;
        Ok(resolution.next_state)
    }

    /// Grants the referee role, then lists the referee on the manuscript.
    /// A submitted manuscript is sent to review once it has a referee.
    pub fn assign_referee(
        &mut self,
        session: &mut ReviewSession,
        id: &ManuscriptId,
        referee_id: &str,
    ) -> ApiResult<()> {
        match self.backend.assign_role(referee_id, Role::Referee) {
            Ok(()) => {}
            Err(err) if is_duplicate_role_error(&err.message()) => {
                tracing::debug!(referee = referee_id, "referee role already granted");
            }
            Err(err) => return Err(err),
        }

        let mut manuscript = self.current(session, id)?;
        if manuscript.add_referee(referee_id) {
            self.backend.update_manuscript(&manuscript)?;
        }
        if manuscript.state == ManuscriptState::Submitted {
            self.backend
                .update_state(id, ActionCode::SendToReview, None)?;
        }
        self.refresh(session)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::contracts::ApiError;
    use crate::contracts::PeopleApi;
    use crate::simulated::BackendCall;
    use crate::simulated::Endpoint;
    use crate::simulated::SimulatedBackend;
    use quire_core::actions::UserAction;
    use quire_core::persistence::MemoryCache;
    use quire_core::persistence::REFEREE_DECISIONS_KEY;
    use quire_core::state::MessageLevel;
    use quire_core::state::RefereeDecision;

    fn id(raw: &str) -> ManuscriptId {
        ManuscriptId::new(raw)
    }

    fn manuscript(raw_id: &str, state: ManuscriptState, referees: &[&str]) -> Manuscript {
        let mut manuscript = Manuscript::new(raw_id, state);
        for referee in referees {
            manuscript.add_referee(referee);
        }
        manuscript
    }

    fn executor(
        manuscripts: Vec<Manuscript>,
        cache: MemoryCache,
    ) -> WorkflowExecutor<SimulatedBackend, MemoryCache> {
        WorkflowExecutor::new(
            SimulatedBackend::with_manuscripts(manuscripts),
            cache,
            RetryPolicy {
                retries: 2,
                delay: std::time::Duration::ZERO,
            },
        )
    }

    fn session(role: Role) -> ReviewSession {
        ReviewSession::new(ActingUser::new("r1", role))
    }

    fn transitions(backend: &SimulatedBackend) -> Vec<(ManuscriptId, ActionCode)> {
        backend
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::UpdateState {
                    manuscript_id,
                    action,
                } => Some((manuscript_id, action)),
                _ => None,
            })
            .collect()
    }

    fn submit(
        executor: &mut WorkflowExecutor<SimulatedBackend, MemoryCache>,
        session: &mut ReviewSession,
        raw_id: &str,
        decision: ActorDecision,
        comment: &str,
    ) {
        executor.dispatch(
            session,
            ReviewAction::User(UserAction::SelectDecision {
                manuscript_id: id(raw_id),
                decision,
            }),
        );
        executor.dispatch(
            session,
            ReviewAction::User(UserAction::SetCommentDraft {
                manuscript_id: id(raw_id),
                text: comment.to_string(),
            }),
        );
        executor.dispatch(
            session,
            ReviewAction::User(UserAction::SubmitDecision {
                manuscript_id: id(raw_id),
            }),
        );
    }

    #[test]
    fn referee_accept_without_comments_goes_to_copy_editing() {
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::InReview, &["r1", "r2"])],
            MemoryCache::new(),
        );
        let mut session = session(Role::Referee);
        executor.refresh(&mut session).expect("refresh");

        submit(&mut executor, &mut session, "m1", ActorDecision::Accept, "");

        assert_eq!(
            transitions(executor.backend()),
            vec![(id("m1"), ActionCode::AcceptedToCopyedit)]
        );
        assert_eq!(
            executor.store().get_decision(&id("m1"), "r1"),
            Some(&RefereeDecision::Accept)
        );
        assert!(session.pending.is_empty());
        assert_eq!(
            session.manuscript(&id("m1")).map(|m| m.state.clone()),
            Some(ManuscriptState::CopyEditing)
        );
    }

    #[test]
    fn accept_with_comment_routes_to_author_revision() {
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::InReview, &["r1"])],
            MemoryCache::new(),
        );
        let mut session = session(Role::Referee);
        executor.refresh(&mut session).expect("refresh");

        submit(
            &mut executor,
            &mut session,
            "m1",
            ActorDecision::Accept,
            "Please expand section 4.",
        );

        let calls = executor.backend().calls();
        assert!(calls.iter().any(|call| matches!(
            call,
            BackendCall::CreateComment(comment) if comment.text == "Please expand section 4."
        )));
        assert_eq!(
            transitions(executor.backend()),
            vec![(id("m1"), ActionCode::AcceptWithRevisions)]
        );
    }

    #[test]
    fn forbidden_comment_is_retried_once_with_role() {
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::InReview, &["r1"])],
            MemoryCache::new(),
        );
        let mut session = session(Role::Referee);
        executor.refresh(&mut session).expect("refresh");
        executor.backend().fail_next(
            Endpoint::CreateComment,
            ApiError::Status {
                status: 403,
                message: "forbidden".to_string(),
            },
        );

        submit(&mut executor, &mut session, "m1", ActorDecision::Reject, "Flawed.");

        let roles: Vec<Option<Role>> = executor
            .backend()
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::CreateComment(comment) => Some(comment.author_role),
                _ => None,
            })
            .collect();
        assert_eq!(roles, vec![None, Some(Role::Referee)]);
        assert_eq!(
            transitions(executor.backend()),
            vec![(id("m1"), ActionCode::Reject)]
        );
    }

    #[test]
    fn failed_transition_still_records_decision_and_reports_inline() {
        let cache = MemoryCache::new();
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::InReview, &["r1"])],
            cache,
        );
        let mut session = session(Role::Referee);
        executor.refresh(&mut session).expect("refresh");
        executor.backend().fail_next(
            Endpoint::UpdateState,
            ApiError::Status {
                status: 500,
                message: "Failed to update manuscript state".to_string(),
            },
        );

        submit(&mut executor, &mut session, "m1", ActorDecision::Reject, "");

        assert_eq!(
            executor.store().get_decision(&id("m1"), "r1"),
            Some(&RefereeDecision::Reject)
        );
        let persisted = executor
            .store()
            .cache()
            .read(REFEREE_DECISIONS_KEY)
            .expect("persisted");
        assert!(persisted.contains("REJECT"));
        let message = session.messages.get(&id("m1")).expect("message");
        assert_eq!(message.level, MessageLevel::Error);
        assert_eq!(message.text, "Failed to update manuscript state");
        assert!(session.pending.is_empty());
    }

    #[test]
    fn failed_comment_post_still_records_decision() {
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::InReview, &["r1"])],
            MemoryCache::new(),
        );
        let mut session = session(Role::Referee);
        executor.refresh(&mut session).expect("refresh");
        executor.backend().fail_next(
            Endpoint::CreateComment,
            ApiError::Status {
                status: 500,
                message: "down".to_string(),
            },
        );

        submit(&mut executor, &mut session, "m1", ActorDecision::Reject, "Flawed");

        assert_eq!(
            executor.store().get_decision(&id("m1"), "r1"),
            Some(&RefereeDecision::Reject)
        );
        let persisted = executor
            .store()
            .cache()
            .read(REFEREE_DECISIONS_KEY)
            .expect("persisted");
        assert!(persisted.contains("REJECT"));
        assert_eq!(transitions(executor.backend()), Vec::new());
        let message = session.messages.get(&id("m1")).expect("message");
        assert_eq!(message.level, MessageLevel::Error);
        assert_eq!(message.text, "down");
        assert!(session.pending.is_empty());
    }

    #[test]
    fn accept_after_asking_for_revisions_still_routes_to_author_revision() {
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::InReview, &["r1"])],
            MemoryCache::new(),
        );
        let mut session = session(Role::Referee);
        executor.refresh(&mut session).expect("refresh");

        submit(
            &mut executor,
            &mut session,
            "m1",
            ActorDecision::AcceptWithRevisions,
            "",
        );
        submit(&mut executor, &mut session, "m1", ActorDecision::Accept, "");

        assert_eq!(
            transitions(executor.backend()),
            vec![
                (id("m1"), ActionCode::SubmitReview),
                (id("m1"), ActionCode::AcceptWithRevisions),
            ]
        );
        assert_eq!(
            executor.store().get_decision(&id("m1"), "r1"),
            Some(&RefereeDecision::Accept)
        );
    }

    #[test]
    fn comment_fetch_retries_then_degrades_to_empty() {
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::InReview, &["r1"])],
            MemoryCache::new(),
        );
        let mut session = session(Role::Referee);
        executor.refresh(&mut session).expect("refresh");
        for _ in 0..3 {
            executor.backend().fail_next(
                Endpoint::ListComments,
                ApiError::Transport("timed out".to_string()),
            );
        }

        executor.dispatch(
            &mut session,
            ReviewAction::User(UserAction::ToggleExpanded(id("m1"))),
        );

        let fetches = executor
            .backend()
            .calls()
            .into_iter()
            .filter(|call| matches!(call, BackendCall::ListComments(_)))
            .count();
        assert_eq!(fetches, 3);
        assert_eq!(session.fetched_comments.get(&id("m1")), Some(&Vec::new()));
    }

    #[test]
    fn unanimous_accept_fires_exactly_one_transition() {
        let cached = r#"{"m1": {"r1": "ACCEPT", "r2": "ACCEPT"}}"#;
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::InReview, &["r1", "r2"])],
            MemoryCache::new().with_entry(REFEREE_DECISIONS_KEY, cached),
        );
        let mut session = session(Role::Editor);

        executor.refresh(&mut session).expect("refresh");
        executor.refresh(&mut session).expect("refresh again");

        assert_eq!(
            transitions(executor.backend()),
            vec![(id("m1"), ActionCode::AcceptedToCopyedit)]
        );
        assert_eq!(
            session.manuscript(&id("m1")).map(|m| m.state.clone()),
            Some(ManuscriptState::CopyEditing)
        );
    }

    #[test]
    fn split_decision_does_not_auto_advance() {
        let cached = r#"{"m1": {"r1": "ACCEPT", "r2": "REJECT"}}"#;
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::InReview, &["r1", "r2"])],
            MemoryCache::new().with_entry(REFEREE_DECISIONS_KEY, cached),
        );
        let mut session = session(Role::Editor);

        executor.refresh(&mut session).expect("refresh");

        assert!(transitions(executor.backend()).is_empty());
    }

    #[test]
    fn failed_auto_advance_is_logged_not_surfaced() {
        let cached = r#"{"m1": {"r1": "ACCEPT"}}"#;
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::InReview, &["r1"])],
            MemoryCache::new().with_entry(REFEREE_DECISIONS_KEY, cached),
        );
        executor.backend().fail_next(
            Endpoint::UpdateState,
            ApiError::Status {
                status: 500,
                message: "boom".to_string(),
            },
        );
        let mut session = session(Role::Editor);

        executor.refresh(&mut session).expect("refresh");

        assert_eq!(transitions(executor.backend()).len(), 1);
        assert!(session.messages.is_empty());
        assert_eq!(
            session.manuscript(&id("m1")).map(|m| m.state.clone()),
            Some(ManuscriptState::InReview)
        );
    }

    #[test]
    fn failed_auto_advance_waits_for_changed_inputs() {
        let cached = r#"{"m1": {"r1": "ACCEPT"}}"#;
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::InReview, &["r1"])],
            MemoryCache::new().with_entry(REFEREE_DECISIONS_KEY, cached),
        );
        executor.backend().fail_next(
            Endpoint::UpdateState,
            ApiError::Status {
                status: 500,
                message: "boom".to_string(),
            },
        );
        let mut session = session(Role::Editor);

        executor.refresh(&mut session).expect("refresh");
        executor.refresh(&mut session).expect("second refresh");

        assert_eq!(transitions(executor.backend()).len(), 1);
    }

    #[test]
    fn server_decisions_merge_without_overwriting_local() {
        let mut listed = manuscript("m1", ManuscriptState::InReview, &["r1", "r2"]);
        listed
            .referee_decisions
            .insert("r1".to_string(), RefereeDecision::Reject);
        listed
            .referee_decisions
            .insert("r2".to_string(), RefereeDecision::AcceptWithRevisions);
        let mut executor = executor(
            vec![listed],
            MemoryCache::new().with_entry(REFEREE_DECISIONS_KEY, r#"{"m1": {"r1": "ACCEPT"}}"#),
        );
        let mut session = session(Role::Editor);

        executor.refresh(&mut session).expect("refresh");

        assert_eq!(
            executor.store().get_decision(&id("m1"), "r1"),
            Some(&RefereeDecision::Accept)
        );
        assert_eq!(
            executor.store().get_decision(&id("m1"), "r2"),
            Some(&RefereeDecision::AcceptWithRevisions)
        );
    }

    #[test]
    fn duplicate_role_counts_as_success_and_submitted_goes_to_review() {
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::Submitted, &[])],
            MemoryCache::new(),
        );
        executor
            .backend()
            .assign_role("r9@example.org", Role::Referee)
            .expect("pre-grant");
        executor.backend().clear_calls();
        let mut session = session(Role::Editor);
        executor.refresh(&mut session).expect("refresh");

        executor.dispatch(
            &mut session,
            ReviewAction::User(UserAction::AssignReferee {
                manuscript_id: id("m1"),
                referee_id: "r9@example.org".to_string(),
            }),
        );

        let stored = executor.backend().manuscript(&id("m1")).expect("stored");
        assert_eq!(stored.referees, vec!["r9@example.org".to_string()]);
        assert_eq!(stored.state, ManuscriptState::InReview);
        assert_eq!(
            session.messages.get(&id("m1")).map(|message| message.level),
            Some(MessageLevel::Info)
        );
    }

    #[test]
    fn withdraw_moves_to_withdrawn() {
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::EditorReview, &["r2"])],
            MemoryCache::new(),
        );
        let mut session = session(Role::Author);
        executor.refresh(&mut session).expect("refresh");

        executor.dispatch(
            &mut session,
            ReviewAction::User(UserAction::Withdraw(id("m1"))),
        );

        assert_eq!(
            transitions(executor.backend()),
            vec![(id("m1"), ActionCode::Withdraw)]
        );
        assert_eq!(
            session.manuscript(&id("m1")).map(|m| m.state.clone()),
            Some(ManuscriptState::Withdrawn)
        );
    }

    #[test]
    fn posted_comment_is_reloaded_into_the_session() {
        let mut executor = executor(
            vec![manuscript("m1", ManuscriptState::InReview, &["r2"])],
            MemoryCache::new(),
        );
        let mut session = session(Role::Editor);
        executor.refresh(&mut session).expect("refresh");

        executor.dispatch(
            &mut session,
            ReviewAction::User(UserAction::SetCommentDraft {
                manuscript_id: id("m1"),
                text: "Reminder sent to referees.".to_string(),
            }),
        );
        executor.dispatch(
            &mut session,
            ReviewAction::User(UserAction::PostComment {
                manuscript_id: id("m1"),
            }),
        );

        assert_eq!(
            session
                .fetched_comments_for(&id("m1"))
                .iter()
                .map(|comment| comment.text.as_str())
                .collect::<Vec<_>>(),
            vec!["Reminder sent to referees."]
        );
        assert_eq!(
            session.drafts.get(&id("m1")).map(|draft| draft.comment.as_str()),
            Some("")
        );
    }
}
