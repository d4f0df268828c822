use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::VecDeque;

use serde_json::Value;

use quire_core::state::ActionCode;
use quire_core::state::ActorDecision;
use quire_core::state::Manuscript;
use quire_core::state::ManuscriptId;
use quire_core::state::ManuscriptState;
use quire_core::state::RawComment;
use quire_core::state::RefereeDecision;
use quire_core::workflow::stage_transition;
use quire_core::Role;

use crate::contracts::ApiError;
use crate::contracts::ApiResult;
use crate::contracts::CommentApi;
use crate::contracts::ManuscriptApi;
use crate::contracts::NewComment;
use crate::contracts::NewManuscript;
use crate::contracts::PeopleApi;
use crate::contracts::Person;

/// One request the simulated server received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    ListManuscripts,
    GetManuscript(ManuscriptId),
    UpdateState {
        manuscript_id: ManuscriptId,
        action: ActionCode,
    },
    CreateManuscript(String),
    UpdateManuscript(ManuscriptId),
    ListComments(ManuscriptId),
    CreateComment(NewComment),
    ListPeople,
    AssignRole {
        person_id: String,
        role: Role,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ListManuscripts,
    GetManuscript,
    UpdateState,
    CreateManuscript,
    UpdateManuscript,
    ListComments,
    CreateComment,
    ListPeople,
    AssignRole,
}

#[derive(Debug, Default)]
struct ServerData {
    manuscripts: Vec<Manuscript>,
    comments: BTreeMap<ManuscriptId, Vec<RawComment>>,
    people: Vec<Person>,
    calls: Vec<BackendCall>,
    failures: VecDeque<(Endpoint, ApiError)>,
    next_id: u64,
}

impl ServerData {
    fn take_failure(&mut self, endpoint: Endpoint) -> ApiResult<()> {
        let queued = self
            .failures
            .iter()
            .position(|(target, _)| *target == endpoint)
            .and_then(|index| self.failures.remove(index));
        match queued {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }

    fn manuscript_mut(&mut self, id: &ManuscriptId) -> ApiResult<&mut Manuscript> {
        self.manuscripts
            .iter_mut()
            .find(|manuscript| manuscript.id == *id)
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: &ManuscriptId) -> ApiError {
    ApiError::Status {
        status: 404,
        message: format!("Manuscript {id} not found"),
    }
}

/// Where the server moves a manuscript for each action code.
fn apply_action(state: &ManuscriptState, action: ActionCode) -> ManuscriptState {
    match action {
        ActionCode::Reject => ManuscriptState::Rejected,
        ActionCode::AcceptWithRevisions => ManuscriptState::AuthorRevision,
        ActionCode::AcceptedToCopyedit => ManuscriptState::CopyEditing,
        ActionCode::EditorReview => ManuscriptState::EditorReview,
        ActionCode::Withdraw => ManuscriptState::Withdrawn,
        ActionCode::SendToReview => ManuscriptState::InReview,
        ActionCode::SubmitReview => state.clone(),
        ActionCode::Done => {
            stage_transition(state, ActorDecision::Done).unwrap_or_else(|_| state.clone())
        }
    }
}

/// In-memory stand-in for the journal services. Records every call and
/// can be told to fail specific endpoints.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    data: RefCell<ServerData>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manuscripts(manuscripts: Vec<Manuscript>) -> Self {
        let backend = Self::new();
        backend.data.borrow_mut().manuscripts = manuscripts;
        backend
    }

    pub fn add_comment(&self, manuscript_id: &ManuscriptId, comment: RawComment) {
        self.data
            .borrow_mut()
            .comments
            .entry(manuscript_id.clone())
            .or_default()
            .push(comment);
    }

    pub fn add_person(&self, person: Person) {
        self.data.borrow_mut().people.push(person);
    }

    /// The next call to `endpoint` fails with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, endpoint: Endpoint, error: ApiError) {
        self.data.borrow_mut().failures.push_back((endpoint, error));
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.data.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.data.borrow_mut().calls.clear();
    }

    pub fn manuscript(&self, id: &ManuscriptId) -> Option<Manuscript> {
        self.data
            .borrow()
            .manuscripts
            .iter()
            .find(|manuscript| manuscript.id == *id)
            .cloned()
    }

    pub fn people(&self) -> Vec<Person> {
        self.data.borrow().people.clone()
    }

    fn record(&self, call: BackendCall, endpoint: Endpoint) -> ApiResult<()> {
        let mut data = self.data.borrow_mut();
        data.calls.push(call);
        data.take_failure(endpoint)
    }
}

impl ManuscriptApi for SimulatedBackend {
    fn list_manuscripts(&self) -> ApiResult<Vec<Manuscript>> {
        self.record(BackendCall::ListManuscripts, Endpoint::ListManuscripts)?;
        Ok(self.data.borrow().manuscripts.clone())
    }

    fn get_manuscript(&self, id: &ManuscriptId) -> ApiResult<Manuscript> {
        self.record(BackendCall::GetManuscript(id.clone()), Endpoint::GetManuscript)?;
        self.manuscript(id).ok_or_else(|| not_found(id))
    }

    fn update_state(
        &self,
        id: &ManuscriptId,
        action: ActionCode,
        payload: Option<Value>,
    ) -> ApiResult<()> {
        self.record(
            BackendCall::UpdateState {
                manuscript_id: id.clone(),
                action,
            },
            Endpoint::UpdateState,
        )?;
        let mut data = self.data.borrow_mut();
        let manuscript = data.manuscript_mut(id)?;
        let next = apply_action(&manuscript.state, action);
        if next != manuscript.state {
            let previous = std::mem::replace(&mut manuscript.state, next);
            manuscript.history.push(previous);
        }

        let referee = payload
            .as_ref()
            .and_then(|payload| payload.get("referee_id"))
            .and_then(Value::as_str);
        let decision = payload
            .as_ref()
            .and_then(|payload| payload.get("decision"))
            .and_then(Value::as_str)
            .and_then(RefereeDecision::parse);
        if let (Some(referee), Some(decision)) = (referee, decision) {
            manuscript
                .referee_decisions
                .insert(referee.to_string(), decision);
            if !manuscript.referee_actions.iter().any(|actor| actor == referee) {
                manuscript.referee_actions.push(referee.to_string());
            }
        }
        Ok(())
    }

    fn create_manuscript(&self, manuscript: &NewManuscript) -> ApiResult<Manuscript> {
        self.record(
            BackendCall::CreateManuscript(manuscript.title.clone()),
            Endpoint::CreateManuscript,
        )?;
        let mut data = self.data.borrow_mut();
        data.next_id += 1;
        let mut created = Manuscript::new(
            format!("sim-{}", data.next_id),
            ManuscriptState::Submitted,
        );
        created.title = manuscript.title.clone();
        created.author_id = Some(manuscript.author_id.clone());
        created.author_email = manuscript.author_email.clone();
        data.manuscripts.push(created.clone());
        Ok(created)
    }

    fn update_manuscript(&self, manuscript: &Manuscript) -> ApiResult<Manuscript> {
        self.record(
            BackendCall::UpdateManuscript(manuscript.id.clone()),
            Endpoint::UpdateManuscript,
        )?;
        let mut data = self.data.borrow_mut();
        let stored = data.manuscript_mut(&manuscript.id)?;
        *stored = manuscript.clone();
        Ok(manuscript.clone())
    }
}

impl CommentApi for SimulatedBackend {
    fn list_comments(&self, manuscript_id: &ManuscriptId) -> ApiResult<Vec<RawComment>> {
        self.record(
            BackendCall::ListComments(manuscript_id.clone()),
            Endpoint::ListComments,
        )?;
        Ok(self
            .data
            .borrow()
            .comments
            .get(manuscript_id)
            .cloned()
            .unwrap_or_default())
    }

    fn create_comment(&self, comment: &NewComment) -> ApiResult<()> {
        self.record(
            BackendCall::CreateComment(comment.clone()),
            Endpoint::CreateComment,
        )?;
        self.add_comment(
            &comment.manuscript_id,
            RawComment {
                text: comment.text.clone(),
                editor_id: Some(comment.author_id.clone()),
                timestamp: Some("2024-01-01T00:00:00.000Z".to_string()),
            },
        );
        Ok(())
    }
}

impl PeopleApi for SimulatedBackend {
    fn list_people(&self) -> ApiResult<Vec<Person>> {
        self.record(BackendCall::ListPeople, Endpoint::ListPeople)?;
        Ok(self.people())
    }

    fn assign_role(&self, person_id: &str, role: Role) -> ApiResult<()> {
        self.record(
            BackendCall::AssignRole {
                person_id: person_id.to_string(),
                role,
            },
            Endpoint::AssignRole,
        )?;
        let mut data = self.data.borrow_mut();
        let existing = data
            .people
            .iter_mut()
            .find(|person| person.id == person_id || person.email.as_deref() == Some(person_id));
        match existing {
            Some(person) if person.roles.contains(&role) => Err(ApiError::Status {
                status: 400,
                message: "User already has this role".to_string(),
            }),
            Some(person) => {
                person.roles.push(role);
                Ok(())
            }
            None => {
                data.people.push(Person {
                    id: person_id.to_string(),
                    email: person_id.contains('@').then(|| person_id.to_string()),
                    name: None,
                    roles: vec![role],
                });
                Ok(())
            }
        }
    }
}
