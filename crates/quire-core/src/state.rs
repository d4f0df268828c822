use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::error::QuireError;
use crate::roles::Role;

/// Server ids arrive as JSON strings or integers; both collapse to a string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ManuscriptId(pub String);

impl ManuscriptId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ManuscriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ManuscriptId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Signed(n) => n.to_string(),
            Self::Unsigned(n) => n.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for ManuscriptId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(IdValue::deserialize(deserializer)?.into_string()))
    }
}

fn normalize_code(code: &str) -> String {
    code.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ManuscriptState {
    Submitted,
    InReview,
    Rejected,
    CopyEditing,
    AuthorReview,
    Withdrawn,
    EditorReview,
    AuthorRevision,
    Formatting,
    Published,
    SubmitReview,
    Accepted,
    Other(String),
}

impl ManuscriptState {
    pub const ALL: [ManuscriptState; 12] = [
        Self::Submitted,
        Self::InReview,
        Self::Rejected,
        Self::CopyEditing,
        Self::AuthorReview,
        Self::Withdrawn,
        Self::EditorReview,
        Self::AuthorRevision,
        Self::Formatting,
        Self::Published,
        Self::SubmitReview,
        Self::Accepted,
    ];

    /// States a manuscript can only reach once referees are done with it.
    pub const PAST_REFEREE_REVIEW: [ManuscriptState; 6] = [
        Self::AuthorRevision,
        Self::EditorReview,
        Self::CopyEditing,
        Self::AuthorReview,
        Self::Formatting,
        Self::Published,
    ];

    pub fn from_code(code: &str) -> Self {
        match normalize_code(code).as_str() {
            "SUBMITTED" => Self::Submitted,
            "IN_REVIEW" => Self::InReview,
            "REJECTED" => Self::Rejected,
            "COPY_EDITING" => Self::CopyEditing,
            "AUTHOR_REVIEW" => Self::AuthorReview,
            "WITHDRAWN" => Self::Withdrawn,
            "EDITOR_REVIEW" => Self::EditorReview,
            "AUTHOR_REVISION" => Self::AuthorRevision,
            "FORMATTING" => Self::Formatting,
            "PUBLISHED" => Self::Published,
            "SUBMIT_REVIEW" => Self::SubmitReview,
            "ACCEPTED" => Self::Accepted,
            _ => Self::Other(code.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::InReview => "IN_REVIEW",
            Self::Rejected => "REJECTED",
            Self::CopyEditing => "COPY_EDITING",
            Self::AuthorReview => "AUTHOR_REVIEW",
            Self::Withdrawn => "WITHDRAWN",
            Self::EditorReview => "EDITOR_REVIEW",
            Self::AuthorRevision => "AUTHOR_REVISION",
            Self::Formatting => "FORMATTING",
            Self::Published => "PUBLISHED",
            Self::SubmitReview => "SUBMIT_REVIEW",
            Self::Accepted => "ACCEPTED",
            Self::Other(code) => code.as_str(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Submitted => "Submitted",
            Self::InReview => "In review",
            Self::Rejected => "Rejected",
            Self::CopyEditing => "Copy editing",
            Self::AuthorReview => "Author review",
            Self::Withdrawn => "Withdrawn",
            Self::EditorReview => "Editor review",
            Self::AuthorRevision => "Author revision",
            Self::Formatting => "Formatting",
            Self::Published => "Published",
            Self::SubmitReview => "Review submitted",
            Self::Accepted => "Accepted",
            Self::Other(code) => code.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Withdrawn | Self::Published)
    }

    pub fn is_past_referee_review(&self) -> bool {
        Self::PAST_REFEREE_REVIEW.contains(self)
    }
}

impl fmt::Display for ManuscriptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ManuscriptState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ManuscriptState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_code(&code))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RefereeDecision {
    Accept,
    Reject,
    AcceptWithRevisions,
    CommentsSubmitted,
    Other(String),
}

impl RefereeDecision {
    /// Empty codes mean "no decision yet" and yield `None`.
    pub fn parse(code: &str) -> Option<Self> {
        let normalized = normalize_code(code);
        let decision = match normalized.as_str() {
            "" => return None,
            "ACCEPT" => Self::Accept,
            "REJECT" => Self::Reject,
            "ACCEPT_WITH_REVISIONS" => Self::AcceptWithRevisions,
            "COMMENTS_SUBMITTED" => Self::CommentsSubmitted,
            _ => Self::Other(code.trim().to_string()),
        };
        Some(decision)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Accept => "ACCEPT",
            Self::Reject => "REJECT",
            Self::AcceptWithRevisions => "ACCEPT_WITH_REVISIONS",
            Self::CommentsSubmitted => "COMMENTS_SUBMITTED",
            Self::Other(code) => code.as_str(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Accept => "Accept",
            Self::Reject => "Reject",
            Self::AcceptWithRevisions => "Accept with revisions",
            Self::CommentsSubmitted => "Comments submitted",
            Self::Other(code) => code.as_str(),
        }
    }
}

impl fmt::Display for RefereeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RefereeDecision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RefereeDecision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Self::parse(&code).ok_or_else(|| serde::de::Error::custom("empty decision code"))
    }
}

/// What an actor chose on a manuscript. Wider than [`RefereeDecision`]
/// because authors and staff can also finish a stage or withdraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorDecision {
    Accept,
    Reject,
    AcceptWithRevisions,
    CommentsSubmitted,
    Done,
    Withdraw,
    Unrecognized,
}

impl ActorDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "ACCEPT",
            Self::Reject => "REJECT",
            Self::AcceptWithRevisions => "ACCEPT_WITH_REVISIONS",
            Self::CommentsSubmitted => "COMMENTS_SUBMITTED",
            Self::Done => "DONE",
            Self::Withdraw => "WITHDRAW",
            Self::Unrecognized => "UNRECOGNIZED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Accept => "Accept",
            Self::Reject => "Reject",
            Self::AcceptWithRevisions => "Accept with revisions",
            Self::CommentsSubmitted => "Comments only",
            Self::Done => "Done",
            Self::Withdraw => "Withdraw",
            Self::Unrecognized => "Unrecognized",
        }
    }

    /// The decision record left behind for referee-facing decisions.
    pub fn as_referee_decision(self) -> Option<RefereeDecision> {
        match self {
            Self::Accept => Some(RefereeDecision::Accept),
            Self::Reject => Some(RefereeDecision::Reject),
            Self::AcceptWithRevisions => Some(RefereeDecision::AcceptWithRevisions),
            Self::CommentsSubmitted => Some(RefereeDecision::CommentsSubmitted),
            Self::Done | Self::Withdraw | Self::Unrecognized => None,
        }
    }
}

impl FromStr for ActorDecision {
    type Err = QuireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_code(s).as_str() {
            "ACCEPT" => Ok(Self::Accept),
            "REJECT" => Ok(Self::Reject),
            "ACCEPT_WITH_REVISIONS" => Ok(Self::AcceptWithRevisions),
            "COMMENTS_SUBMITTED" | "COMMENTS" => Ok(Self::CommentsSubmitted),
            "DONE" => Ok(Self::Done),
            "WITHDRAW" => Ok(Self::Withdraw),
            _ => Err(QuireError::UnknownCode(s.to_string())),
        }
    }
}

impl fmt::Display for ActorDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation string the manuscript service maps to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionCode {
    Reject,
    AcceptWithRevisions,
    AcceptedToCopyedit,
    EditorReview,
    Done,
    Withdraw,
    SendToReview,
    SubmitReview,
}

impl ActionCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reject => "REJECT",
            Self::AcceptWithRevisions => "ACCEPT_WITH_REVISIONS",
            Self::AcceptedToCopyedit => "ACCEPTED_TO_COPYEDIT",
            Self::EditorReview => "EDITOR_REVIEW",
            Self::Done => "DONE",
            Self::Withdraw => "WITHDRAW",
            Self::SendToReview => "SEND_TO_REVIEW",
            Self::SubmitReview => "SUBMIT_REVIEW",
        }
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical comment. Everything downstream of the aggregator sees only this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub author: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedRecord {
    #[serde(alias = "comment", alias = "content")]
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddedComment {
    Bare(String),
    Record(EmbeddedRecord),
}

/// The `comments` field as the server stores it on a manuscript.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EmbeddedComments {
    #[default]
    Absent,
    Text(String),
    List(Vec<EmbeddedComment>),
}

impl EmbeddedComments {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl Serialize for EmbeddedComments {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Text(text) => serializer.serialize_str(text),
            Self::List(items) => items.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for EmbeddedComments {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            List(Vec<EmbeddedComment>),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            None => Self::Absent,
            Some(Raw::Text(text)) => Self::Text(text),
            Some(Raw::List(items)) => Self::List(items),
        })
    }
}

/// A comment row from the separate comments collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComment {
    pub text: String,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub editor_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manuscript {
    pub id: ManuscriptId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    pub state: ManuscriptState,
    #[serde(default, deserialize_with = "deserialize_referees")]
    pub referees: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub history: Vec<ManuscriptState>,
    #[serde(default, skip_serializing_if = "EmbeddedComments::is_absent")]
    pub comments: EmbeddedComments,
    #[serde(default, deserialize_with = "deserialize_decision_entries")]
    pub referee_decisions: BTreeMap<String, RefereeDecision>,
    #[serde(default, deserialize_with = "deserialize_referees")]
    pub referee_actions: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub editor_id: Option<String>,
    #[serde(default)]
    pub editor_email: Option<String>,
}

impl Manuscript {
    pub fn new(id: impl Into<String>, state: ManuscriptState) -> Self {
        Self {
            id: ManuscriptId::new(id),
            title: String::new(),
            state,
            referees: Vec::new(),
            history: Vec::new(),
            comments: EmbeddedComments::Absent,
            referee_decisions: BTreeMap::new(),
            referee_actions: Vec::new(),
            author_id: None,
            author_email: None,
            editor_id: None,
            editor_email: None,
        }
    }

    pub fn has_referee(&self, referee_id: &str) -> bool {
        self.referees.iter().any(|referee| referee == referee_id)
    }

    /// Appends the referee unless already assigned; returns whether it changed.
    pub fn add_referee(&mut self, referee_id: &str) -> bool {
        if self.has_referee(referee_id) {
            return false;
        }
        self.referees.push(referee_id.to_string());
        true
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IdValue>::deserialize(deserializer)?
        .map(IdValue::into_string)
        .filter(|id| !id.trim().is_empty()))
}

fn deserialize_referees<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<IdValue>>::deserialize(deserializer)?.unwrap_or_default();
    let mut seen = BTreeSet::new();
    let mut referees = Vec::with_capacity(raw.len());
    for id in raw.into_iter().map(IdValue::into_string) {
        let id = id.trim().to_string();
        if !id.is_empty() && seen.insert(id.clone()) {
            referees.push(id);
        }
    }
    Ok(referees)
}

/// Server and cache decision maps may hold `null` or `""` for "not decided".
pub(crate) fn deserialize_decision_entries<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, RefereeDecision>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw =
        Option::<BTreeMap<String, Option<String>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|(referee, code)| {
            code.as_deref()
                .and_then(RefereeDecision::parse)
                .map(|decision| (referee, decision))
        })
        .collect())
}

/// The identity the client acts as, stored under the `user` cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
}

impl ActingUser {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: None,
            role,
        }
    }

    /// Referees are assigned by email or by user id depending on the server.
    pub fn referee_keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str()).chain(self.email.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    Decide,
    Done,
    Withdraw,
    AssignReferee,
    Comment,
}

impl OperationKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Decide => "decision",
            Self::Done => "done",
            Self::Withdraw => "withdraw",
            Self::AssignReferee => "referee assignment",
            Self::Comment => "comment",
        }
    }
}

/// One in-flight operation per control: a manuscript and what is being done to it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PendingKey {
    pub manuscript_id: ManuscriptId,
    pub operation: OperationKind,
}

impl PendingKey {
    pub fn new(manuscript_id: ManuscriptId, operation: OperationKind) -> Self {
        Self {
            manuscript_id,
            operation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl InlineMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            text: text.into(),
        }
    }
}

/// The form state for one manuscript's decision control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionDraft {
    pub decision: Option<ActorDecision>,
    pub comment: String,
    pub referee_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    pub viewer: ActingUser,
    pub manuscripts: Vec<Manuscript>,
    pub fetched_comments: BTreeMap<ManuscriptId, Vec<RawComment>>,
    pub drafts: BTreeMap<ManuscriptId, DecisionDraft>,
    pub expanded: BTreeSet<ManuscriptId>,
    pub pending: BTreeSet<PendingKey>,
    pub messages: BTreeMap<ManuscriptId, InlineMessage>,
    pub mounted: bool,
}

impl ReviewSession {
    pub fn new(viewer: ActingUser) -> Self {
        Self {
            viewer,
            manuscripts: Vec::new(),
            fetched_comments: BTreeMap::new(),
            drafts: BTreeMap::new(),
            expanded: BTreeSet::new(),
            pending: BTreeSet::new(),
            messages: BTreeMap::new(),
            mounted: true,
        }
    }

    pub fn manuscript(&self, id: &ManuscriptId) -> Option<&Manuscript> {
        self.manuscripts.iter().find(|manuscript| manuscript.id == *id)
    }

    pub fn is_pending(&self, id: &ManuscriptId, operation: OperationKind) -> bool {
        self.pending
            .contains(&PendingKey::new(id.clone(), operation))
    }

    pub fn any_pending(&self, id: &ManuscriptId) -> bool {
        self.pending.iter().any(|key| key.manuscript_id == *id)
    }

    pub fn fetched_comments_for(&self, id: &ManuscriptId) -> &[RawComment] {
        self.fetched_comments
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
