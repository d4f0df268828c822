use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use serde_json::Value;
use ureq::http::Response;
use ureq::Agent;
use ureq::Body;
use ureq::RequestBuilder;

use quire_core::config::ApiConfig;
use quire_core::state::ActionCode;
use quire_core::state::Manuscript;
use quire_core::state::ManuscriptId;
use quire_core::state::RawComment;
use quire_core::Role;

use crate::contracts::ApiError;
use crate::contracts::ApiResult;
use crate::contracts::CommentApi;
use crate::contracts::ManuscriptApi;
use crate::contracts::NewComment;
use crate::contracts::NewManuscript;
use crate::contracts::PeopleApi;
use crate::contracts::Person;

/// List endpoints answer with a bare array or a paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Bare(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> ListBody<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Paged { results: items } => items,
        }
    }
}

/// Pulls a human-readable message out of an error body.
fn error_message(status: u16, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["detail", "message", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_string))
    });
    from_json
        .or_else(|| Some(body.trim().to_string()).filter(|text| !text.is_empty()))
        .unwrap_or_else(|| format!("HTTP {status}"))
}

fn decode<T: DeserializeOwned>(body: &str) -> ApiResult<T> {
    serde_json::from_str(body).map_err(|err| ApiError::Decode(err.to_string()))
}

/// Blocking client for the journal's REST services.
pub struct HttpBackend {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();
        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|token| !token.trim().is_empty()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        let request = request.header("Accept", "application/json");
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    fn finish(
        &self,
        path: &str,
        sent: Result<Response<Body>, ureq::Error>,
    ) -> ApiResult<String> {
        let mut response = sent.map_err(|err| ApiError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        tracing::debug!(path, status, "journal api response");
        if !(200..300).contains(&status) {
            return Err(ApiError::Status {
                status,
                message: error_message(status, &body),
            });
        }
        Ok(body)
    }

    fn get(&self, path: &str) -> ApiResult<String> {
        let sent = self.authorize(self.agent.get(self.url(path))).call();
        self.finish(path, sent)
    }

    fn post(&self, path: &str, body: &Value) -> ApiResult<String> {
        let sent = self
            .authorize(self.agent.post(self.url(path)))
            .send_json(body);
        self.finish(path, sent)
    }

    fn put(&self, path: &str, body: &Value) -> ApiResult<String> {
        let sent = self
            .authorize(self.agent.put(self.url(path)))
            .send_json(body);
        self.finish(path, sent)
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|err| ApiError::Decode(err.to_string()))
}

impl ManuscriptApi for HttpBackend {
    fn list_manuscripts(&self) -> ApiResult<Vec<Manuscript>> {
        let body = self.get("manuscripts/")?;
        Ok(decode::<ListBody<Manuscript>>(&body)?.into_items())
    }

    fn get_manuscript(&self, id: &ManuscriptId) -> ApiResult<Manuscript> {
        decode(&self.get(&format!("manuscripts/{id}/"))?)
    }

    fn update_state(
        &self,
        id: &ManuscriptId,
        action: ActionCode,
        payload: Option<Value>,
    ) -> ApiResult<()> {
        let mut body = json!({ "action": action.as_str() });
        if let (Some(Value::Object(extra)), Some(target)) = (payload, body.as_object_mut()) {
            for (key, value) in extra {
                target.entry(key).or_insert(value);
            }
        }
        self.post(&format!("manuscripts/{id}/update_state/"), &body)?;
        Ok(())
    }

    fn create_manuscript(&self, manuscript: &NewManuscript) -> ApiResult<Manuscript> {
        decode(&self.post("manuscripts/", &to_body(manuscript)?)?)
    }

    fn update_manuscript(&self, manuscript: &Manuscript) -> ApiResult<Manuscript> {
        decode(&self.put(
            &format!("manuscripts/{}/", manuscript.id),
            &to_body(manuscript)?,
        )?)
    }
}

impl CommentApi for HttpBackend {
    fn list_comments(&self, manuscript_id: &ManuscriptId) -> ApiResult<Vec<RawComment>> {
        let body = self.get(&format!("comments/?manuscript_id={manuscript_id}"))?;
        Ok(decode::<ListBody<RawComment>>(&body)?.into_items())
    }

    fn create_comment(&self, comment: &NewComment) -> ApiResult<()> {
        self.post("comments/", &to_body(comment)?)?;
        Ok(())
    }
}

impl PeopleApi for HttpBackend {
    fn list_people(&self) -> ApiResult<Vec<Person>> {
        let body = self.get("people/")?;
        Ok(decode::<ListBody<Person>>(&body)?.into_items())
    }

    fn assign_role(&self, person_id: &str, role: Role) -> ApiResult<()> {
        self.post(
            "people/assign_role/",
            &json!({ "user": person_id, "role": role.as_str() }),
        )?;
        Ok(())
    }
}
