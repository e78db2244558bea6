use std::collections::BTreeMap;

use reqwest::{Client, Response};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use mupp_schema::Schema;

use crate::error::{ApiError, GENERIC_ERROR_MESSAGE, SignUpError};
use crate::session::{SESSION_HEADER, SessionKey};
use crate::signup::SignupForm;

/// Base URL used when the caller configures nothing.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";

/// Client for the MUPP backend.
///
/// One outstanding request per user action: no queuing, no retries, no
/// deduplication of concurrent identical calls. Every method runs to
/// completion or rejection; only the status probe is cancellable.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /` status probe. The only call with a cancellation path: it is
    /// aborted when the token fires (e.g. on teardown of whatever surface
    /// displays the result).
    pub async fn ping(&self, cancel: &CancellationToken) -> Result<Value, ApiError> {
        debug!(url = %self.url("/"), "pinging backend");
        let probe = async {
            let response = self.http.get(self.url("/")).send().await?;
            let response = check_status("Error on status probe", response).await?;
            decode_json(response).await
        };
        tokio::select! {
            () = cancel.cancelled() => Err(ApiError::Cancelled),
            outcome = probe => outcome,
        }
    }

    /// `POST /accounts`: creates an account. Most callers want
    /// [`ApiClient::sign_up`], which validates the form first and logs the
    /// new account in.
    pub async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Value, ApiError> {
        debug!(username, email, "creating account");
        let response = self
            .http
            .post(self.url("/accounts"))
            .json(&json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await?;
        let response = check_status("Error on Sign Up", response).await?;
        decode_json(response).await
    }

    /// Validates the sign-up form, then registers and logs the account in.
    ///
    /// No request is issued while the form has validation errors.
    pub async fn sign_up(&self, form: &SignupForm) -> Result<SessionKey, SignUpError> {
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(SignUpError::Invalid(errors));
        }
        self.create_account(&form.username, &form.email, &form.password)
            .await?;
        Ok(self.login(&form.email, &form.password).await?)
    }

    /// `POST /login`: exchanges credentials for a session key.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionKey, ApiError> {
        debug!(email, "logging in");
        let response = self
            .http
            .post(self.url("/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let response = check_status("Error on Sign In", response).await?;
        let body = decode_json(response).await?;
        body.get("session_key")
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
            .map(SessionKey::new)
            .ok_or(ApiError::MissingSessionKey)
    }

    /// `POST /logout`: invalidates the session on the server.
    pub async fn logout(&self, session: &SessionKey) -> Result<(), ApiError> {
        debug!("logging out");
        let response = self
            .http
            .post(self.url("/logout"))
            .header(SESSION_HEADER, session.as_str())
            .send()
            .await?;
        check_status("Error on Sign Out", response).await?;
        Ok(())
    }

    /// `GET /forms`: the account's hosted forms.
    pub async fn list_forms(&self, session: &SessionKey) -> Result<Value, ApiError> {
        let response = self
            .http
            .get(self.url("/forms"))
            .header(SESSION_HEADER, session.as_str())
            .send()
            .await?;
        let response = check_status("Error fetching forms", response).await?;
        decode_json(response).await
    }

    /// `POST /forms`: persists a validated schema; returns the new form's
    /// endpoint id.
    pub async fn save_form(
        &self,
        session: &SessionKey,
        schema: &Schema,
    ) -> Result<String, ApiError> {
        debug!(entities = schema.len(), "saving form");
        let response = self
            .http
            .post(self.url("/forms"))
            .header(SESSION_HEADER, session.as_str())
            .json(&json!({ "form_structure": schema }))
            .send()
            .await?;
        let response = check_status("Error saving form", response).await?;
        let body = decode_json(response).await?;
        match body.get("form_endpoint") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(other) if !other.is_null() => Ok(other.to_string()),
            _ => Err(ApiError::MissingField("form_endpoint")),
        }
    }

    /// `GET /form/:id`: fetches a persisted schema and checks its
    /// invariants before handing it over.
    pub async fn fetch_form(&self, form_id: &str) -> Result<Schema, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/form/{form_id}")))
            .send()
            .await?;
        let response = check_status("Error fetching form", response).await?;
        let body = decode_json(response).await?;
        let raw = body
            .get("form_structure")
            .ok_or(ApiError::MissingField("form_structure"))?;
        let schema = decode_form_structure(raw)?;
        schema.ensure_well_formed()?;
        Ok(schema)
    }

    /// `DELETE /form/:id`.
    pub async fn delete_form(&self, session: &SessionKey, form_id: &str) -> Result<(), ApiError> {
        debug!(form_id, "deleting form");
        let response = self
            .http
            .delete(self.url(&format!("/form/{form_id}")))
            .header(SESSION_HEADER, session.as_str())
            .send()
            .await?;
        check_status("Error deleting form", response).await?;
        Ok(())
    }

    /// `POST /form/:id`: submits one respondent's validated answers.
    pub async fn submit_response(
        &self,
        form_id: &str,
        answers: &BTreeMap<String, Value>,
    ) -> Result<(), ApiError> {
        debug!(form_id, count = answers.len(), "submitting response");
        let response = self
            .http
            .post(self.url(&format!("/form/{form_id}")))
            .json(answers)
            .send()
            .await?;
        check_status("Error submitting response", response).await?;
        Ok(())
    }

    /// `GET /responses/:id`: the responses collected for a form.
    pub async fn fetch_responses(
        &self,
        session: &SessionKey,
        form_id: &str,
    ) -> Result<Value, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/responses/{form_id}")))
            .header(SESSION_HEADER, session.as_str())
            .send()
            .await?;
        let response = check_status("Error fetching responses", response).await?;
        decode_json(response).await
    }

    /// `GET /groupings/:id`: the participant groups computed for a form.
    pub async fn fetch_groupings(
        &self,
        session: &SessionKey,
        form_id: &str,
    ) -> Result<Value, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/groupings/{form_id}")))
            .header(SESSION_HEADER, session.as_str())
            .send()
            .await?;
        let response = check_status("Error fetching groupings", response).await?;
        decode_json(response).await
    }
}

/// Passes successful responses through; turns error statuses into
/// [`ApiError::Status`], surfacing the backend's `message` when the body
/// carries one.
async fn check_status(context: &'static str, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.text().await {
        Ok(text) => extract_message(&text),
        Err(_) => GENERIC_ERROR_MESSAGE.to_string(),
    };
    warn!(context, status = status.as_u16(), %message, "backend rejected request");
    Err(ApiError::Status {
        context,
        status: status.as_u16(),
        message,
    })
}

fn extract_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(|body| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
}

async fn decode_json(response: Response) -> Result<Value, ApiError> {
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(ApiError::Decode)
}

/// The backend stores `form_structure` as a JSON string but older rows hold
/// the object directly; both shapes must decode.
fn decode_form_structure(raw: &Value) -> Result<Schema, ApiError> {
    match raw {
        Value::String(text) => serde_json::from_str(text).map_err(ApiError::Decode),
        other => serde_json::from_value(other.clone()).map_err(ApiError::Decode),
    }
}
