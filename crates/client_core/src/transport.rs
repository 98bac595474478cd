//! HTTP implementation of [`RecordBackend`] over the records REST API.

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{ChildId, ChildKind, EncounterId, UserId},
    error::{ApiError, ErrorCode},
    protocol::{
        CancelRequest, ChildPayload, ChildRecord, Encounter, FulfilRequest, ReplaceRequest,
        SignRequest,
    },
};
use tracing::debug;
use url::Url;

use crate::{RecordBackend, WorkflowError, WorkflowResult};

const ENCOUNTER: &str = "encounter";

pub struct HttpRecordBackend {
    http: Client,
    base_url: Url,
}

impl HttpRecordBackend {
    pub fn new(server_url: &str) -> anyhow::Result<Self> {
        Self::with_client(Client::new(), server_url)
    }

    /// A bad server url is a settings fault, reported like the other
    /// settings errors rather than as a [`WorkflowError`].
    pub fn with_client(http: Client, server_url: &str) -> anyhow::Result<Self> {
        let base_url =
            Url::parse(server_url).with_context(|| format!("invalid server url '{server_url}'"))?;
        if base_url.cannot_be_a_base() {
            bail!("server url '{server_url}' cannot carry a path");
        }
        Ok(Self { http, base_url })
    }

    /// Appends percent-encoded path segments to the base url.
    fn endpoint<I>(&self, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn child_endpoint(&self, kind: ChildKind, child_id: ChildId, action: Option<&str>) -> Url {
        let id = child_id.to_string();
        let mut segments = vec!["records", kind.path_segment(), id.as_str()];
        segments.extend(action);
        self.endpoint(segments)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        entity: &'static str,
        id: String,
    ) -> WorkflowResult<T> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|err| transport_failure(&url, err))?;
        read_response(response, entity, id).await
    }

    async fn post_json<B, T>(
        &self,
        url: Url,
        body: &B,
        entity: &'static str,
        id: String,
    ) -> WorkflowResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|err| transport_failure(&url, err))?;
        read_response(response, entity, id).await
    }
}

fn transport_failure(url: &Url, err: reqwest::Error) -> WorkflowError {
    debug!(%url, error = %err, "records request failed before a response arrived");
    WorkflowError::Network(format!("backend unreachable: {err}"))
}

async fn read_response<T: DeserializeOwned>(
    response: Response,
    entity: &'static str,
    id: String,
) -> WorkflowResult<T> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(|err| {
            WorkflowError::Network(format!("failed to decode {entity} response: {err}"))
        });
    }

    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), %body, entity, "records request rejected");
    Err(map_error_response(status.as_u16(), &body, entity, id))
}

/// Maps a non-success response onto the workflow error taxonomy.
///
/// The error code in an `ApiError` body wins over the HTTP status. The
/// backend's message is kept verbatim when one was sent.
pub(crate) fn map_error_response(
    status: u16,
    body: &str,
    entity: &'static str,
    id: String,
) -> WorkflowError {
    let api_error = serde_json::from_str::<ApiError>(body).ok();
    let code = api_error.as_ref().map(|err| err.code);
    let message = api_error
        .map(|err| err.message)
        .filter(|message| !message.trim().is_empty());

    match (code, status) {
        (Some(ErrorCode::NotFound), _) | (None, 404) => WorkflowError::NotFound { entity, id },
        (Some(ErrorCode::Conflict), _) | (None, 409) => WorkflowError::Conflict(
            message.unwrap_or_else(|| format!("{entity} {id} does not allow this action")),
        ),
        (Some(ErrorCode::Validation), _) | (None, 400 | 422) => WorkflowError::Validation(
            message.unwrap_or_else(|| "the server rejected the submitted data".to_string()),
        ),
        _ => WorkflowError::Network(
            message.unwrap_or_else(|| format!("backend request failed with status {status}")),
        ),
    }
}

#[async_trait]
impl RecordBackend for HttpRecordBackend {
    async fn fetch_encounter(&self, encounter_id: &EncounterId) -> WorkflowResult<Encounter> {
        let url = self.endpoint(["encounters", encounter_id.as_str()]);
        self.get_json(url, ENCOUNTER, encounter_id.to_string()).await
    }

    async fn list_assigned_encounters(&self, doctor_id: UserId) -> WorkflowResult<Vec<Encounter>> {
        let mut url = self.endpoint(["encounters"]);
        url.query_pairs_mut().append_pair("doctor_id", &doctor_id.to_string());
        self.get_json(url, ENCOUNTER, format!("assigned to {doctor_id}")).await
    }

    async fn list_children(
        &self,
        encounter_id: &EncounterId,
        kind: ChildKind,
    ) -> WorkflowResult<Vec<ChildRecord>> {
        let url = self.endpoint([
            "encounters",
            encounter_id.as_str(),
            "records",
            kind.path_segment(),
        ]);
        self.get_json(url, ENCOUNTER, encounter_id.to_string()).await
    }

    async fn create_child(
        &self,
        encounter_id: &EncounterId,
        payload: &ChildPayload,
    ) -> WorkflowResult<ChildRecord> {
        let url = self.endpoint([
            "encounters",
            encounter_id.as_str(),
            "records",
            payload.kind().path_segment(),
        ]);
        self.post_json(url, payload, ENCOUNTER, encounter_id.to_string())
            .await
    }

    async fn fetch_child(&self, kind: ChildKind, child_id: ChildId) -> WorkflowResult<ChildRecord> {
        let url = self.child_endpoint(kind, child_id, None);
        self.get_json(url, kind.label(), child_id.to_string()).await
    }

    async fn sign_child(
        &self,
        kind: ChildKind,
        child_id: ChildId,
        request: &SignRequest,
    ) -> WorkflowResult<ChildRecord> {
        let url = self.child_endpoint(kind, child_id, Some("sign"));
        self.post_json(url, request, kind.label(), child_id.to_string())
            .await
    }

    async fn replace_child(
        &self,
        kind: ChildKind,
        child_id: ChildId,
        request: &ReplaceRequest,
    ) -> WorkflowResult<ChildRecord> {
        let url = self.child_endpoint(kind, child_id, Some("replace"));
        self.post_json(url, request, kind.label(), child_id.to_string())
            .await
    }

    async fn fulfil_child(
        &self,
        kind: ChildKind,
        child_id: ChildId,
        request: &FulfilRequest,
    ) -> WorkflowResult<ChildRecord> {
        let url = self.child_endpoint(kind, child_id, Some("fulfil"));
        self.post_json(url, request, kind.label(), child_id.to_string())
            .await
    }

    async fn cancel_child(
        &self,
        kind: ChildKind,
        child_id: ChildId,
        request: &CancelRequest,
    ) -> WorkflowResult<ChildRecord> {
        let url = self.child_endpoint(kind, child_id, Some("cancel"));
        self.post_json(url, request, kind.label(), child_id.to_string())
            .await
    }

    async fn replacement_history(
        &self,
        kind: ChildKind,
        child_id: ChildId,
    ) -> WorkflowResult<Vec<ChildRecord>> {
        let url = self.child_endpoint(kind, child_id, Some("history"));
        self.get_json(url, kind.label(), child_id.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_code_wins_over_status() {
        let body = r#"{"code":"conflict","message":"prescription already signed"}"#;
        assert_eq!(
            map_error_response(400, body, "prescription", "99".into()),
            WorkflowError::Conflict("prescription already signed".into())
        );
    }

    #[test]
    fn bare_statuses_fall_back_to_generic_messages() {
        assert_eq!(
            map_error_response(404, "", ENCOUNTER, "404404".into()),
            WorkflowError::NotFound {
                entity: ENCOUNTER,
                id: "404404".into()
            }
        );
        assert!(matches!(
            map_error_response(422, "not json", ENCOUNTER, "1".into()),
            WorkflowError::Validation(_)
        ));
        assert_eq!(
            map_error_response(503, "<html>busy</html>", ENCOUNTER, "1".into()),
            WorkflowError::Network("backend request failed with status 503".into())
        );
    }

    #[test]
    fn server_errors_surface_backend_message_verbatim() {
        let body = r#"{"code":"internal","message":"pharmacy service offline"}"#;
        assert_eq!(
            map_error_response(500, body, "prescription", "7".into()),
            WorkflowError::Network("pharmacy service offline".into())
        );
    }

    #[test]
    fn endpoints_encode_encounter_ids_and_keep_base_path() {
        let backend = HttpRecordBackend::new("http://127.0.0.1:9000/api/").expect("backend");
        let url = backend.endpoint(["encounters", "A/12 3"]);
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/api/encounters/A%2F12%203");

        let url = backend.child_endpoint(ChildKind::Prescription, ChildId(99), Some("sign"));
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/api/records/prescriptions/99/sign"
        );
    }

    #[test]
    fn rejects_urls_without_a_path_base() {
        let Err(err) = HttpRecordBackend::new("mailto:ward@example.org") else {
            panic!("mailto urls have no path to extend");
        };
        assert_eq!(
            err.to_string(),
            "server url 'mailto:ward@example.org' cannot carry a path"
        );

        let Err(err) = HttpRecordBackend::new("not a url") else {
            panic!("expected a parse failure");
        };
        assert_eq!(err.to_string(), "invalid server url 'not a url'");
        assert!(err.root_cause().downcast_ref::<url::ParseError>().is_some());
    }
}
