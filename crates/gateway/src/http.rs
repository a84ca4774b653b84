//! REST implementation of the gateway traits using [`reqwest`].
//!
//! All routes live under `{base_url}/trek-resources`. Any response whose
//! body decodes as an [`Envelope`] is returned as-is regardless of HTTP
//! status; a body that does not decode is a [`GatewayError::Decode`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use trek_core::activity::{Activity, ActivityDraft, CreateActivity};
use trek_core::catalog::CatalogEntity;
use trek_core::image::TrekImage;
use trek_core::trek::{CreateTrek, Trek, UpdateTrek};
use trek_core::types::DbId;

use crate::config::GatewayConfig;
use crate::envelope::Envelope;
use crate::error::GatewayError;
use crate::gateway::{
    ActivityGateway, CatalogGateway, GatewayResult, ImageGateway, ProgressReporter, TrekGateway,
    UploadFile,
};
use crate::session::SessionProvider;

/// Namespace every trek route lives under.
const NAMESPACE: &str = "trek-resources";

/// Size of the chunks an upload body is streamed in.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// HTTP client for the trek backend.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
}

impl HttpGateway {
    /// Build a client with the configured timeout.
    pub fn new(
        config: &GatewayConfig,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("trek-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config.base_url.clone(), session))
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling).
    pub fn with_client(
        client: reqwest::Client,
        base_url: String,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{NAMESPACE}{path}", self.base_url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        label: &str,
    ) -> GatewayResult<T> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!(operation = label, error = %e, "Backend request failed");
            GatewayError::Request(e)
        })?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(envelope) => {
                if !envelope.success {
                    tracing::warn!(
                        operation = label,
                        status = status.as_u16(),
                        message = envelope.message.as_deref().unwrap_or(""),
                        "Backend rejected request",
                    );
                }
                Ok(envelope)
            }
            Err(e) => {
                tracing::error!(
                    operation = label,
                    status = status.as_u16(),
                    error = %e,
                    "Response is not a result envelope",
                );
                Err(GatewayError::Decode {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// Send a request whose `data` is irrelevant.
    async fn send_unit(&self, builder: RequestBuilder, label: &str) -> GatewayResult<()> {
        let envelope = self.send::<IgnoredAny>(builder, label).await?;
        let success = envelope.success;
        Ok(Envelope {
            success,
            data: success.then_some(()),
            message: envelope.message,
        })
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        label: &str,
    ) -> GatewayResult<T> {
        self.send(self.request(method, path).json(body), label).await
    }
}

/// Stream `data` in chunks, publishing cumulative bytes to `progress`.
fn progress_body(
    data: &[u8],
    sent: Arc<AtomicU64>,
    total: u64,
    progress: Option<ProgressReporter>,
) -> reqwest::Body {
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> = data
        .chunks(UPLOAD_CHUNK_BYTES)
        .map(|c| Ok(c.to_vec()))
        .collect();

    let stream = futures::stream::iter(chunks).inspect(move |chunk| {
        if let (Ok(bytes), Some(reporter)) = (chunk, &progress) {
            let len = bytes.len() as u64;
            let so_far = sent.fetch_add(len, Ordering::Relaxed) + len;
            reporter.report(so_far, total);
        }
    });

    reqwest::Body::wrap_stream(stream)
}

fn upload_form(
    files: &[UploadFile],
    progress: Option<&ProgressReporter>,
) -> Result<Form, GatewayError> {
    let total: u64 = files.iter().map(UploadFile::size).sum();
    let sent = Arc::new(AtomicU64::new(0));
    if let Some(reporter) = progress {
        reporter.report(0, total);
    }

    let mut form = Form::new().text("isPrimary", "false");
    for file in files {
        let body = progress_body(&file.data, Arc::clone(&sent), total, progress.cloned());
        let part = Part::stream_with_length(body, file.size())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        form = form.part("files", part);
    }
    Ok(form)
}

#[async_trait]
impl TrekGateway for HttpGateway {
    async fn create_trek(&self, input: &CreateTrek) -> GatewayResult<Trek> {
        self.send_json(Method::POST, "/treks", input, "create_trek")
            .await
    }

    async fn get_trek(&self, trek_id: DbId) -> GatewayResult<Trek> {
        let path = format!("/treks/{trek_id}");
        self.send(self.request(Method::GET, &path), "get_trek").await
    }

    async fn update_trek(&self, trek_id: DbId, input: &UpdateTrek) -> GatewayResult<Trek> {
        let path = format!("/treks/{trek_id}");
        self.send_json(Method::PATCH, &path, input, "update_trek")
            .await
    }
}

#[async_trait]
impl ActivityGateway for HttpGateway {
    async fn create_activity(
        &self,
        trek_id: DbId,
        input: &CreateActivity,
    ) -> GatewayResult<Activity> {
        let path = format!("/treks/{trek_id}/activities");
        self.send_json(Method::POST, &path, input, "create_activity")
            .await
    }

    async fn list_activities(&self, trek_id: DbId) -> GatewayResult<Vec<Activity>> {
        let path = format!("/treks/{trek_id}/activities");
        self.send(self.request(Method::GET, &path), "list_activities")
            .await
    }

    async fn update_activity(
        &self,
        trek_id: DbId,
        activity_id: DbId,
        input: &ActivityDraft,
    ) -> GatewayResult<Activity> {
        let path = format!("/treks/{trek_id}/activities/{activity_id}");
        self.send_json(Method::PUT, &path, input, "update_activity")
            .await
    }

    async fn delete_activity(&self, trek_id: DbId, activity_id: DbId) -> GatewayResult<()> {
        let path = format!("/treks/{trek_id}/activities/{activity_id}");
        self.send_unit(self.request(Method::DELETE, &path), "delete_activity")
            .await
    }

    async fn update_activity_order(
        &self,
        trek_id: DbId,
        activity_id: DbId,
        activity_order: u32,
    ) -> GatewayResult<Activity> {
        let path = format!("/treks/{trek_id}/activities/{activity_id}/order");
        let body = serde_json::json!({ "activityOrder": activity_order });
        self.send_json(Method::PATCH, &path, &body, "update_activity_order")
            .await
    }
}

#[async_trait]
impl ImageGateway for HttpGateway {
    async fn upload_images(
        &self,
        trek_id: DbId,
        files: &[UploadFile],
        progress: Option<&ProgressReporter>,
    ) -> GatewayResult<Vec<TrekImage>> {
        let path = format!("/treks/{trek_id}/images");
        let form = upload_form(files, progress)?;
        tracing::debug!(trek_id, files = files.len(), "Uploading image batch");
        self.send(self.request(Method::POST, &path).multipart(form), "upload_images")
            .await
    }

    async fn list_images(&self, trek_id: DbId) -> GatewayResult<Vec<TrekImage>> {
        let path = format!("/treks/{trek_id}/images");
        self.send(self.request(Method::GET, &path), "list_images")
            .await
    }

    async fn delete_image(&self, trek_id: DbId, image_id: DbId) -> GatewayResult<()> {
        let path = format!("/treks/{trek_id}/images/{image_id}");
        self.send_unit(self.request(Method::DELETE, &path), "delete_image")
            .await
    }

    async fn toggle_primary(&self, trek_id: DbId, image_id: DbId) -> GatewayResult<TrekImage> {
        let path = format!("/treks/{trek_id}/images/{image_id}/primary");
        self.send(self.request(Method::PATCH, &path), "toggle_primary")
            .await
    }
}

#[async_trait]
impl<E: CatalogEntity> CatalogGateway<E> for HttpGateway {
    async fn list_catalog(&self) -> GatewayResult<Vec<E>> {
        let path = format!("/{}", E::KIND.path());
        self.send(self.request(Method::GET, &path), "list_catalog")
            .await
    }

    async fn create_entry(&self, fields: &E::Fields) -> GatewayResult<E> {
        let path = format!("/{}", E::KIND.path());
        self.send_json(Method::POST, &path, fields, "create_entry")
            .await
    }

    async fn update_entry(&self, entity_id: DbId, fields: &E::Fields) -> GatewayResult<E> {
        let path = format!("/{}/{entity_id}", E::KIND.path());
        self.send_json(Method::PUT, &path, fields, "update_entry")
            .await
    }

    async fn delete_entry(&self, entity_id: DbId) -> GatewayResult<()> {
        let path = format!("/{}/{entity_id}", E::KIND.path());
        self.send_unit(self.request(Method::DELETE, &path), "delete_entry")
            .await
    }

    async fn attach(&self, trek_id: DbId, entity_id: DbId) -> GatewayResult<()> {
        let path = format!("/treks/{trek_id}/{}/{entity_id}", E::KIND.path());
        self.send_unit(self.request(Method::POST, &path), "attach")
            .await
    }

    async fn detach(&self, trek_id: DbId, entity_id: DbId) -> GatewayResult<()> {
        let path = format!("/treks/{trek_id}/{}/{entity_id}", E::KIND.path());
        self.send_unit(self.request(Method::DELETE, &path), "detach")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StaticSession;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::with_client(
            reqwest::Client::new(),
            base.to_string(),
            Arc::new(StaticSession::anonymous()),
        )
    }

    fn gateway_for_mock(server: &MockServer, token: Option<&str>) -> HttpGateway {
        HttpGateway::with_client(
            reqwest::Client::new(),
            format!("{}/api", server.uri()),
            Arc::new(StaticSession::new(token.map(str::to_string), Some(3))),
        )
    }

    fn activity_json(id: DbId, order: u32) -> serde_json::Value {
        json!({
            "id": id,
            "trekId": 9,
            "title": "Forest Camp",
            "description": "Through the rhododendron",
            "type": "ACTIVITY",
            "isOptional": false,
            "activityOrder": order
        })
    }

    #[test]
    fn urls_are_namespaced() {
        let gw = gateway("http://localhost:8080/api/");
        assert_eq!(
            gw.url("/treks/4/images"),
            "http://localhost:8080/api/trek-resources/treks/4/images"
        );
    }

    #[test]
    fn upload_form_reports_zero_progress_up_front() {
        let files = vec![
            UploadFile::new("a.jpg", "image/jpeg", vec![0; 10]),
            UploadFile::new("b.jpg", "image/jpeg", vec![0; 30]),
        ];
        let (reporter, rx) = ProgressReporter::channel();
        upload_form(&files, Some(&reporter)).unwrap();
        assert_eq!(rx.borrow().total_bytes, 40);
        assert_eq!(rx.borrow().sent_bytes, 0);
    }

    #[test]
    fn upload_form_rejects_malformed_mime() {
        let files = vec![UploadFile::new("a.jpg", "not a mime", vec![1])];
        assert!(upload_form(&files, None).is_err());
    }

    // -----------------------------------------------------------------------
    // Envelope handling
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn rejection_envelope_is_returned_for_any_status() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/api/trek-resources/treks/9/activities"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"success": false, "message": "Not your trek"})),
            )
            .mount(&server)
            .await;

        let gw = gateway_for_mock(&server, None);
        let envelope = gw.list_activities(9).await.unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.data, None);
        assert_eq!(envelope.message.as_deref(), Some("Not your trek"));
    }

    #[tokio::test]
    async fn non_envelope_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/api/trek-resources/treks/9/images"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let gw = gateway_for_mock(&server, None);
        let err = gw.list_images(9).await.unwrap_err();
        assert_matches!(
            err,
            GatewayError::Decode { status: 500, body } if body.contains("Bad Gateway")
        );
    }

    #[tokio::test]
    async fn unit_calls_ignore_the_data_payload() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("DELETE"))
            .and(matchers::path("/api/trek-resources/treks/9/activities/4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "data": {"deleted": 1}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gw = gateway_for_mock(&server, None);
        let envelope = gw.delete_activity(9, 4).await.unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.data, Some(()));
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn order_update_sends_bearer_token_and_order_body() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("PATCH"))
            .and(matchers::path("/api/trek-resources/treks/9/activities/4/order"))
            .and(matchers::header("authorization", "Bearer s3cret"))
            .and(matchers::body_json(json!({"activityOrder": 2})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "data": activity_json(4, 2)})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gw = gateway_for_mock(&server, Some("s3cret"));
        let envelope = gw.update_activity_order(9, 4, 2).await.unwrap();
        assert!(envelope.success);
        let activity = envelope.data.unwrap();
        assert_eq!((activity.id, activity.activity_order), (4, 2));
    }

    #[tokio::test]
    async fn anonymous_session_sends_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/api/trek-resources/treks/9/activities"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "data": [activity_json(4, 1)]})),
            )
            .mount(&server)
            .await;

        let gw = gateway_for_mock(&server, None);
        let envelope = gw.list_activities(9).await.unwrap();
        assert_eq!(envelope.data.map(|list| list.len()), Some(1));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn upload_posts_multipart_batch() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/api/trek-resources/treks/9/images"))
            .and(matchers::body_string_contains("name=\"isPrimary\""))
            .and(matchers::body_string_contains("filename=\"ridge.jpg\""))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "success": true,
                "data": [{ "id": 11, "trekId": 9, "path": "treks/9/ridge.jpg", "isPrimary": false }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gw = gateway_for_mock(&server, None);
        let files = vec![UploadFile::new("ridge.jpg", "image/jpeg", vec![0xFF; 100])];
        let (reporter, rx) = ProgressReporter::channel();
        let envelope = gw.upload_images(9, &files, Some(&reporter)).await.unwrap();

        assert_eq!(envelope.data.map(|images| images.len()), Some(1));
        assert_eq!(rx.borrow().sent_bytes, 100);

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"isPrimary\"\r\n\r\nfalse\r\n"));
    }
}
