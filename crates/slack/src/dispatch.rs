use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use slashkit_core::config::DispatchConfig;
use slashkit_core::domain::request::{CallbackUrlError, CommandRequest};
use slashkit_core::domain::response::{Attachment, ResponseMessage, ResponseType};
use thiserror::Error;
use tracing::{debug, warn};

use crate::capture::{CapturedMessage, CapturedOutput};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("http client could not be built: {0}")]
    Client(String),
    #[error("callback post failed: {0}")]
    Send(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    CallbackUrl(#[from] CallbackUrlError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("callback endpoint answered with status {0}")]
    Rejected(u16),
}

/// Posts a response body to a callback URL and reports the HTTP status.
#[async_trait]
pub trait ResponseTransport: Send + Sync {
    async fn post_json(&self, url: &Url, message: &ResponseMessage) -> Result<u16, TransportError>;
}

/// `reqwest`-backed transport. Cloning shares the underlying connection pool.
#[derive(Clone, Debug)]
pub struct HttpResponseTransport {
    client: Client,
}

impl HttpResponseTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &DispatchConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout_secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }

        let client = builder.build().map_err(|error| TransportError::Client(error.to_string()))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl ResponseTransport for HttpResponseTransport {
    async fn post_json(&self, url: &Url, message: &ResponseMessage) -> Result<u16, TransportError> {
        let response = self
            .client
            .post(url.clone())
            .json(message)
            .send()
            .await
            .map_err(|error| TransportError::Send(error.to_string()))?;

        Ok(response.status().as_u16())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::RecordingTransport;

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use reqwest::Url;
    use slashkit_core::domain::response::ResponseMessage;
    use tokio::sync::Mutex;

    use super::{ResponseTransport, TransportError};

    /// In-memory transport that records every post and answers from a script
    /// (default `200`).
    #[derive(Debug, Default)]
    pub struct RecordingTransport {
        state: Mutex<RecordingState>,
    }

    #[derive(Debug, Default)]
    struct RecordingState {
        responses: VecDeque<Result<u16, TransportError>>,
        posts: Vec<(Url, ResponseMessage)>,
    }

    impl RecordingTransport {
        pub fn with_responses(responses: Vec<Result<u16, TransportError>>) -> Self {
            Self {
                state: Mutex::new(RecordingState {
                    responses: responses.into(),
                    posts: Vec::new(),
                }),
            }
        }

        pub async fn posts(&self) -> Vec<(Url, ResponseMessage)> {
            self.state.lock().await.posts.clone()
        }

        pub async fn messages(&self) -> Vec<ResponseMessage> {
            self.state.lock().await.posts.iter().map(|(_, message)| message.clone()).collect()
        }
    }

    #[async_trait]
    impl ResponseTransport for RecordingTransport {
        async fn post_json(
            &self,
            url: &Url,
            message: &ResponseMessage,
        ) -> Result<u16, TransportError> {
            let mut state = self.state.lock().await;
            state.posts.push((url.clone(), message.clone()));
            state.responses.pop_front().unwrap_or(Ok(200))
        }
    }
}

/// Result of delivering one invocation's captured output. `None` means no
/// post was attempted for that channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub broadcast: Option<bool>,
    pub private: Option<bool>,
}

#[derive(Clone)]
pub struct ResponseDispatcher {
    transport: Arc<dyn ResponseTransport>,
}

impl ResponseDispatcher {
    pub fn new(transport: Arc<dyn ResponseTransport>) -> Self {
        Self { transport }
    }

    /// Single-attempt post of a `kind` message to the request's callback URL.
    /// Returns `true` only for a 2xx answer; every failure is logged and
    /// reported as `false`.
    pub async fn post(
        &self,
        request: &CommandRequest,
        kind: ResponseType,
        text: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> bool {
        let message = ResponseMessage::new(kind, text, attachments);
        match self.try_post(request, &message).await {
            Ok(status) => {
                debug!(
                    event_name = "dispatch.callback.posted",
                    command = %request.command,
                    channel_id = %request.channel_id,
                    response_type = %kind,
                    status,
                    "posted command response"
                );
                true
            }
            Err(error) => {
                warn!(
                    event_name = "dispatch.callback.failed",
                    command = %request.command,
                    channel_id = %request.channel_id,
                    response_type = %kind,
                    error = %error,
                    "command response was not delivered"
                );
                false
            }
        }
    }

    pub async fn respond_in_channel(
        &self,
        request: &CommandRequest,
        text: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> bool {
        self.post(request, ResponseType::InChannel, text, attachments).await
    }

    pub async fn respond_ephemeral(
        &self,
        request: &CommandRequest,
        text: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> bool {
        self.post(request, ResponseType::Ephemeral, text, attachments).await
    }

    /// Posts the broadcast message and then the private one, skipping
    /// whichever is empty. A failed broadcast does not cancel the private
    /// post.
    pub async fn deliver(
        &self,
        request: &CommandRequest,
        captured: CapturedOutput,
    ) -> DeliveryReport {
        let CapturedOutput { broadcast, private } = captured;
        DeliveryReport {
            broadcast: self.post_captured(request, ResponseType::InChannel, broadcast).await,
            private: self.post_captured(request, ResponseType::Ephemeral, private).await,
        }
    }

    async fn post_captured(
        &self,
        request: &CommandRequest,
        kind: ResponseType,
        message: CapturedMessage,
    ) -> Option<bool> {
        if message.is_empty() {
            return None;
        }
        Some(self.post(request, kind, message.text, message.attachments).await)
    }

    async fn try_post(
        &self,
        request: &CommandRequest,
        message: &ResponseMessage,
    ) -> Result<u16, DispatchError> {
        let url = request.callback_url()?;
        let status = self.transport.post_json(&url, message).await?;
        if (200..300).contains(&status) {
            Ok(status)
        } else {
            Err(DispatchError::Rejected(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, State};
    use axum::http::header::CONTENT_TYPE;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use reqwest::Url;
    use serde_json::{json, Value};
    use slashkit_core::config::DispatchConfig;
    use slashkit_core::domain::request::CommandRequest;
    use slashkit_core::domain::response::{Attachment, ResponseMessage, ResponseType};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    use super::{
        DeliveryReport, HttpResponseTransport, RecordingTransport, ResponseDispatcher,
        ResponseTransport, TransportError,
    };
    use crate::capture::{CapturedMessage, CapturedOutput};

    const CALLBACK: &str = "https://hooks.slack.com/commands/T1/99/xyz";

    fn request(response_url: Option<&str>) -> CommandRequest {
        CommandRequest {
            command: "/deploy".to_owned(),
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            response_url: response_url.map(str::to_owned),
            ..CommandRequest::default()
        }
    }

    fn captured(broadcast: &str, private: &str) -> CapturedOutput {
        CapturedOutput {
            broadcast: CapturedMessage { text: broadcast.to_owned(), attachments: Vec::new() },
            private: CapturedMessage { text: private.to_owned(), attachments: Vec::new() },
        }
    }

    /// Requests seen by the local callback endpoint: content type and raw body.
    type ReceivedCallbacks = Arc<Mutex<Vec<(Option<String>, String)>>>;

    async fn record_callback(
        State(received): State<ReceivedCallbacks>,
        Path(status): Path<u16>,
        headers: HeaderMap,
        body: String,
    ) -> StatusCode {
        let content_type =
            headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()).map(str::to_owned);
        received.lock().await.push((content_type, body));
        StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST)
    }

    /// Serves `POST /status/{status}` on an ephemeral local port and answers
    /// with the status named in the path.
    async fn callback_endpoint() -> (String, ReceivedCallbacks) {
        let received = ReceivedCallbacks::default();
        let router = Router::new()
            .route("/status/{status}", post(record_callback))
            .with_state(received.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind callback endpoint");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve callback endpoint");
        });
        (format!("http://{address}"), received)
    }

    fn http_transport() -> HttpResponseTransport {
        HttpResponseTransport::from_config(&DispatchConfig {
            timeout_secs: Some(5),
            user_agent: "slashkit-test".to_owned(),
        })
        .expect("http transport")
    }

    fn http_dispatcher() -> ResponseDispatcher {
        ResponseDispatcher::new(Arc::new(http_transport()))
    }

    #[tokio::test]
    async fn http_transport_posts_json_body_and_reports_status() {
        let (base, received) = callback_endpoint().await;
        let transport = http_transport();
        let message = ResponseMessage::ephemeral(
            "build 42 failed\n",
            vec![Attachment::new("step: test").with_field("color", "danger")],
        );

        let url = Url::parse(&format!("{base}/status/202")).expect("url");
        let status = transport.post_json(&url, &message).await.expect("post");

        assert_eq!(status, 202);
        let received = received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0.as_deref(), Some("application/json"));
        let body: Value = serde_json::from_str(&received[0].1).expect("json body");
        assert_eq!(
            body,
            json!({
                "response_type": "ephemeral",
                "text": "build 42 failed\n",
                "attachments": [{ "text": "step: test", "color": "danger" }],
            })
        );
    }

    #[tokio::test]
    async fn http_post_maps_real_status_to_delivery_result() {
        let (base, received) = callback_endpoint().await;
        let dispatcher = http_dispatcher();

        let accepted_url = format!("{base}/status/200");
        let rejected_url = format!("{base}/status/500");

        let accepted = dispatcher
            .respond_in_channel(&request(Some(accepted_url.as_str())), "ok", Vec::new())
            .await;
        let rejected = dispatcher
            .respond_in_channel(&request(Some(rejected_url.as_str())), "ok", Vec::new())
            .await;

        assert!(accepted);
        assert!(!rejected);
        let received = received.lock().await;
        assert_eq!(received.len(), 2, "each post is a single attempt");
        let body: Value = serde_json::from_str(&received[0].1).expect("json body");
        assert_eq!(body, json!({ "response_type": "in_channel", "text": "ok", "attachments": [] }));
    }

    #[tokio::test]
    async fn http_post_to_closed_port_is_not_delivered() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        drop(listener);
        let closed_url = format!("http://{address}/hook");

        let delivered = http_dispatcher()
            .respond_ephemeral(&request(Some(closed_url.as_str())), "lost", Vec::new())
            .await;

        assert!(!delivered);
    }

    #[tokio::test]
    async fn post_sends_message_to_callback_url() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ResponseDispatcher::new(transport.clone());

        let delivered = dispatcher
            .post(&request(Some(CALLBACK)), ResponseType::Ephemeral, "hi", vec![Attachment::new("a")])
            .await;

        assert!(delivered);
        let posts = transport.posts().await;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0.as_str(), CALLBACK);
        assert_eq!(posts[0].1, ResponseMessage::ephemeral("hi", vec![Attachment::new("a")]));
    }

    #[tokio::test]
    async fn any_2xx_status_counts_as_success() {
        let transport =
            Arc::new(RecordingTransport::with_responses(vec![Ok(200), Ok(202), Ok(204)]));
        let dispatcher = ResponseDispatcher::new(transport);
        let request = request(Some(CALLBACK));

        for _ in 0..3 {
            assert!(dispatcher.respond_in_channel(&request, "ok", Vec::new()).await);
        }
    }

    #[tokio::test]
    async fn non_success_status_and_transport_errors_yield_false_without_retry() {
        let transport = Arc::new(RecordingTransport::with_responses(vec![
            Ok(404),
            Ok(500),
            Ok(302),
            Err(TransportError::Send("connection reset".to_owned())),
        ]));
        let dispatcher = ResponseDispatcher::new(transport.clone());
        let request = request(Some(CALLBACK));

        for _ in 0..4 {
            assert!(!dispatcher.respond_ephemeral(&request, "nope", Vec::new()).await);
        }
        assert_eq!(transport.posts().await.len(), 4, "each failure is a single attempt");
    }

    #[tokio::test]
    async fn missing_or_invalid_callback_url_is_a_failure_without_post() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ResponseDispatcher::new(transport.clone());

        assert!(!dispatcher.respond_in_channel(&request(None), "lost", Vec::new()).await);
        assert!(!dispatcher.respond_in_channel(&request(Some("not a url")), "lost", Vec::new()).await);
        assert!(transport.posts().await.is_empty());
    }

    #[tokio::test]
    async fn deliver_sends_nothing_for_empty_buffers() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ResponseDispatcher::new(transport.clone());

        let report = dispatcher.deliver(&request(Some(CALLBACK)), captured("", "")).await;

        assert_eq!(report, DeliveryReport { broadcast: None, private: None });
        assert!(transport.posts().await.is_empty());
    }

    #[tokio::test]
    async fn deliver_sends_only_private_when_broadcast_is_empty() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ResponseDispatcher::new(transport.clone());

        let report = dispatcher.deliver(&request(Some(CALLBACK)), captured("", "oops\n")).await;

        assert_eq!(report, DeliveryReport { broadcast: None, private: Some(true) });
        assert_eq!(transport.messages().await, vec![ResponseMessage::ephemeral("oops\n", vec![])]);
    }

    #[tokio::test]
    async fn deliver_sends_broadcast_before_private() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ResponseDispatcher::new(transport.clone());

        dispatcher.deliver(&request(Some(CALLBACK)), captured("all\n", "me\n")).await;

        let kinds: Vec<_> =
            transport.messages().await.into_iter().map(|message| message.response_type).collect();
        assert_eq!(kinds, vec![ResponseType::InChannel, ResponseType::Ephemeral]);
    }

    #[tokio::test]
    async fn failed_broadcast_does_not_cancel_private_post() {
        let transport = Arc::new(RecordingTransport::with_responses(vec![Ok(500), Ok(200)]));
        let dispatcher = ResponseDispatcher::new(transport.clone());

        let report = dispatcher.deliver(&request(Some(CALLBACK)), captured("all\n", "me\n")).await;

        assert_eq!(report, DeliveryReport { broadcast: Some(false), private: Some(true) });
        assert_eq!(transport.posts().await.len(), 2);
    }

    #[tokio::test]
    async fn attachments_alone_are_delivered() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ResponseDispatcher::new(transport.clone());
        let output = CapturedOutput {
            broadcast: CapturedMessage {
                text: String::new(),
                attachments: vec![Attachment::new("graph")],
            },
            private: CapturedMessage::default(),
        };

        let report = dispatcher.deliver(&request(Some(CALLBACK)), output).await;

        assert_eq!(report.broadcast, Some(true));
        assert_eq!(
            transport.messages().await,
            vec![ResponseMessage::in_channel("", vec![Attachment::new("graph")])]
        );
    }
}
