use crate::domain::conversation::ConversationRecord;
use crate::services::secrets::{SecretError, SecretProvider};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const DEFAULT_API_URL: &str = "https://api.elevenlabs.io";

/// Cadence the remote record is re-fetched at while it reports `processing`.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("credential retrieval failed: {0}")]
    Credential(#[from] SecretError),
    #[error("conversation fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("conversation watch ended: {0}")]
    Watch(String),
}

/// Client for the remote conversational-voice platform. The platform owns
/// conversation records; this client only reads them, authenticating each
/// flow with a key fetched from the secret provider at flow start.
#[derive(Clone)]
pub struct VoiceClient {
    http: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    secrets: Arc<dyn SecretProvider>,
}

impl VoiceClient {
    pub fn new(base_url: impl Into<String>, secrets: Arc<dyn SecretProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            poll_interval: POLL_INTERVAL,
            secrets,
        }
    }

    pub fn from_env(secrets: Arc<dyn SecretProvider>) -> Self {
        let base_url =
            std::env::var("VOICE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(base_url, secrets)
    }

    #[cfg(test)]
    fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// One-shot fetch of the remote record, credential included.
    pub async fn fetch_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationRecord, VoiceError> {
        let api_key = self.secrets.voice_api_key().await?;
        self.fetch_with_key(&api_key, conversation_id).await
    }

    async fn fetch_with_key(
        &self,
        api_key: &str,
        conversation_id: &str,
    ) -> Result<ConversationRecord, VoiceError> {
        let url = format!(
            "{}/v1/convai/conversations/{}",
            self.base_url, conversation_id
        );
        let record = self
            .http
            .get(&url)
            .header("xi-api-key", api_key)
            .send()
            .await?
            .error_for_status()?
            .json::<ConversationRecord>()
            .await?;
        Ok(record)
    }

    /// Starts the retrieval flow for one conversation: an initial fetch, then
    /// a re-fetch every `poll_interval` while the record is `processing`.
    /// Terminal on `done`/`error` and on the first fetch failure of any kind;
    /// failures are never retried. Dropping the returned watcher aborts the
    /// flow.
    pub fn watch(&self, conversation_id: String) -> AnalysisWatcher {
        let (tx, rx) = watch::channel(WatchState::Processing);
        let client = self.clone();
        let handle = tokio::spawn(async move {
            // one credential per flow invocation, never reused across flows
            let api_key = match client.secrets.voice_api_key().await {
                Ok(key) => key,
                Err(err) => {
                    tracing::error!(conversation = %conversation_id, error = %err, "credential retrieval failed");
                    let _ = tx.send(WatchState::Failed(err.to_string()));
                    return;
                }
            };
            loop {
                match client.fetch_with_key(&api_key, &conversation_id).await {
                    Ok(record) if record.status.is_terminal() => {
                        let _ = tx.send(WatchState::Finished(Box::new(record)));
                        return;
                    }
                    Ok(_) => {
                        let _ = tx.send(WatchState::Processing);
                    }
                    Err(err) => {
                        tracing::error!(conversation = %conversation_id, error = %err, "conversation fetch failed, stopping watch");
                        let _ = tx.send(WatchState::Failed(err.to_string()));
                        return;
                    }
                }
                tokio::time::sleep(client.poll_interval).await;
            }
        });
        AnalysisWatcher { rx, handle }
    }

    /// Convenience for callers that only want the terminal record.
    pub async fn poll_until_terminal(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationRecord, VoiceError> {
        let mut watcher = self.watch(conversation_id.to_string());
        watcher.wait().await
    }
}

#[derive(Debug, Clone)]
pub enum WatchState {
    Processing,
    Finished(Box<ConversationRecord>),
    Failed(String),
}

/// Handle to a running retrieval flow. The polling task is owned here and
/// aborted on drop, so an abandoned flow (client gone, handler dropped)
/// cannot keep fetching in the background.
pub struct AnalysisWatcher {
    rx: watch::Receiver<WatchState>,
    handle: JoinHandle<()>,
}

impl AnalysisWatcher {
    /// Blocks until the flow is terminal. Later updates overwrite earlier
    /// ones on the channel, which is fine: the record only ever progresses
    /// from processing to done/error.
    pub async fn wait(&mut self) -> Result<ConversationRecord, VoiceError> {
        loop {
            let current = self.rx.borrow_and_update().clone();
            match current {
                WatchState::Finished(record) => return Ok(*record),
                WatchState::Failed(message) => return Err(VoiceError::Watch(message)),
                WatchState::Processing => {}
            }
            if self.rx.changed().await.is_err() {
                return Err(VoiceError::Watch("watch task stopped".to_string()));
            }
        }
    }
}

impl Drop for AnalysisWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::ConversationStatus;
    use crate::services::secrets::testing::StaticSecrets;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn secrets() -> Arc<dyn SecretProvider> {
        Arc::new(StaticSecrets {
            key: Some("test-key".to_string()),
        })
    }

    fn client(server: &MockServer) -> VoiceClient {
        VoiceClient::new(server.uri(), secrets()).with_poll_interval(Duration::from_millis(25))
    }

    fn body(status: &str) -> serde_json::Value {
        json!({
            "conversation_id": "conv_1",
            "status": status,
            "transcript": [],
            "analysis": null
        })
    }

    #[tokio::test]
    async fn polls_until_done_then_stops() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/convai/conversations/conv_1"))
            .and(header("xi-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body("processing")))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/convai/conversations/conv_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body("done")))
            .mount(&server)
            .await;

        let record = client(&server).poll_until_terminal("conv_1").await.unwrap();
        assert_eq!(record.status, ConversationStatus::Done);

        // two processing responses plus the terminal one: exactly 3 fetches
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failed_fetch_is_terminal_after_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/convai/conversations/conv_1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).poll_until_terminal("conv_1").await;
        assert!(err.is_err());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_credential_never_reaches_the_api() {
        let server = MockServer::start().await;
        let voice = VoiceClient::new(server.uri(), Arc::new(StaticSecrets { key: None }))
            .with_poll_interval(Duration::from_millis(25));

        let err = voice.poll_until_terminal("conv_1").await;
        assert!(err.is_err());
        assert_eq!(server.received_requests().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn dropping_the_watcher_stops_polling() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/convai/conversations/conv_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body("processing")))
            .mount(&server)
            .await;

        let voice = client(&server);
        let watcher = voice.watch("conv_1".to_string());
        tokio::time::sleep(Duration::from_millis(70)).await;
        drop(watcher);

        // let any in-flight request land before taking the baseline
        tokio::time::sleep(Duration::from_millis(30)).await;
        let seen = server.received_requests().await.unwrap().len();
        assert!(seen >= 1);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(server.received_requests().await.unwrap().len(), seen);
    }
}
