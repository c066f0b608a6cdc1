//! Create-or-edit publishing
//!
//! Each destination owns a single Discord message. The first successful post
//! creates it; every later cycle edits it in place. If the stored message has
//! been deleted, a new one is created and its id replaces the old one.

use crate::config::Destination;
use crate::discord::{EditOutcome, WebhookClient, WebhookMessage};
use crate::error::Result;
use crate::state::MessageStateStore;
use tracing::{info, warn};

/// What `publish` ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// No message was stored; a new one was posted
    Created(String),
    /// The stored message was edited in place
    Edited(String),
    /// The stored message was gone; a new one replaced it
    Recreated(String),
}

impl PublishOutcome {
    pub fn message_id(&self) -> &str {
        match self {
            PublishOutcome::Created(id) | PublishOutcome::Edited(id) | PublishOutcome::Recreated(id) => id,
        }
    }
}

pub struct WebhookPublisher<C, M> {
    client: C,
    state: M,
}

impl<C, M> WebhookPublisher<C, M>
where
    C: WebhookClient,
    M: MessageStateStore,
{
    pub fn new(client: C, state: M) -> Self {
        Self { client, state }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn state(&self) -> &M {
        &self.state
    }

    /// Post `message` to `destination`, editing the previous message when one is known
    pub async fn publish(
        &self,
        destination: &Destination,
        message: &WebhookMessage,
    ) -> Result<PublishOutcome> {
        let Some(message_id) = self.state.get(destination).await? else {
            let id = self.create(destination, message).await?;
            info!("[{}] Posted new message {}", destination.label, id);
            return Ok(PublishOutcome::Created(id));
        };

        match self.client.edit(&destination.url, &message_id, message).await? {
            EditOutcome::Edited => {
                info!("[{}] Edited message {}", destination.label, message_id);
                Ok(PublishOutcome::Edited(message_id))
            }
            EditOutcome::NotFound => {
                warn!(
                    "[{}] Message {} no longer exists, posting a new one",
                    destination.label, message_id
                );
                let id = self.create(destination, message).await?;
                info!("[{}] Posted replacement message {}", destination.label, id);
                Ok(PublishOutcome::Recreated(id))
            }
        }
    }

    /// Create a message and record its id before returning
    async fn create(&self, destination: &Destination, message: &WebhookMessage) -> Result<String> {
        let id = self.client.create(&destination.url, message).await?;
        self.state.set(destination, &id).await?;
        Ok(id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::TrackerError;
    use crate::state::InMemoryStateStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Create { webhook_url: String },
        Edit { webhook_url: String, message_id: String },
    }

    /// Records calls; edits answer from a script, defaulting to `Edited`
    #[derive(Default)]
    pub struct FakeWebhookClient {
        pub calls: Mutex<Vec<Call>>,
        pub edit_responses: Mutex<VecDeque<Result<EditOutcome>>>,
        pub fail_creates_for: Mutex<Vec<String>>,
        next_id: AtomicU64,
    }

    impl FakeWebhookClient {
        pub fn new() -> Self {
            Self { next_id: AtomicU64::new(100), ..Default::default() }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn script_edit(&self, response: Result<EditOutcome>) {
            self.edit_responses.lock().unwrap().push_back(response);
        }
    }

    #[async_trait]
    impl WebhookClient for FakeWebhookClient {
        async fn create(&self, webhook_url: &str, _message: &WebhookMessage) -> Result<String> {
            self.calls.lock().unwrap().push(Call::Create { webhook_url: webhook_url.to_string() });
            if self.fail_creates_for.lock().unwrap().iter().any(|u| u == webhook_url) {
                return Err(TrackerError::publish("create rejected with 401 Unauthorized"));
            }
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst).to_string())
        }

        async fn edit(
            &self,
            webhook_url: &str,
            message_id: &str,
            _message: &WebhookMessage,
        ) -> Result<EditOutcome> {
            self.calls.lock().unwrap().push(Call::Edit {
                webhook_url: webhook_url.to_string(),
                message_id: message_id.to_string(),
            });
            self.edit_responses.lock().unwrap().pop_front().unwrap_or(Ok(EditOutcome::Edited))
        }
    }

    fn destination() -> Destination {
        Destination {
            url: "https://discord.com/api/webhooks/1/aaa".to_string(),
            bsgo_url: crate::config::DEFAULT_BSGO_URL.to_string(),
            label: "Webhook 1".to_string(),
        }
    }

    fn message() -> WebhookMessage {
        WebhookMessage { content: "Colonial Players: 1".to_string(), attachments: Vec::new() }
    }

    #[tokio::test]
    async fn test_first_publish_creates_and_stores_id() {
        let publisher = WebhookPublisher::new(FakeWebhookClient::new(), InMemoryStateStore::new());
        let dest = destination();

        let outcome = publisher.publish(&dest, &message()).await.unwrap();

        assert_eq!(outcome, PublishOutcome::Created("100".to_string()));
        assert_eq!(publisher.state().get(&dest).await.unwrap(), Some("100".to_string()));
        assert_eq!(
            publisher.client().calls(),
            vec![Call::Create { webhook_url: dest.url.clone() }]
        );
    }

    #[tokio::test]
    async fn test_publish_with_stored_id_edits_once() {
        let publisher = WebhookPublisher::new(FakeWebhookClient::new(), InMemoryStateStore::new());
        let dest = destination();
        publisher.state().set(&dest, "42").await.unwrap();

        let outcome = publisher.publish(&dest, &message()).await.unwrap();

        assert_eq!(outcome, PublishOutcome::Edited("42".to_string()));
        assert_eq!(
            publisher.client().calls(),
            vec![Call::Edit { webhook_url: dest.url.clone(), message_id: "42".to_string() }]
        );
        assert_eq!(publisher.state().get(&dest).await.unwrap(), Some("42".to_string()));
    }

    #[tokio::test]
    async fn test_missing_message_falls_back_to_create() {
        let client = FakeWebhookClient::new();
        client.script_edit(Ok(EditOutcome::NotFound));
        let publisher = WebhookPublisher::new(client, InMemoryStateStore::new());
        let dest = destination();
        publisher.state().set(&dest, "42").await.unwrap();

        let outcome = publisher.publish(&dest, &message()).await.unwrap();

        assert_eq!(outcome, PublishOutcome::Recreated("100".to_string()));
        assert_eq!(
            publisher.client().calls(),
            vec![
                Call::Edit { webhook_url: dest.url.clone(), message_id: "42".to_string() },
                Call::Create { webhook_url: dest.url.clone() },
            ]
        );
        assert_eq!(publisher.state().get(&dest).await.unwrap(), Some("100".to_string()));
    }

    #[tokio::test]
    async fn test_other_edit_failures_do_not_create() {
        let client = FakeWebhookClient::new();
        client.script_edit(Err(TrackerError::publish("edit rejected with 403 Forbidden")));
        let publisher = WebhookPublisher::new(client, InMemoryStateStore::new());
        let dest = destination();
        publisher.state().set(&dest, "42").await.unwrap();

        let err = publisher.publish(&dest, &message()).await.unwrap_err();

        assert!(matches!(err, TrackerError::Publish { .. }));
        assert_eq!(publisher.client().calls().len(), 1);
        assert_eq!(publisher.state().get(&dest).await.unwrap(), Some("42".to_string()));
    }

    #[tokio::test]
    async fn test_failed_create_leaves_state_empty() {
        let client = FakeWebhookClient::new();
        client.fail_creates_for.lock().unwrap().push(destination().url);
        let publisher = WebhookPublisher::new(client, InMemoryStateStore::new());

        assert!(publisher.publish(&destination(), &message()).await.is_err());
        assert!(publisher.state().is_empty().await);
    }

    #[tokio::test]
    async fn test_unreadable_state_publishes_nothing() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let state = crate::state::FileStateStore::new(temp_dir.path());
        std::fs::create_dir(state.slot_path(&destination())).unwrap();
        let publisher = WebhookPublisher::new(FakeWebhookClient::new(), state);

        let err = publisher.publish(&destination(), &message()).await.unwrap_err();

        assert!(matches!(err, TrackerError::StateStore { .. }));
        assert!(publisher.client().calls().is_empty());
    }
}
