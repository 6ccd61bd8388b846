// Webhook dispatch: fans one fire request out to every configured hook,
// each attempt succeeding or failing independently.

use crate::config::WebhookConfig;
use crate::errors::DispatchError;
use crate::events::EventKind;
use crate::models::{Trigger, TriggerType, WebHook};
use crate::monitor::audit;
use crate::store::TriggerStore;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Delivers all webhooks for one trigger activation. Best-effort,
/// at-most-one-attempt per hook; no retries.
pub struct WebhookDispatcher {
    client: Client,
    store: Arc<dyn TriggerStore>,
    event_ttl: Duration,
}

impl WebhookDispatcher {
    pub fn new(
        config: &WebhookConfig,
        store: Arc<dyn TriggerStore>,
        event_ttl: Duration,
    ) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| DispatchError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            store,
            event_ttl,
        })
    }

    /// Attempt delivery to every hook of `trigger`, in list order. One
    /// hook's failure never aborts the others; failures surface only as
    /// audit entries.
    pub async fn dispatch(&self, trigger: &Trigger) {
        for hook in &trigger.webhooks {
            if let Err(e) = self.send_hook(hook).await {
                error!(
                    trigger_id = %trigger.id,
                    hook_url = %hook.url,
                    error = %e,
                    "webhook delivery failed"
                );
                audit(
                    &*self.store,
                    EventKind::TriggerError,
                    TriggerType::Motion,
                    format!("trigger {} hook {}: {}", trigger.id, hook.url, e),
                    self.event_ttl,
                )
                .await;
            }
        }

        audit(
            &*self.store,
            EventKind::TriggerFired,
            TriggerType::Motion,
            format!("trigger {} ({} webhooks)", trigger.id, trigger.webhooks.len()),
            self.event_ttl,
        )
        .await;
    }

    async fn send_hook(&self, hook: &WebHook) -> Result<(), DispatchError> {
        let headers = Self::build_headers(hook)?;

        let mut request = self
            .client
            .request(hook.http_verb.as_method(), &hook.url)
            .headers(headers);
        if !hook.body.is_empty() {
            request = request.body(hook.body.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| DispatchError::RequestFailed {
                url: hook.url.clone(),
                reason: e.to_string(),
            })?;

        // Delivery is fire-and-forget; the response status is recorded but a
        // non-success status is not treated as a failed attempt.
        debug!(
            hook_url = %hook.url,
            status = %response.status(),
            "webhook delivered"
        );
        Ok(())
    }

    /// Baseline Content-Type from the hook's declared content type, then the
    /// custom header set on top, which may override it.
    fn build_headers(hook: &WebHook) -> Result<HeaderMap, DispatchError> {
        let mut headers = HeaderMap::new();

        let content_type = HeaderValue::from_str(&hook.content_type).map_err(|e| {
            DispatchError::InvalidHeader {
                name: CONTENT_TYPE.to_string(),
                reason: e.to_string(),
            }
        })?;
        headers.insert(CONTENT_TYPE, content_type);

        for (name, value) in &hook.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                DispatchError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| DispatchError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}
