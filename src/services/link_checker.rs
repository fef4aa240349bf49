//! Bulk URL liveness checking.
//!
//! Bookmarks are probed in fixed-size batches: every probe in a batch runs
//! concurrently, batches run one after another with a short pause between
//! them. Each probe is bounded by a timeout that drops the in-flight request.
//! Timeouts, errors and negative answers all count as invalid.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;

use crate::types::bookmark::Bookmark;
use crate::types::errors::ProbeError;
use crate::types::settings::LinkCheckSettings;

/// Answers whether a URL is reachable.
pub trait LinkProbe {
    fn probe(&self, url: &str) -> impl Future<Output = Result<bool, ProbeError>> + Send;
}

/// Probes with an HTTP `HEAD` request; any 2xx status is alive.
#[cfg(feature = "network")]
#[derive(Debug, Clone, Default)]
pub struct HttpProbe {
    client: reqwest::Client,
}

#[cfg(feature = "network")]
impl HttpProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "network")]
impl LinkProbe for HttpProbe {
    fn probe(&self, url: &str) -> impl Future<Output = Result<bool, ProbeError>> + Send {
        let request = self.client.head(url).send();
        async move {
            let response = request
                .await
                .map_err(|e| ProbeError::Network(e.to_string()))?;
            Ok(response.status().is_success())
        }
    }
}

pub struct LinkChecker<P> {
    probe: P,
    settings: LinkCheckSettings,
}

impl<P: LinkProbe + Sync> LinkChecker<P> {
    pub fn new(probe: P, settings: LinkCheckSettings) -> Self {
        Self { probe, settings }
    }

    pub fn settings(&self) -> &LinkCheckSettings {
        &self.settings
    }

    /// Probes one URL under the per-item timeout.
    pub async fn check_one(&self, url: &str) -> bool {
        let limit = Duration::from_millis(self.settings.timeout_ms);
        match tokio::time::timeout(limit, self.probe.probe(url)).await {
            Ok(Ok(alive)) => {
                if !alive {
                    tracing::debug!(url, "link answered with a failure status");
                }
                alive
            }
            Ok(Err(err)) => {
                tracing::debug!(url, error = %err, "link probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(url, error = %ProbeError::Timeout(url.to_string()), "link probe cancelled");
                false
            }
        }
    }

    /// Returns the bookmarks whose URL did not answer as alive, in input order.
    pub async fn find_invalid(&self, bookmarks: &[Bookmark]) -> Vec<Bookmark> {
        let batch_size = self.settings.batch_size.max(1);
        let pause = Duration::from_millis(self.settings.batch_pause_ms);
        let mut invalid = Vec::new();

        for (batch_no, batch) in bookmarks.chunks(batch_size).enumerate() {
            if batch_no > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            let verdicts = join_all(batch.iter().map(|b| self.check_one(&b.url))).await;
            invalid.extend(
                batch
                    .iter()
                    .zip(verdicts)
                    .filter(|(_, alive)| !alive)
                    .map(|(b, _)| b.clone()),
            );
        }

        tracing::info!(
            checked = bookmarks.len(),
            invalid = invalid.len(),
            "link check finished"
        );
        invalid
    }
}
