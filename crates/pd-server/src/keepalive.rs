//! Periodic self-ping.
//!
//! Free-tier hosts put idle services to sleep. This task issues a GET to the
//! service's own public URL right away and then on a fixed interval, until
//! its cancellation token fires.

use std::time::Duration;

use pd_core::config::Config;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn the keep-alive task, or return `None` when it is disabled.
pub fn spawn_keepalive(config: &Config, cancel: CancellationToken) -> Option<JoinHandle<()>> {
    let settings = &config.keepalive;
    if !settings.enabled || settings.interval_secs == 0 {
        tracing::debug!("Keep-alive disabled");
        return None;
    }

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Keep-alive disabled: failed to build HTTP client: {e}");
            return None;
        }
    };

    let url = config.keepalive_url();
    let period = Duration::from_secs(settings.interval_secs);
    tracing::info!("Keep-alive pinging {url} every {}s", period.as_secs());

    Some(tokio::spawn(run_keepalive(client, url, period, cancel)))
}

async fn run_keepalive(
    client: reqwest::Client,
    url: String,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        // The first tick completes immediately.
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ping(&client, &url) => {}
        }
    }

    tracing::debug!("Keep-alive task stopped");
}

/// Issue one ping. Returns the response status, or `None` on failure.
pub async fn ping(client: &reqwest::Client, url: &str) -> Option<u16> {
    match client.get(url).send().await {
        Ok(resp) => {
            let status = resp.status().as_u16();
            tracing::info!(status, "Keep-alive ping to {url}");
            Some(status)
        }
        Err(e) => {
            tracing::warn!("Keep-alive ping to {url} failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn counting_server() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = axum::Router::new().route(
            "/",
            axum::routing::get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    "ok"
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (format!("http://{addr}/"), hits)
    }

    #[test]
    fn disabled_keepalive_spawns_nothing() {
        let mut config = Config::default();
        config.keepalive.enabled = false;
        assert!(spawn_keepalive(&config, CancellationToken::new()).is_none());

        let mut config = Config::default();
        config.keepalive.interval_secs = 0;
        assert!(spawn_keepalive(&config, CancellationToken::new()).is_none());
    }

    #[tokio::test]
    async fn ping_reports_status() {
        let (url, hits) = counting_server().await;
        let client = reqwest::Client::new();
        assert_eq!(ping(&client, &url).await, Some(200));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ping_failure_is_none() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = reqwest::Client::new();
        assert_eq!(ping(&client, &format!("http://{addr}/")).await, None);
    }

    #[tokio::test]
    async fn pings_immediately_and_stops_on_cancel() {
        let (url, hits) = counting_server().await;

        let mut config = Config::default();
        config.keepalive.url = Some(url);
        config.keepalive.interval_secs = 3600;

        let cancel = CancellationToken::new();
        let handle = spawn_keepalive(&config, cancel.clone()).unwrap();

        for _ in 0..50 {
            if hits.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("keep-alive task did not stop")
            .unwrap();
    }
}
