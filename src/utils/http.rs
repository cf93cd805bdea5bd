use std::future::Future;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{Level, debug, warn};

use crate::error::{Error, Result};

/// Sends a request and turns non-2xx statuses into `Error::Rejected`.
///
/// The rejection carries the `message` field of the JSON error body when
/// there is one, else `fallback_message`. Requests running past
/// `slow_threshold` are logged.
pub async fn request(
    client: &reqwest::Client,
    slow_threshold: Duration,
    fallback_message: &str,
    req_builder: impl FnOnce(&reqwest::Client) -> reqwest::RequestBuilder,
) -> Result<reqwest::Response> {
    let request = req_builder(client).build()?;
    let label = format!("{} {}", request.method(), request.url());
    let resp = log_if_slow(&label, slow_threshold, client.execute(request)).await?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await?;
    let message = rejection_message(&body).unwrap_or_else(|| fallback_message.to_owned());
    debug!("{label} rejected with {status}: {message}");
    Err(Error::rejected(status.as_u16(), message))
}

/// Reads a response body as JSON, reporting shape mismatches as `Error::Parse`.
pub async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let url = resp.url().clone();
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::parse(format!("{url}: {e}")))
}

fn rejection_message(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct Rejection {
        message: Option<String>,
    }

    serde_json::from_str::<Rejection>(body)
        .ok()?
        .message
        .filter(|m| !m.is_empty())
}

async fn log_if_slow<F: Future>(label: &str, threshold: Duration, future: F) -> F::Output {
    if !tracing::enabled!(Level::WARN) {
        return future.await;
    }
    let start = Instant::now();
    tokio::pin!(future);
    tokio::select! {
        biased;
        output = &mut future => output,
        _ = sleep(threshold) => {
            warn!("{label} still running after {}s", threshold.as_secs_f32());
            let output = future.await;
            warn!("{label} finished after {}s", start.elapsed().as_secs_f32());
            output
        }
    }
}
