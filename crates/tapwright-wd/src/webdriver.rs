use fantoccini::{Client, ClientBuilder};
use std::time::Duration;
use tapwright_engine::backend::BackendError;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct WebDriverClient {
    pub client: Client,
}

impl WebDriverClient {
    /// Open a session. Capabilities are sent as given.
    pub async fn connect(
        url: &str,
        capabilities: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, BackendError> {
        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(url)
            .await
            .map_err(|e| {
                BackendError::Session(format!("Failed to connect to WebDriver at {}: {}", url, e))
            })?;

        Ok(Self { client })
    }

    pub async fn close(self) -> Result<(), BackendError> {
        self.client
            .close()
            .await
            .map_err(|e| BackendError::Session(format!("Failed to close session: {}", e)))
    }
}

/// Poll `{server_url}/status` until the server answers with success.
pub async fn wait_for_server(server_url: &str, timeout: Duration) -> Result<(), BackendError> {
    let url = format!("{}/status", server_url.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let deadline = Instant::now() + timeout;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Automation server ready after {} attempts", attempt);
                return Ok(());
            }
            Ok(resp) => debug!("Server answered {} (attempt {})", resp.status(), attempt),
            Err(e) => {
                if attempt % 5 == 0 {
                    info!("Waiting for automation server at {}... ({})", server_url, e);
                }
            }
        }

        if Instant::now() >= deadline {
            return Err(BackendError::NotReady);
        }
        sleep(STATUS_POLL_INTERVAL).await;
    }
}
