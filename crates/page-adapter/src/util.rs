//! Launcher helpers.

use chromiumoxide::async_process::Child;
use futures::io::{AsyncBufReadExt, BufReader};
use futures::stream::StreamExt;
use tokio::time::{timeout, Duration};

use crate::errors::{PageError, PageErrorKind};

/// Extract the DevTools websocket URL from chromium's stderr output.
pub async fn extract_ws_url(child: &mut Child) -> Result<String, PageError> {
    let stderr = child.stderr.take().ok_or_else(|| {
        PageError::new(PageErrorKind::Internal).with_hint("chromium process missing stderr handle")
    })?;
    let mut lines = BufReader::new(stderr).lines();
    let mut captured = Vec::new();

    let reader = async {
        while let Some(line) = lines.next().await {
            let line = line.map_err(|err| {
                PageError::new(PageErrorKind::CdpIo).with_hint(err.to_string())
            })?;
            captured.push(line.clone());
            if let Some((_, ws)) = line.rsplit_once("listening on ") {
                let ws = ws.trim();
                if ws.starts_with("ws") && ws.contains("devtools/browser") {
                    return Ok(ws.to_string());
                }
            }
        }
        Err(PageError::new(PageErrorKind::CdpIo).with_hint(format!(
            "chromium exited before exposing devtools websocket url. stderr preview: {}",
            captured
                .iter()
                .take(8)
                .cloned()
                .collect::<Vec<_>>()
                .join(" | ")
        )))
    };

    timeout(Duration::from_secs(20), reader).await.map_err(|_| {
        PageError::new(PageErrorKind::NavTimeout)
            .with_hint("timed out waiting for chromium devtools websocket url")
    })?
}
