// src/browser/mod.rs
//
// Shared headless-browser lifecycle. One browser process is live at a time;
// it is launched lazily, reused across scrapes, and evicted after sitting
// idle past `BROWSER_IDLE_TIMEOUT`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::BROWSER_IDLE_TIMEOUT;
use crate::error::ScrapeError;
use crate::utils::env_override;

/// Owns the process-wide browser handle. Create one at startup, inject it
/// where scrapes run, and call [`shutdown`](Self::shutdown) on exit.
pub struct BrowserManager {
    // The mutex serializes the check-and-launch sequence; concurrent
    // acquisitions can never race into two live browsers.
    slot: Mutex<Option<BrowserHandle>>,
}

struct BrowserHandle {
    browser: Browser,
    handler_task: JoinHandle<()>,
    closed: Arc<AtomicBool>,
    last_used: Instant,
}

impl BrowserHandle {
    async fn launch() -> Result<Self, ScrapeError> {
        let mut builder = BrowserConfig::builder();

        // Constrained deployments point at their own binary and usually
        // cannot run the sandbox. Both are configuration, not contract.
        if let Some(path) = env_override("CHROME_PATH") {
            builder = builder.chrome_executable(path);
        }
        if env_override("CHROME_NO_SANDBOX").is_some() {
            builder = builder.no_sandbox();
        }

        let config = builder.build().map_err(ScrapeError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::BrowserLaunch(e.to_string()))?;

        // The handler drives the CDP websocket; when its stream ends the
        // connection is gone and the handle must not be reused.
        let closed = Arc::new(AtomicBool::new(false));
        let closed_flag = Arc::clone(&closed);
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("cdp handler event error: {e}");
                }
            }
            closed_flag.store(true, Ordering::SeqCst);
        });

        Ok(Self {
            browser,
            handler_task,
            closed,
            last_used: Instant::now(),
        })
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    fn idle_expired(&self) -> bool {
        self.last_used.elapsed() > BROWSER_IDLE_TIMEOUT
    }

    async fn teardown(mut self) {
        let _ = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }
}

impl BrowserManager {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Open a fresh page, reusing the live browser when possible.
    ///
    /// A handle that has disconnected or exceeded the idle window is torn
    /// down and replaced. Launch failures surface as
    /// [`ScrapeError::BrowserLaunch`]; retrying is the caller's decision.
    pub async fn acquire_page(&self) -> Result<Page, ScrapeError> {
        let mut slot = self.slot.lock().await;

        if let Some(mut handle) = slot.take() {
            if handle.is_connected() && !handle.idle_expired() {
                handle.last_used = Instant::now();
                match handle.browser.new_page("about:blank").await {
                    Ok(page) => {
                        *slot = Some(handle);
                        return Ok(page);
                    }
                    Err(e) => {
                        warn!("stale browser could not open a page, relaunching: {e}");
                        handle.teardown().await;
                    }
                }
            } else {
                debug!("evicting browser (disconnected or idle past timeout)");
                handle.teardown().await;
            }
        }

        let handle = BrowserHandle::launch().await?;
        let page = handle
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::BrowserLaunch(e.to_string()))?;
        *slot = Some(handle);

        Ok(page)
    }

    pub async fn is_alive(&self) -> bool {
        matches!(self.slot.lock().await.as_ref(), Some(h) if h.is_connected())
    }

    /// Tear down the browser process if one is live. Safe to call twice.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.slot.lock().await.take() {
            handle.teardown().await;
        }
    }
}

impl Default for BrowserManager {
    fn default() -> Self {
        Self::new()
    }
}
