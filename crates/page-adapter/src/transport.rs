//! CDP command transport.
//!
//! A thin command loop over the chromium websocket: callers submit
//! `(target, method, params)` and receive the raw JSON result. The
//! transport owns the browser child process and the single page session
//! this system drives.

use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::async_process::Child;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::target::SessionId as CdpSessionId;
use chromiumoxide::cdp::events::CdpEventMessage;
use chromiumoxide::conn::Connection;
use chromiumoxide::error::CdpError;
use chromiumoxide_types::{CallId, Message, MethodId, Response};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::CdpConfig;
use crate::errors::{PageError, PageErrorKind};
use crate::util::extract_ws_url;

#[derive(Clone, Debug)]
pub enum CommandTarget {
    /// Browser-level command (target discovery, attach).
    Browser,
    /// The attached page session.
    Page,
}

#[async_trait]
pub trait CdpTransport: Send + Sync {
    /// Launch or attach, and bind the page session.
    async fn start(&self) -> Result<(), PageError>;

    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, PageError>;
}

/// Transport stand-in for contexts with no browser wired up.
#[derive(Default)]
pub struct NoopTransport;

#[async_trait]
impl CdpTransport for NoopTransport {
    async fn start(&self) -> Result<(), PageError> {
        Ok(())
    }

    async fn send_command(
        &self,
        _target: CommandTarget,
        method: &str,
        _params: Value,
    ) -> Result<Value, PageError> {
        Err(PageError::new(PageErrorKind::Internal)
            .with_hint(format!("transport not available for method {method}")))
    }
}

pub struct ChromiumTransport {
    cfg: CdpConfig,
    state: Mutex<Option<Arc<RuntimeState>>>,
    session: Mutex<Option<String>>,
}

impl ChromiumTransport {
    pub fn new(cfg: CdpConfig) -> Self {
        Self {
            cfg,
            state: Mutex::new(None),
            session: Mutex::new(None),
        }
    }

    async fn runtime(&self) -> Result<Arc<RuntimeState>, PageError> {
        let mut guard = self.state.lock().await;
        if let Some(rt) = guard.as_ref() {
            if rt.is_alive() {
                return Ok(rt.clone());
            }
            // connection died, the bound session went with it
            *self.session.lock().await = None;
        }
        let runtime = Arc::new(RuntimeState::start(self.cfg.clone()).await?);
        *guard = Some(runtime.clone());
        Ok(runtime)
    }

    async fn page_session(&self) -> Result<String, PageError> {
        self.session.lock().await.clone().ok_or_else(|| {
            PageError::new(PageErrorKind::Internal)
                .with_hint("page session not bound; call start() first")
        })
    }

    /// Pick an existing page target (or create one) and attach to it.
    async fn bind_page_session(&self, runtime: &Arc<RuntimeState>) -> Result<(), PageError> {
        let deadline = Duration::from_millis(self.cfg.default_deadline_ms);

        let targets = runtime
            .send_internal(None, "Target.getTargets", json!({}), deadline)
            .await?;
        let mut target_id = targets
            .get("targetInfos")
            .and_then(Value::as_array)
            .and_then(|infos| {
                infos.iter().find(|info| {
                    info.get("type").and_then(Value::as_str) == Some("page")
                })
            })
            .and_then(|info| info.get("targetId").and_then(Value::as_str))
            .map(|id| id.to_string());

        if target_id.is_none() {
            let created = runtime
                .send_internal(
                    None,
                    "Target.createTarget",
                    json!({ "url": "about:blank" }),
                    deadline,
                )
                .await?;
            target_id = created
                .get("targetId")
                .and_then(Value::as_str)
                .map(|id| id.to_string());
        }

        let target_id = target_id.ok_or_else(|| {
            PageError::new(PageErrorKind::CdpIo).with_hint("no page target available")
        })?;

        let attached = runtime
            .send_internal(
                None,
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
                deadline,
            )
            .await?;
        let session_id = attached
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PageError::new(PageErrorKind::CdpIo).with_hint("attachToTarget returned no session")
            })?;

        runtime
            .send_internal(
                Some(session_id.to_string()),
                "Page.enable",
                json!({}),
                deadline,
            )
            .await?;
        runtime
            .send_internal(
                Some(session_id.to_string()),
                "Runtime.enable",
                json!({}),
                deadline,
            )
            .await?;

        info!(target = %target_id, "page session bound");
        *self.session.lock().await = Some(session_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl CdpTransport for ChromiumTransport {
    async fn start(&self) -> Result<(), PageError> {
        let runtime = self.runtime().await?;
        self.bind_page_session(&runtime).await
    }

    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, PageError> {
        let runtime = self.runtime().await?;
        let session = match target {
            CommandTarget::Browser => None,
            CommandTarget::Page => Some(self.page_session().await?),
        };
        runtime
            .send_internal(
                session,
                method,
                params,
                Duration::from_millis(self.cfg.default_deadline_ms),
            )
            .await
    }
}

struct ControlMessage {
    session: Option<String>,
    method: String,
    params: Value,
    responder: oneshot::Sender<Result<Value, PageError>>,
}

struct RuntimeState {
    command_tx: mpsc::Sender<ControlMessage>,
    loop_task: JoinHandle<()>,
    child: Mutex<Option<Child>>,
    alive: Arc<AtomicBool>,
}

impl RuntimeState {
    async fn start(cfg: CdpConfig) -> Result<Self, PageError> {
        let (child, ws_url) = if let Some(url) = cfg.websocket_url.clone() {
            (None, url)
        } else {
            let browser_cfg = Self::browser_config(&cfg)?;
            Self::launch_browser(browser_cfg).await?
        };

        let conn = Connection::<CdpEventMessage>::connect(&ws_url)
            .await
            .map_err(|err| PageError::new(PageErrorKind::CdpIo).with_hint(err.to_string()))?;

        let (command_tx, command_rx) = mpsc::channel(128);
        let alive = Arc::new(AtomicBool::new(true));
        let loop_alive = alive.clone();

        let loop_task = tokio::spawn(async move {
            let result = Self::run_loop(conn, command_rx).await;
            loop_alive.store(false, Ordering::Relaxed);
            if let Err(err) = result {
                error!(target: "page-transport", ?err, "transport loop terminated with error");
            }
        });

        info!(target: "page-transport", url = %ws_url, "chromium connection established");

        Ok(Self {
            command_tx,
            loop_task,
            child: Mutex::new(child),
            alive,
        })
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    async fn send_internal(
        &self,
        session: Option<String>,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value, PageError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        let message = ControlMessage {
            session,
            method: method.to_string(),
            params,
            responder: resp_tx,
        };

        self.command_tx
            .send(message)
            .await
            .map_err(|err| PageError::new(PageErrorKind::CdpIo).with_hint(err.to_string()))?;

        match tokio::time::timeout(deadline, resp_rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(_)) => Err(PageError::new(PageErrorKind::CdpIo)
                .with_hint("command response channel closed")),
            Err(_) => {
                Err(PageError::new(PageErrorKind::NavTimeout).with_hint("command timed out"))
            }
        }
    }

    fn browser_config(cfg: &CdpConfig) -> Result<BrowserConfig, PageError> {
        if !cfg.executable.as_os_str().is_empty() && !cfg.executable.exists() {
            return Err(PageError::new(PageErrorKind::CdpIo).with_hint(format!(
                "chrome executable not found at {}; set FORMPILOT_CHROME",
                cfg.executable.display()
            )));
        }

        let profile_dir = if cfg.user_data_dir.is_absolute() {
            cfg.user_data_dir.clone()
        } else {
            let cwd = std::env::current_dir().map_err(|err| {
                PageError::new(PageErrorKind::Internal)
                    .with_hint(format!("failed to resolve cwd for user-data-dir: {err}"))
            })?;
            cwd.join(&cfg.user_data_dir)
        };
        fs::create_dir_all(&profile_dir).map_err(|err| {
            PageError::new(PageErrorKind::Internal)
                .with_hint(format!("failed to ensure user-data-dir: {err}"))
        })?;

        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_millis(cfg.default_deadline_ms))
            .launch_timeout(Duration::from_secs(20));

        if !cfg.headless {
            builder = builder.with_head();
        }

        let mut args = vec![
            "--disable-background-networking",
            "--disable-background-timer-throttling",
            "--disable-breakpad",
            "--disable-component-update",
            "--disable-default-apps",
            "--disable-dev-shm-usage",
            "--disable-extensions",
            "--disable-hang-monitor",
            "--disable-popup-blocking",
            "--disable-prompt-on-repost",
            "--disable-sync",
            "--metrics-recording-only",
            "--no-first-run",
            "--no-default-browser-check",
            "--password-store=basic",
            "--remote-allow-origins=*",
            "--use-mock-keychain",
        ];
        if cfg.headless {
            args.push("--headless=new");
            args.push("--hide-scrollbars");
            args.push("--mute-audio");
        }
        builder = builder.args(args);

        if !cfg.executable.as_os_str().is_empty() {
            builder = builder.chrome_executable(cfg.executable.clone());
        }
        builder = builder.user_data_dir(profile_dir);

        builder.build().map_err(|err| {
            PageError::new(PageErrorKind::Internal).with_hint(format!("browser config error: {err}"))
        })
    }

    async fn launch_browser(config: BrowserConfig) -> Result<(Option<Child>, String), PageError> {
        let mut child = config.launch().map_err(|err| {
            PageError::new(PageErrorKind::Internal)
                .with_hint(format!("failed to launch chromium: {err}"))
        })?;

        let ws_url = extract_ws_url(&mut child).await?;
        Ok((Some(child), ws_url))
    }

    async fn run_loop(
        mut conn: Connection<CdpEventMessage>,
        mut command_rx: mpsc::Receiver<ControlMessage>,
    ) -> Result<(), PageError> {
        let mut inflight: HashMap<CallId, oneshot::Sender<Result<Value, PageError>>> =
            HashMap::new();

        loop {
            tokio::select! {
                Some(cmd) = command_rx.recv() => {
                    Self::handle_command(&mut conn, cmd, &mut inflight)?;
                }
                message = conn.next() => {
                    match message {
                        Some(Ok(Message::Response(resp))) => {
                            Self::handle_response(resp, &mut inflight);
                        }
                        Some(Ok(Message::Event(_event))) => {
                            debug!(target: "page-transport", "cdp event received");
                        }
                        Some(Err(err)) => {
                            let page_err = Self::map_cdp_error(err);
                            for (_, sender) in inflight.drain() {
                                let _ = sender.send(Err(page_err.clone()));
                            }
                            return Err(page_err);
                        }
                        None => {
                            let err = PageError::new(PageErrorKind::CdpIo)
                                .with_hint("cdp connection closed");
                            for (_, sender) in inflight.drain() {
                                let _ = sender.send(Err(err.clone()));
                            }
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn handle_command(
        conn: &mut Connection<CdpEventMessage>,
        cmd: ControlMessage,
        inflight: &mut HashMap<CallId, oneshot::Sender<Result<Value, PageError>>>,
    ) -> Result<(), PageError> {
        let session = cmd.session.map(CdpSessionId::from);
        let method_id: MethodId = cmd.method.clone().into();
        match conn.submit_command(method_id, session, cmd.params) {
            Ok(call_id) => {
                inflight.insert(call_id, cmd.responder);
                Ok(())
            }
            Err(err) => {
                let page_err = PageError::new(PageErrorKind::CdpIo).with_hint(err.to_string());
                let _ = cmd.responder.send(Err(page_err.clone()));
                Err(page_err)
            }
        }
    }

    fn handle_response(
        resp: Response,
        inflight: &mut HashMap<CallId, oneshot::Sender<Result<Value, PageError>>>,
    ) {
        let entry = inflight.remove(&resp.id);
        let result = Self::extract_payload(resp);
        if let Some(sender) = entry {
            let _ = sender.send(result);
        }
    }

    fn extract_payload(resp: Response) -> Result<Value, PageError> {
        if let Some(result) = resp.result {
            Ok(result)
        } else if let Some(error) = resp.error {
            let retriable = error.code >= 500;
            Err(PageError::new(PageErrorKind::CdpIo)
                .with_hint(format!("cdp error {}: {}", error.code, error.message))
                .retriable(retriable))
        } else {
            Err(PageError::new(PageErrorKind::Internal).with_hint("empty cdp response"))
        }
    }

    fn map_cdp_error(err: CdpError) -> PageError {
        let hint = err.to_string();
        match err {
            CdpError::Timeout => PageError::new(PageErrorKind::NavTimeout)
                .with_hint(hint)
                .retriable(true),
            CdpError::JavascriptException(_) | CdpError::Serde(_) | CdpError::FrameNotFound(_) => {
                PageError::new(PageErrorKind::Internal).with_hint(hint)
            }
            _ => PageError::new(PageErrorKind::CdpIo)
                .with_hint(hint)
                .retriable(true),
        }
    }
}

impl Drop for RuntimeState {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
        self.loop_task.abort();

        if let Ok(mut guard) = self.child.try_lock() {
            if let Some(mut child) = guard.take() {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        if let Err(err) = child.kill().await {
                            warn!(target: "page-transport", ?err, "failed to kill chromium child");
                        }
                    });
                }
            }
        }
    }
}
