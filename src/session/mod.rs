//! One tokio task per session. Each task owns its [`InferenceEngine`]
//! outright and drains a bounded command queue in arrival order; the loaded
//! model is the only thing sessions share.

use crate::config::EngineConfig;
use crate::context::SessionContext;
use crate::engine::{EngineStats, InferenceEngine};
use crate::error::HubError;
use crate::features::RawMetrics;
use crate::model::SharedModel;
use crate::stress::{EngineState, Prediction};
use std::collections::HashMap;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, info_span, Instrument};

enum Command {
    Predict {
        metrics: RawMetrics,
        reply: oneshot::Sender<Prediction>,
    },
    SetContext(Option<SessionContext>),
    Reset {
        reply: oneshot::Sender<EngineState>,
    },
    State {
        reply: oneshot::Sender<(EngineState, EngineStats)>,
    },
}

struct SessionHandle {
    tx: mpsc::Sender<Command>,
    task: JoinHandle<EngineStats>,
}

async fn run_session(mut engine: InferenceEngine, mut rx: mpsc::Receiver<Command>) -> EngineStats {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Predict { metrics, reply } => {
                let _ = reply.send(engine.predict(&metrics, None));
            }
            Command::SetContext(ctx) => engine.set_context(ctx),
            Command::Reset { reply } => {
                engine.reset();
                let _ = reply.send(engine.state());
            }
            Command::State { reply } => {
                let _ = reply.send((engine.state(), engine.stats()));
            }
        }
    }
    engine.reset();
    engine.stats()
}

/// Routes per-session commands to their owning tasks.
///
/// Session tasks are spawned on the runtime given to [`SessionHub::with_runtime`],
/// or otherwise on the runtime `open` is called from.
pub struct SessionHub {
    config: EngineConfig,
    model: Option<SharedModel>,
    runtime: Option<Handle>,
    sessions: HashMap<String, SessionHandle>,
}

impl SessionHub {
    pub fn new(config: EngineConfig, model: Option<SharedModel>) -> Self {
        Self {
            config,
            model,
            runtime: None,
            sessions: HashMap::new(),
        }
    }

    /// Spawn session tasks on `runtime`, so sessions can be opened from
    /// outside any runtime context.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Start a session with a fresh engine in `EMPTY`. Fails with
    /// [`HubError::NoRuntime`] when no runtime was configured and the caller
    /// is not inside one.
    pub fn open(&mut self, id: &str) -> Result<(), HubError> {
        if self.sessions.contains_key(id) {
            return Err(HubError::AlreadyOpen(id.to_string()));
        }
        let runtime = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|_| HubError::NoRuntime(id.to_string()))?,
        };
        let engine = InferenceEngine::new(&self.config, self.model.clone())?;
        let (tx, rx) = mpsc::channel(self.config.sessions.queue_depth.max(1));
        let span = info_span!("session", id = %id);
        let task = runtime.spawn(run_session(engine, rx).instrument(span));
        self.sessions.insert(id.to_string(), SessionHandle { tx, task });
        info!(session = %id, model = self.model.is_some(), "session opened");
        Ok(())
    }

    /// Open the session if needed.
    pub fn ensure(&mut self, id: &str) -> Result<(), HubError> {
        if self.sessions.contains_key(id) {
            Ok(())
        } else {
            self.open(id)
        }
    }

    fn sender(&self, id: &str) -> Result<mpsc::Sender<Command>, HubError> {
        self.sessions
            .get(id)
            .map(|h| h.tx.clone())
            .ok_or_else(|| HubError::UnknownSession(id.to_string()))
    }

    async fn send(&self, id: &str, cmd: Command) -> Result<(), HubError> {
        self.sender(id)?
            .send(cmd)
            .await
            .map_err(|_| HubError::SessionGone(id.to_string()))
    }

    async fn request<T>(
        &self,
        id: &str,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(id, make(reply)).await?;
        rx.await.map_err(|_| HubError::SessionGone(id.to_string()))
    }

    pub async fn predict(&self, id: &str, metrics: RawMetrics) -> Result<Prediction, HubError> {
        self.request(id, |reply| Command::Predict { metrics, reply }).await
    }

    /// Replace (or clear) the session's context for subsequent predictions.
    pub async fn set_context(&self, id: &str, context: Option<SessionContext>) -> Result<(), HubError> {
        self.send(id, Command::SetContext(context)).await
    }

    pub async fn reset(&self, id: &str) -> Result<EngineState, HubError> {
        self.request(id, |reply| Command::Reset { reply }).await
    }

    pub async fn state(&self, id: &str) -> Result<(EngineState, EngineStats), HubError> {
        self.request(id, |reply| Command::State { reply }).await
    }

    /// End a session: the task drains queued commands, resets and exits.
    pub async fn close(&mut self, id: &str) -> Result<EngineStats, HubError> {
        let handle = self
            .sessions
            .remove(id)
            .ok_or_else(|| HubError::UnknownSession(id.to_string()))?;
        drop(handle.tx);
        let stats = handle
            .task
            .await
            .map_err(|_| HubError::SessionGone(id.to_string()))?;
        info!(session = %id, predictions = stats.predictions, "session closed");
        Ok(stats)
    }

    pub async fn close_all(&mut self) {
        let ids: Vec<String> = self.sessions.keys().cloned().collect();
        for id in ids {
            let _ = self.close(&id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stress::PredictionSource;

    fn config(window: usize) -> EngineConfig {
        let mut c = EngineConfig::default();
        c.features.window_len = window;
        c
    }

    fn tense() -> RawMetrics {
        RawMetrics::new().with("browTension", 0.5)
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let mut hub = SessionHub::new(config(2), None);
        hub.open("a").unwrap();
        hub.open("b").unwrap();
        hub.predict("a", tense()).await.unwrap();
        let a = hub.predict("a", tense()).await.unwrap();
        let b = hub.predict("b", tense()).await.unwrap();
        assert_eq!(a.state, EngineState::Ready);
        assert_eq!(b.state, EngineState::Filling);

        hub.set_context("b", Some(SessionContext::new().with_hours_worked(11.0)))
            .await
            .unwrap();
        let b = hub.predict("b", tense()).await.unwrap();
        let a = hub.predict("a", tense()).await.unwrap();
        assert!((b.score - a.score - 10.0).abs() < 1e-3);
        hub.close_all().await;
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn reset_and_state_round_trip() {
        let mut hub = SessionHub::new(config(3), None);
        hub.ensure("s").unwrap();
        hub.ensure("s").unwrap();
        for _ in 0..3 {
            hub.predict("s", tense()).await.unwrap();
        }
        let (state, stats) = hub.state("s").await.unwrap();
        assert_eq!(state, EngineState::Ready);
        assert_eq!(stats.predictions, 3);
        assert_eq!(hub.reset("s").await.unwrap(), EngineState::Empty);
        assert_eq!(hub.reset("s").await.unwrap(), EngineState::Empty);
        let p = hub.predict("s", tense()).await.unwrap();
        assert_eq!(p.source, PredictionSource::Heuristic);
        assert_eq!(p.state, EngineState::Filling);
        let stats = hub.close("s").await.unwrap();
        assert_eq!(stats.predictions, 4);
    }

    #[tokio::test]
    async fn routing_errors() {
        let mut hub = SessionHub::new(config(3), None);
        assert!(matches!(
            hub.predict("nope", tense()).await,
            Err(HubError::UnknownSession(_))
        ));
        hub.open("x").unwrap();
        assert!(matches!(hub.open("x"), Err(HubError::AlreadyOpen(_))));
        assert!(hub.close("y").await.is_err());
    }

    #[test]
    fn open_outside_a_runtime_is_an_error() {
        let mut hub = SessionHub::new(config(3), None);
        assert!(matches!(hub.open("x"), Err(HubError::NoRuntime(id)) if id == "x"));
        assert!(hub.is_empty());
    }

    #[test]
    fn explicit_runtime_hosts_sessions_opened_from_sync_code() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let mut hub = SessionHub::new(config(2), None).with_runtime(rt.handle().clone());
        hub.open("x").unwrap();
        let p = rt.block_on(hub.predict("x", tense())).unwrap();
        assert_eq!(p.state, EngineState::Filling);
        let stats = rt.block_on(hub.close("x")).unwrap();
        assert_eq!(stats.predictions, 1);
    }

    #[tokio::test]
    async fn invalid_config_fails_open() {
        let mut c = config(3);
        c.thresholds.medium = 90.0;
        let mut hub = SessionHub::new(c, None);
        assert!(matches!(hub.open("x"), Err(HubError::Engine(_))));
    }
}
