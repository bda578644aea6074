//! NDJSON message protocol for the bridge binary. One request per line in,
//! exactly one reply per line out.

use crate::context::SessionContext;
use crate::features::RawMetrics;
use crate::session::SessionHub;
use crate::stress::Prediction;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    #[default]
    Metrics,
    UserData,
    Reset,
    Ping,
    End,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub session: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: RequestKind,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Prediction {
        session: String,
        data: Prediction,
    },
    UserDataReceived {
        session: String,
        status: Status,
    },
    ResetComplete {
        session: String,
        status: Status,
    },
    Pong {
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<serde_json::Value>,
    },
    SessionEnded {
        session: String,
        predictions: u64,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        session: Option<String>,
        message: String,
    },
}

impl Reply {
    fn error(session: Option<String>, message: impl ToString) -> Self {
        Reply::Error {
            session,
            message: message.to_string(),
        }
    }
}

/// Routes parsed requests into a [`SessionHub`]. Requests without a session
/// id go to `default_session`.
pub struct Bridge {
    hub: SessionHub,
    default_session: String,
}

impl Bridge {
    pub fn new(hub: SessionHub, default_session: impl Into<String>) -> Self {
        Self {
            hub,
            default_session: default_session.into(),
        }
    }

    pub fn hub(&self) -> &SessionHub {
        &self.hub
    }

    /// Handle one raw line. Malformed input yields an `error` reply.
    pub async fn handle_line(&mut self, line: &str) -> Reply {
        match serde_json::from_str::<Request>(line) {
            Ok(req) => self.handle(req).await,
            Err(e) => {
                warn!(error = %e, "malformed request line");
                Reply::error(None, format!("invalid message: {e}"))
            }
        }
    }

    pub async fn handle(&mut self, req: Request) -> Reply {
        if req.kind == RequestKind::Ping {
            return Reply::Pong {
                timestamp: req.timestamp,
            };
        }
        let session = req
            .session
            .unwrap_or_else(|| self.default_session.clone());
        debug!(session = %session, kind = ?req.kind, "request");
        match self.dispatch(&session, req.kind, req.data).await {
            Ok(reply) => reply,
            Err(message) => Reply::error(Some(session), message),
        }
    }

    async fn dispatch(
        &mut self,
        session: &str,
        kind: RequestKind,
        data: serde_json::Value,
    ) -> Result<Reply, String> {
        let session_id = session.to_string();
        match kind {
            RequestKind::Metrics => {
                let metrics: RawMetrics = from_data(data)?;
                self.hub.ensure(session).map_err(|e| e.to_string())?;
                let data = self
                    .hub
                    .predict(session, metrics)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(Reply::Prediction {
                    session: session_id,
                    data,
                })
            }
            RequestKind::UserData => {
                let context: SessionContext = from_data(data)?;
                self.hub.ensure(session).map_err(|e| e.to_string())?;
                let context = (!context.is_empty()).then_some(context);
                self.hub
                    .set_context(session, context)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(Reply::UserDataReceived {
                    session: session_id,
                    status: Status::Success,
                })
            }
            RequestKind::Reset => {
                if self.hub.contains(session) {
                    self.hub.reset(session).await.map_err(|e| e.to_string())?;
                }
                Ok(Reply::ResetComplete {
                    session: session_id,
                    status: Status::Success,
                })
            }
            RequestKind::End => {
                let predictions = if self.hub.contains(session) {
                    self.hub
                        .close(session)
                        .await
                        .map_err(|e| e.to_string())?
                        .predictions
                } else {
                    0
                };
                Ok(Reply::SessionEnded {
                    session: session_id,
                    predictions,
                })
            }
            RequestKind::Ping => Ok(Reply::Pong { timestamp: None }),
        }
    }

    pub async fn shutdown(&mut self) {
        self.hub.close_all().await;
    }
}

fn from_data<T: serde::de::DeserializeOwned + Default>(data: serde_json::Value) -> Result<T, String> {
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data).map_err(|e| format!("invalid data: {e}"))
}
