//! Relay hub — drives many agents on behalf of remote clients.
//!
//! Clients send [`RelayRequest`]s; each one produces one or more
//! [`RelayEvent`]s on the caller's sink, and the same events are published
//! on a broadcast channel for observers. The hub is transport-agnostic; the
//! CLI's `serve` command puts it behind a WebSocket.
//!
//! Each agent sits behind its own mutex, so turns on one agent are
//! serialized while different agents proceed concurrently. A
//! [`RelaySession`] additionally keeps one client's requests for the same
//! agent in the order they arrived.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use aigent_core::config::{AgentConfig, ProviderConfig};
use aigent_core::utils::timestamp_millis;
use aigent_core::{AgentError, FunctionCallIntent, Message, Result, Usage};

use crate::agent::Agent;
use crate::streaming::chunks_for;

const EVENT_BUFFER: usize = 256;
/// Pending requests per agent within one session.
const SESSION_QUEUE: usize = 32;

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

/// A client request, tagged by `type`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RelayRequest {
    CreateAgent {
        agent_id: String,
        #[serde(alias = "config")]
        agent_config: AgentConfig,
        #[serde(default)]
        provider_config: ProviderConfig,
    },
    SendMessage {
        agent_id: String,
        content: String,
        #[serde(default)]
        stream: bool,
    },
    GetMemory {
        agent_id: String,
    },
    ClearMemory {
        agent_id: String,
    },
}

impl RelayRequest {
    pub fn agent_id(&self) -> &str {
        match self {
            RelayRequest::CreateAgent { agent_id, .. }
            | RelayRequest::SendMessage { agent_id, .. }
            | RelayRequest::GetMemory { agent_id }
            | RelayRequest::ClearMemory { agent_id } => agent_id,
        }
    }
}

/// Which operation an error event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AgentCreationError,
    MessageError,
    MemoryError,
    /// The request itself could not be parsed.
    RequestError,
}

/// An event sent back to clients, tagged by `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RelayEvent {
    AgentCreated {
        agent_id: String,
        status: String,
        timestamp: i64,
    },
    MessageResponse {
        agent_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        function_call: Option<FunctionCallIntent>,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
        timestamp: i64,
    },
    StreamChunk {
        agent_id: String,
        content: String,
        is_complete: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
        timestamp: i64,
    },
    MemoryResponse {
        agent_id: String,
        memory: Vec<Message>,
        timestamp: i64,
    },
    MemoryCleared {
        agent_id: String,
        timestamp: i64,
    },
    Error {
        kind: ErrorKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent_id: Option<String>,
        code: String,
        message: String,
        timestamp: i64,
    },
}

impl RelayEvent {
    fn error(kind: ErrorKind, agent_id: Option<&str>, err: &AgentError) -> Self {
        RelayEvent::Error {
            kind,
            agent_id: agent_id.map(str::to_string),
            code: err.code().to_string(),
            message: err.to_string(),
            timestamp: timestamp_millis(),
        }
    }
}

// ─────────────────────────────────────────────
// RelayHub
// ─────────────────────────────────────────────

pub struct RelayHub {
    agents: RwLock<HashMap<String, Arc<Mutex<Agent>>>>,
    events: broadcast::Sender<RelayEvent>,
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayHub {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            agents: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Receive a copy of every event the hub emits.
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    /// Register an already-built agent, replacing any agent with that id.
    pub async fn insert_agent(&self, agent_id: impl Into<String>, agent: Agent) {
        let agent_id = agent_id.into();
        let previous = self
            .agents
            .write()
            .await
            .insert(agent_id.clone(), Arc::new(Mutex::new(agent)));
        if previous.is_some() {
            info!(agent_id = %agent_id, "Replaced existing agent");
        } else {
            info!(agent_id = %agent_id, "Agent registered");
        }
    }

    /// Returns whether an agent was removed.
    pub async fn remove_agent(&self, agent_id: &str) -> bool {
        let removed = self.agents.write().await.remove(agent_id).is_some();
        if removed {
            info!(agent_id = %agent_id, "Agent removed");
        }
        removed
    }

    /// Ids of all live agents, sorted.
    pub async fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Parse one raw JSON request and handle it. Unparsable input yields a
    /// `request_error` event instead of failing.
    pub async fn handle_text(&self, text: &str, sink: &mpsc::Sender<RelayEvent>) {
        match serde_json::from_str::<RelayRequest>(text) {
            Ok(request) => self.handle(request, sink).await,
            Err(e) => self.reject(&e, sink).await,
        }
    }

    async fn reject(&self, e: &serde_json::Error, sink: &mpsc::Sender<RelayEvent>) {
        warn!(error = %e, "Rejected relay request");
        let err = AgentError::config(format!("Invalid request: {e}"));
        self.emit(RelayEvent::error(ErrorKind::RequestError, None, &err), sink)
            .await;
    }

    /// Handle one request, emitting its events.
    pub async fn handle(&self, request: RelayRequest, sink: &mpsc::Sender<RelayEvent>) {
        let agent_id = request.agent_id().to_string();
        debug!(agent_id = %agent_id, "Relay request");

        let (kind, outcome) = match request {
            RelayRequest::CreateAgent {
                agent_id,
                agent_config,
                provider_config,
            } => (
                ErrorKind::AgentCreationError,
                self.create_agent(agent_id, agent_config, &provider_config, sink)
                    .await,
            ),
            RelayRequest::SendMessage {
                agent_id,
                content,
                stream,
            } => (
                ErrorKind::MessageError,
                self.send_message(&agent_id, content, stream, sink).await,
            ),
            RelayRequest::GetMemory { agent_id } => {
                (ErrorKind::MemoryError, self.get_memory(&agent_id, sink).await)
            }
            RelayRequest::ClearMemory { agent_id } => {
                (ErrorKind::MemoryError, self.clear_memory(&agent_id, sink).await)
            }
        };

        if let Err(e) = outcome {
            warn!(agent_id = %agent_id, error = %e, "Relay request failed");
            self.emit(RelayEvent::error(kind, Some(agent_id.as_str()), &e), sink)
                .await;
        }
    }

    async fn create_agent(
        &self,
        agent_id: String,
        config: AgentConfig,
        provider_config: &ProviderConfig,
        sink: &mpsc::Sender<RelayEvent>,
    ) -> Result<()> {
        let agent = Agent::new(config, provider_config)?;
        self.insert_agent(agent_id.clone(), agent).await;
        self.emit(
            RelayEvent::AgentCreated {
                agent_id,
                status: "success".to_string(),
                timestamp: timestamp_millis(),
            },
            sink,
        )
        .await;
        Ok(())
    }

    async fn send_message(
        &self,
        agent_id: &str,
        content: String,
        stream: bool,
        sink: &mpsc::Sender<RelayEvent>,
    ) -> Result<()> {
        let agent = self.agent(agent_id).await?;
        let (response, streaming) = {
            let mut agent = agent.lock().await;
            let response = agent.send_message(content).await?;
            (response, agent.config().streaming.clone())
        };

        if !stream {
            self.emit(
                RelayEvent::MessageResponse {
                    agent_id: agent_id.to_string(),
                    content: response.content,
                    function_call: response.function_call,
                    usage: response.usage,
                    timestamp: timestamp_millis(),
                },
                sink,
            )
            .await;
            return Ok(());
        }

        let delay = Duration::from_millis(streaming.delay_ms);
        for chunk in chunks_for(&response, streaming.chunk_size) {
            let is_complete = chunk.is_complete;
            self.emit(
                RelayEvent::StreamChunk {
                    agent_id: agent_id.to_string(),
                    content: chunk.content,
                    is_complete,
                    usage: chunk.usage,
                    timestamp: timestamp_millis(),
                },
                sink,
            )
            .await;
            if !is_complete && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }

    async fn get_memory(&self, agent_id: &str, sink: &mpsc::Sender<RelayEvent>) -> Result<()> {
        let memory = self.agent(agent_id).await?.lock().await.get_memory();
        self.emit(
            RelayEvent::MemoryResponse {
                agent_id: agent_id.to_string(),
                memory,
                timestamp: timestamp_millis(),
            },
            sink,
        )
        .await;
        Ok(())
    }

    async fn clear_memory(&self, agent_id: &str, sink: &mpsc::Sender<RelayEvent>) -> Result<()> {
        self.agent(agent_id).await?.lock().await.clear_memory();
        self.emit(
            RelayEvent::MemoryCleared {
                agent_id: agent_id.to_string(),
                timestamp: timestamp_millis(),
            },
            sink,
        )
        .await;
        Ok(())
    }

    async fn agent(&self, agent_id: &str) -> Result<Arc<Mutex<Agent>>> {
        self.agents
            .read()
            .await
            .get(agent_id)
            .cloned()
            .ok_or_else(|| AgentError::Realtime(format!("Agent {agent_id} not found")))
    }

    async fn emit(&self, event: RelayEvent, sink: &mpsc::Sender<RelayEvent>) {
        // No subscribers is fine
        let _ = self.events.send(event.clone());
        if sink.send(event).await.is_err() {
            debug!("Relay client went away");
        }
    }
}

// ─────────────────────────────────────────────
// RelaySession
// ─────────────────────────────────────────────

/// One client's request stream.
///
/// Requests naming the same agent id are handled strictly in arrival order
/// by a worker dedicated to that id; requests for different ids run
/// concurrently.
pub struct RelaySession {
    hub: Arc<RelayHub>,
    sink: mpsc::Sender<RelayEvent>,
    queues: HashMap<String, mpsc::Sender<RelayRequest>>,
    workers: Vec<JoinHandle<()>>,
}

impl RelaySession {
    pub fn new(hub: Arc<RelayHub>, sink: mpsc::Sender<RelayEvent>) -> Self {
        Self {
            hub,
            sink,
            queues: HashMap::new(),
            workers: Vec::new(),
        }
    }

    /// Queue one raw JSON request. Unparsable input is answered right away.
    pub async fn submit(&mut self, text: &str) {
        let request = match serde_json::from_str::<RelayRequest>(text) {
            Ok(request) => request,
            Err(e) => return self.hub.reject(&e, &self.sink).await,
        };

        let queue = match self.queues.entry(request.agent_id().to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let (tx, rx) = mpsc::channel(SESSION_QUEUE);
                self.workers
                    .push(spawn_worker(self.hub.clone(), self.sink.clone(), rx));
                entry.insert(tx).clone()
            }
        };
        if queue.send(request).await.is_err() {
            debug!("Session worker stopped");
        }
    }

    /// Stop accepting requests and wait for queued ones to finish.
    pub async fn finish(self) {
        let RelaySession { queues, workers, .. } = self;
        drop(queues);
        for worker in workers {
            let _ = worker.await;
        }
    }
}

fn spawn_worker(
    hub: Arc<RelayHub>,
    sink: mpsc::Sender<RelayEvent>,
    mut rx: mpsc::Receiver<RelayRequest>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            hub.handle(request, &sink).await;
        }
    })
}
