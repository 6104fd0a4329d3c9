// src/controller/mod.rs
// Chat UI controller: the per-conversation state machine
//
// Orchestrates one turn at a time: classify, then (maybe) recommend and
// resolve, then stream the composed answer, emitting ChatEvents to the UI
// as fragments arrive. The single-flight guard is advisory - it protects
// this controller instance, nothing server-side.

use anyhow::Result;
use futures::StreamExt;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::content::ContentItem;
use crate::error::GatewayError;
use crate::gateway::{Gateway, GatewayRequest, StepType};
use crate::message::{ChatEvent, ChatMessage};
use crate::pipeline::{self, Session, compose};
use crate::store::history::HistoryStore;

/// Where the controller currently is inside a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LoadingHistory,
    Idle,
    AwaitingClassification,
    AwaitingRecommendation,
    AwaitingResolution,
    Streaming,
}

pub struct ChatController {
    gateway: Arc<dyn Gateway>,
    db: SqlitePool,
    history: HistoryStore,
    session: Session,
    conversation: Vec<ChatMessage>,
    phase: Phase,
    loading: bool,
    is_loading_history: bool,
}

impl ChatController {
    pub fn new(gateway: Arc<dyn Gateway>, db: SqlitePool, session: Session) -> Self {
        let history = HistoryStore::new(db.clone());
        Self {
            gateway,
            db,
            history,
            session,
            conversation: Vec::new(),
            phase: Phase::Idle,
            loading: false,
            is_loading_history: false,
        }
    }

    pub fn conversation(&self) -> &[ChatMessage] {
        &self.conversation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_loading_history(&self) -> bool {
        self.is_loading_history
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetch the stored conversation. A load failure degrades to an empty
    /// conversation instead of blocking the session.
    pub async fn load_history(&mut self) {
        self.is_loading_history = true;
        self.phase = Phase::LoadingHistory;

        match self.history.load(&self.session.email).await {
            Ok(messages) => {
                debug!(user = %self.session.email, turns = messages.len(), "loaded chat history");
                self.conversation = messages;
            }
            Err(err) => {
                warn!(error = %err, "failed to load chat history, starting empty");
                self.conversation.clear();
            }
        }

        self.is_loading_history = false;
        self.phase = Phase::Idle;
    }

    /// Run one full turn. Fragments, completion, and failures are emitted
    /// on `tx`; `cancel` aborts the turn at its next suspension point.
    ///
    /// Returns `Err` only when the send is rejected because a turn is
    /// already in flight - pipeline failures are handled internally per
    /// the error policy (synthetic reply, conversation untouched on disk).
    pub async fn send_message(
        &mut self,
        text: &str,
        tx: mpsc::Sender<ChatEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        if self.loading {
            anyhow::bail!("a message is already being processed");
        }
        self.loading = true;

        let result = self.run_turn(text, &tx, &cancel).await;

        self.loading = false;
        self.phase = Phase::Idle;

        if let Err(err) = result {
            if matches!(
                err.downcast_ref::<GatewayError>(),
                Some(GatewayError::Cancelled)
            ) {
                debug!("turn cancelled");
                let _ = tx
                    .send(ChatEvent::Error {
                        message: "Response cancelled.".to_string(),
                    })
                    .await;
                return Ok(());
            }

            warn!(error = %err, "turn failed");
            let reply = ChatMessage::assistant(compose::ERROR_REPLY.to_string(), None);
            self.conversation.push(reply);
            let _ = tx
                .send(ChatEvent::Error {
                    message: compose::ERROR_REPLY.to_string(),
                })
                .await;
        }

        Ok(())
    }

    async fn run_turn(
        &mut self,
        text: &str,
        tx: &mpsc::Sender<ChatEvent>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        // Snapshot prior turns before this one joins the conversation -
        // direct mode renders them into the prompt.
        let prior = self.conversation.clone();

        let user_message = ChatMessage::user(text.to_string());
        self.conversation.push(user_message.clone());
        if let Err(err) = self.history.append(&self.session.email, &user_message).await {
            warn!(error = %err, "failed to persist user turn");
        }

        self.phase = Phase::AwaitingClassification;
        let wants_recommendation =
            pipeline::classify(self.gateway.as_ref(), &self.session, text, cancel).await?;

        let items: Vec<ContentItem> = if wants_recommendation {
            self.phase = Phase::AwaitingRecommendation;
            let refs = pipeline::recommend(
                self.gateway.as_ref(),
                &self.db,
                &self.session,
                text,
                cancel,
            )
            .await?;

            self.phase = Phase::AwaitingResolution;
            pipeline::resolve(&self.db, &refs, cancel).await
        } else {
            Vec::new()
        };

        // Nothing resolved (or nothing asked for): answer directly.
        self.phase = Phase::Streaming;
        let request = if items.is_empty() {
            GatewayRequest::new(
                compose::direct_prompt(&prior, text),
                &self.session.email,
                StepType::GeneralChat,
            )
        } else {
            let mut request =
                GatewayRequest::new(text, &self.session.email, StepType::FinalResponse);
            request.selected_content = Some(items.clone());
            request
        };

        let mut stream = self.gateway.stream(request, cancel.clone()).await?;
        let mut accumulated = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            accumulated.push_str(&fragment);
            if tx.send(ChatEvent::Fragment(fragment)).await.is_err() {
                // Listener went away mid-stream: the turn is lost, not
                // partially saved.
                anyhow::bail!("listener dropped mid-stream");
            }
        }

        let reply = ChatMessage::assistant(
            accumulated,
            if items.is_empty() { None } else { Some(items) },
        );
        if let Err(err) = self.history.append(&self.session.email, &reply).await {
            warn!(error = %err, "failed to persist assistant turn");
        }
        self.conversation.push(reply.clone());
        let _ = tx.send(ChatEvent::Completed(reply)).await;

        Ok(())
    }

    /// Delete all stored history for this user and clear the in-memory
    /// conversation. Idempotent.
    pub async fn reset(&mut self) -> Result<()> {
        self.history.reset(&self.session.email).await?;
        self.conversation.clear();
        self.phase = Phase::Idle;
        Ok(())
    }
}
