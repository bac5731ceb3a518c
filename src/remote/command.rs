//! Remote command channel.
//!
//! Consumes device document snapshots, executes each new command at most
//! once and writes an ack back.
//!
//! ```text
//!   snapshot ──▶ RemoteCommand::from_document
//!                    │ none / idle ─────────────────▶ ignore
//!                    │ commandId == last_cmd_id ────▶ re-ack if slot still busy
//!                    ▼
//!              CommandExecutor::execute
//!                    │
//!                    ▼
//!        persist ack + last_cmd_id ──▶ merge ack into ack_path()
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use log::{debug, info, warn};

use super::document::{AckStatus, CommandAck, DeviceDocument, DocPath};
use crate::app::commands::{CommandKind, RemoteCommand};
use crate::app::ports::{ClockReading, RemoteDocumentPort, RemoteError, StoragePort};
use crate::state::KioskState;

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub ok: bool,
    pub message: String,
}

impl CommandOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Runs commands on behalf of the channel.
#[allow(async_fn_in_trait)]
pub trait CommandExecutor {
    /// Execute a known command.  Never called for [`CommandKind::Unknown`].
    async fn execute(&mut self, command: &RemoteCommand) -> CommandOutcome;

    /// Where the ack goes.  Asked after `execute`, so a tenant switch acks
    /// on the new tenant's document.
    fn ack_path(&self) -> Result<DocPath, RemoteError>;
}

pub struct CommandChannel<S> {
    state: KioskState<S>,
    gate: Mutex<CriticalSectionRawMutex, ()>,
}

impl<S: StoragePort> CommandChannel<S> {
    pub fn new(state: KioskState<S>) -> Self {
        Self {
            state,
            gate: Mutex::new(()),
        }
    }

    /// Handle one device document snapshot.
    ///
    /// Returns the ack of a command executed by this call; `None` when
    /// nothing was executed (no command, idle slot or duplicate).
    pub async fn handle(
        &self,
        doc: &DeviceDocument,
        executor: &mut impl CommandExecutor,
        remote: &impl RemoteDocumentPort,
        now: ClockReading,
    ) -> Option<CommandAck> {
        let _gate = self.gate.lock().await;

        let Some(command) = RemoteCommand::from_document(doc) else {
            debug!("Command: no pending command");
            return None;
        };

        let last = self.state.last_command_id().unwrap_or_else(|e| {
            warn!("Command: last id unreadable ({}), treating as new", e);
            None
        });
        if last.as_deref() == Some(command.id.as_str()) {
            self.on_duplicate(&command, &*executor, remote).await;
            return None;
        }

        info!("Command: executing '{}' (id {})", command.tag, command.id);
        let outcome = match &command.kind {
            CommandKind::Unknown(tag) => CommandOutcome::error(format!("unknown command '{}'", tag)),
            _ => executor.execute(&command).await,
        };
        let ack = CommandAck::new(
            &command.id,
            AckStatus::from_ok(outcome.ok),
            &outcome.message,
            now.epoch_ms,
        );
        if outcome.ok {
            info!("Command: '{}' ok: {}", command.tag, outcome.message);
        } else {
            warn!("Command: '{}' failed: {}", command.tag, outcome.message);
        }

        if let Err(e) = self.state.record_handled(&ack) {
            warn!("Command: could not persist ack for {}: {}", command.id, e);
        }
        write_ack(&ack, &*executor, remote).await;
        Some(ack)
    }

    /// The slot still shows a command we already handled, so the earlier
    /// ack write never landed.  Write the stored ack again, unchanged.
    async fn on_duplicate(
        &self,
        command: &RemoteCommand,
        executor: &impl CommandExecutor,
        remote: &impl RemoteDocumentPort,
    ) {
        match self.state.last_ack() {
            Some(ack) if ack.last_command_id == command.id => {
                info!("Command: {} already handled, re-acking", command.id);
                write_ack(&ack, executor, remote).await;
            }
            _ => debug!("Command: {} already handled, no stored ack", command.id),
        }
    }
}

async fn write_ack(
    ack: &CommandAck,
    executor: &impl CommandExecutor,
    remote: &impl RemoteDocumentPort,
) {
    let path = match executor.ack_path() {
        Ok(path) => path,
        Err(e) => {
            warn!("Command: no ack path for {}: {}", ack.last_command_id, e);
            return;
        }
    };
    if let Err(e) = remote.merge(&path, ack.to_patch()).await {
        warn!("Command: ack write to {} failed: {}", path, e);
    }
}
