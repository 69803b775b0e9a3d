//! Lifecycle events.
//!
//! The engine notifies an [`EventSink`] after a transaction commits. Delivery
//! (push, email, in-app inbox) is the sink's business; a failed delivery never
//! undoes a committed ledger change.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{MoneyCents, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A shared expense created a debt for `recipient`.
    ExpenseShared {
        group_id: Uuid,
        expense_id: Uuid,
        recipient: String,
        payer: String,
        amount: MoneyCents,
    },
    /// A settlement was requested; `recipient` is the counterparty of the
    /// member who asked.
    SettlementRequested {
        settlement_id: Uuid,
        group_id: Uuid,
        recipient: String,
        from: String,
        to: String,
        amount: MoneyCents,
    },
    SettlementConfirmed {
        settlement_id: Uuid,
        group_id: Uuid,
        from: String,
        to: String,
        amount: MoneyCents,
        creditor_name: String,
    },
    SettlementRejected {
        settlement_id: Uuid,
        group_id: Uuid,
        from: String,
        to: String,
        amount: MoneyCents,
        creditor_name: String,
    },
}

impl LedgerEvent {
    /// Member the event is addressed to.
    pub fn recipient(&self) -> &str {
        match self {
            Self::ExpenseShared { recipient, .. } | Self::SettlementRequested { recipient, .. } => {
                recipient
            }
            // Confirmations and rejections always go to the debtor.
            Self::SettlementConfirmed { from, .. } | Self::SettlementRejected { from, .. } => from,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExpenseShared { .. } => "expense_shared",
            Self::SettlementRequested { .. } => "settlement_requested",
            Self::SettlementConfirmed { .. } => "settlement_confirmed",
            Self::SettlementRejected { .. } => "settlement_rejected",
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: LedgerEvent) -> ResultEngine<()>;
}

/// Logs every event and drops it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEvents;

#[async_trait]
impl EventSink for TracingEvents {
    async fn emit(&self, event: LedgerEvent) -> ResultEngine<()> {
        tracing::info!(kind = event.kind(), recipient = event.recipient(), ?event, "ledger event");
        Ok(())
    }
}

/// Keeps emitted events in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryEvents {
    events: Arc<Mutex<Vec<LedgerEvent>>>,
}

impl MemoryEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events emitted so far.
    pub fn snapshot(&self) -> Vec<LedgerEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl EventSink for MemoryEvents {
    async fn emit(&self, event: LedgerEvent) -> ResultEngine<()> {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
        Ok(())
    }
}
