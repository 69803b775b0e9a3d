use std::sync::Arc;

use uuid::Uuid;

use crate::{
    EngineError, EventSink, Group, LedgerEvent, LedgerStore, LedgerTx, ResultEngine,
    TracingEvents,
};

mod balances;
mod groups;
mod settlements;

pub use balances::{CounterpartyDebt, MemberDebts};
pub use settlements::{HISTORY_LIMIT, SettlementHistory};

/// Run a block inside a ledger transaction, committing on success and rolling
/// back on error.
///
/// The body must evaluate to a `ResultEngine<T>` without using `?` at the top
/// level, so an error always reaches the rollback arm.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let mut $tx = $self.store.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = $tx.rollback().await {
                    tracing::warn!("rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }};
}

pub(crate) use with_tx;

/// Settlement engine over a [`LedgerStore`].
pub struct Engine<S> {
    store: S,
    events: Arc<dyn EventSink>,
}

impl<S: LedgerStore> Engine<S> {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder<S> {
        EngineBuilder::default()
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Deliver an event after commit. Delivery failures are logged, never
    /// propagated: the ledger change already happened.
    async fn emit(&self, event: LedgerEvent) {
        let kind = event.kind();
        if let Err(err) = self.events.emit(event).await {
            tracing::warn!(kind = kind, "failed to deliver ledger event: {err}");
        }
    }
}

async fn require_group<T: LedgerTx>(tx: &mut T, group_id: Uuid) -> ResultEngine<Group> {
    tx.group(group_id)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))
}

/// Membership check used by every read; non-members get `Forbidden`.
fn require_membership(group: &Group, member_id: &str) -> ResultEngine<()> {
    if !group.is_member(member_id) {
        return Err(EngineError::Forbidden(format!(
            "{member_id} is not a member of this group"
        )));
    }
    Ok(())
}

fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
pub struct EngineBuilder<S> {
    store: Option<S>,
    events: Arc<dyn EventSink>,
}

impl<S> Default for EngineBuilder<S> {
    fn default() -> Self {
        Self {
            store: None,
            events: Arc::new(TracingEvents),
        }
    }
}

impl<S: LedgerStore> EngineBuilder<S> {
    /// Pass the required ledger store
    pub fn store(mut self, store: S) -> EngineBuilder<S> {
        self.store = Some(store);
        self
    }

    /// Where lifecycle events go. Defaults to [`TracingEvents`].
    pub fn events(mut self, events: Arc<dyn EventSink>) -> EngineBuilder<S> {
        self.events = events;
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> ResultEngine<Engine<S>> {
        let store = self
            .store
            .ok_or_else(|| EngineError::Validation("ledger store is required".to_string()))?;
        Ok(Engine {
            store,
            events: self.events,
        })
    }
}
