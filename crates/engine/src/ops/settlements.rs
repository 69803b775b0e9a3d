use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    DebtRecord, EngineError, Expense, ExpenseOrigin, ExpenseReduction, Group, LedgerEvent,
    LedgerStore, LedgerTx, MoneyCents, RequestSettlementCmd, ResultEngine, Settlement,
    SettlementStatus,
    util::{checked_total, ensure_positive, require_member},
};

use super::{
    Engine, normalize_optional_text, require_group, require_membership, with_tx,
};

/// Resolved settlements returned by [`Engine::list_settlements`].
pub const HISTORY_LIMIT: usize = 20;

/// Settlements of a group, split by state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementHistory {
    /// Newest first.
    pub pending: Vec<Settlement>,
    /// Confirmed and rejected, most recently resolved first.
    pub history: Vec<Settlement>,
}

/// What a successful confirmation did to the ledger.
struct Applied {
    settlement: Settlement,
    creditor_name: String,
}

impl<S: LedgerStore> Engine<S> {
    /// Persists a `PENDING` settlement between two members.
    pub async fn request_settlement(&self, cmd: RequestSettlementCmd) -> ResultEngine<Settlement> {
        let acting_member = cmd.acting_member.clone();
        let settlement = with_tx!(self, |tx| insert_request(&mut tx, cmd).await)?;

        tracing::info!(
            settlement_id = %settlement.id,
            from = %settlement.from,
            to = %settlement.to,
            amount = %settlement.amount,
            "settlement requested"
        );
        let recipient = if acting_member == settlement.from {
            settlement.to.clone()
        } else {
            settlement.from.clone()
        };
        self.emit(LedgerEvent::SettlementRequested {
            settlement_id: settlement.id,
            group_id: settlement.group_id,
            recipient,
            from: settlement.from.clone(),
            to: settlement.to.clone(),
            amount: settlement.amount,
        })
        .await;
        Ok(settlement)
    }

    /// Applies a pending settlement to the debt ledger.
    ///
    /// Only the creditor may confirm. Unpaid debts of the debtor toward the
    /// creditor are consumed oldest first, splitting the last one if needed.
    /// The first consumed debt's expense shrinks by the settled amount and the
    /// debtor gets a mirrored expense. Everything happens in one transaction.
    pub async fn confirm_settlement(
        &self,
        settlement_id: Uuid,
        acting_member: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<Settlement> {
        let applied = with_tx!(self, |tx| apply_confirmation(
            &mut tx,
            settlement_id,
            acting_member,
            at
        )
        .await)?;
        let settlement = applied.settlement;

        tracing::info!(
            settlement_id = %settlement.id,
            amount = %settlement.amount,
            "settlement confirmed"
        );
        self.emit(LedgerEvent::SettlementConfirmed {
            settlement_id: settlement.id,
            group_id: settlement.group_id,
            from: settlement.from.clone(),
            to: settlement.to.clone(),
            amount: settlement.amount,
            creditor_name: applied.creditor_name,
        })
        .await;
        Ok(settlement)
    }

    /// Rejects a pending settlement. The debt ledger is left untouched.
    pub async fn reject_settlement(
        &self,
        settlement_id: Uuid,
        acting_member: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<Settlement> {
        let applied = with_tx!(self, |tx| apply_rejection(
            &mut tx,
            settlement_id,
            acting_member,
            at
        )
        .await)?;
        let settlement = applied.settlement;

        tracing::info!(settlement_id = %settlement.id, "settlement rejected");
        self.emit(LedgerEvent::SettlementRejected {
            settlement_id: settlement.id,
            group_id: settlement.group_id,
            from: settlement.from.clone(),
            to: settlement.to.clone(),
            amount: settlement.amount,
            creditor_name: applied.creditor_name,
        })
        .await;
        Ok(settlement)
    }

    /// Pending and resolved settlements of a group, as seen by a member.
    pub async fn list_settlements(
        &self,
        group_id: Uuid,
        acting_member: &str,
    ) -> ResultEngine<SettlementHistory> {
        with_tx!(self, |tx| load_history(&mut tx, group_id, acting_member).await)
    }
}

async fn insert_request<T: LedgerTx>(
    tx: &mut T,
    cmd: RequestSettlementCmd,
) -> ResultEngine<Settlement> {
    ensure_positive(cmd.amount, "settlement amount")?;
    if cmd.from == cmd.to {
        return Err(EngineError::Validation(
            "settlement from/to must differ".to_string(),
        ));
    }

    let group = require_group(tx, cmd.group_id).await?;
    require_membership(&group, &cmd.acting_member)?;
    if cmd.acting_member != cmd.from && cmd.acting_member != cmd.to {
        return Err(EngineError::Forbidden(
            "only the debtor or the creditor can request a settlement".to_string(),
        ));
    }
    require_member(&group, &cmd.from, "debtor")?;
    require_member(&group, &cmd.to, "creditor")?;

    let open = tx.list_settlements(group.id).await?;
    if open.iter().any(|s| {
        s.status == SettlementStatus::Pending && s.from == cmd.from && s.to == cmd.to
    }) {
        return Err(EngineError::Conflict(
            "a settlement between these members is already pending".to_string(),
        ));
    }

    let debts = tx.list_unpaid_debt_records(group.id, &cmd.from, &cmd.to).await?;
    if debts.is_empty() {
        return Err(EngineError::Validation(format!(
            "{} has no unpaid debts to {}",
            cmd.from, cmd.to
        )));
    }
    let outstanding = checked_total(debts.iter().map(|d| d.amount))?;
    if cmd.amount > outstanding {
        return Err(EngineError::Validation(format!(
            "settlement amount {} exceeds outstanding debt {outstanding}",
            cmd.amount
        )));
    }

    let settlement = Settlement::new(group.id, cmd.from, cmd.to, cmd.amount, cmd.at)?
        .note(normalize_optional_text(cmd.note.as_deref()));
    tx.insert_settlement(settlement.clone()).await?;
    Ok(settlement)
}

/// Loads a settlement the creditor is about to resolve.
async fn require_resolvable<T: LedgerTx>(
    tx: &mut T,
    settlement_id: Uuid,
    acting_member: &str,
) -> ResultEngine<(Settlement, Group)> {
    let settlement = tx
        .settlement(settlement_id)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("settlement not exists".to_string()))?;
    if settlement.to != acting_member {
        return Err(EngineError::Forbidden(
            "only the creditor can resolve a settlement".to_string(),
        ));
    }
    if settlement.status != SettlementStatus::Pending {
        return Err(EngineError::Conflict(format!(
            "settlement is already {}",
            settlement.status.as_str()
        )));
    }
    let group = require_group(tx, settlement.group_id).await?;
    Ok((settlement, group))
}

fn display_name(group: &Group, member_id: &str) -> String {
    group
        .member(member_id)
        .map(|m| m.display_name.clone())
        .unwrap_or_else(|| member_id.to_string())
}

async fn apply_confirmation<T: LedgerTx>(
    tx: &mut T,
    settlement_id: Uuid,
    acting_member: &str,
    at: DateTime<Utc>,
) -> ResultEngine<Applied> {
    let (settlement, group) = require_resolvable(tx, settlement_id, acting_member).await?;
    let creditor_name = display_name(&group, &settlement.to);

    let records = tx
        .list_unpaid_debt_records(group.id, &settlement.from, &settlement.to)
        .await?;
    let first = consume_debts(tx, &records, settlement.amount, at).await?;

    let original = tx.expense(first.expense_id).await?;
    match &original {
        Some(expense) => {
            let reduction = tx
                .reduce_or_delete_expense(
                    expense.id,
                    settlement.amount,
                    ExpenseOrigin::SettlementAdjustment,
                )
                .await?;
            if reduction == ExpenseReduction::Deleted {
                tracing::debug!(expense_id = %expense.id, "settled expense removed");
            }
        }
        None => tracing::warn!(
            expense_id = %first.expense_id,
            settlement_id = %settlement.id,
            "originating expense is missing, skipping adjustment"
        ),
    }

    let mirror = Expense::settlement_mirror(
        group.id,
        &settlement.from,
        settlement.amount,
        original.as_ref(),
        &creditor_name,
        at,
    )?;
    tx.create_mirrored_expense(mirror).await?;

    let settlement = tx
        .update_settlement_status(
            settlement.id,
            SettlementStatus::Pending,
            SettlementStatus::Confirmed,
            at,
        )
        .await?;
    Ok(Applied {
        settlement,
        creditor_name,
    })
}

/// Marks debts paid oldest first until `amount` is covered and returns the
/// first record consumed.
async fn consume_debts<T: LedgerTx>(
    tx: &mut T,
    records: &[DebtRecord],
    amount: MoneyCents,
    at: DateTime<Utc>,
) -> ResultEngine<DebtRecord> {
    let first = records.first().cloned().ok_or_else(|| {
        EngineError::InconsistentLedger("no unpaid debts back this settlement".to_string())
    })?;

    let mut remaining = amount;
    for record in records {
        if !remaining.is_positive() {
            break;
        }
        if record.amount <= remaining {
            tx.mark_debt_record_paid(record.id, at).await?;
            remaining -= record.amount;
        } else {
            tx.split_debt_record(record.id, remaining, at).await?;
            remaining = MoneyCents::ZERO;
        }
    }

    if remaining.is_positive() {
        return Err(EngineError::InconsistentLedger(format!(
            "unpaid debts fall {remaining} short of the settlement"
        )));
    }
    Ok(first)
}

async fn apply_rejection<T: LedgerTx>(
    tx: &mut T,
    settlement_id: Uuid,
    acting_member: &str,
    at: DateTime<Utc>,
) -> ResultEngine<Applied> {
    let (settlement, group) = require_resolvable(tx, settlement_id, acting_member).await?;
    let creditor_name = display_name(&group, &settlement.to);
    let settlement = tx
        .update_settlement_status(
            settlement.id,
            SettlementStatus::Pending,
            SettlementStatus::Rejected,
            at,
        )
        .await?;
    Ok(Applied {
        settlement,
        creditor_name,
    })
}

async fn load_history<T: LedgerTx>(
    tx: &mut T,
    group_id: Uuid,
    acting_member: &str,
) -> ResultEngine<SettlementHistory> {
    let group = require_group(tx, group_id).await?;
    require_membership(&group, acting_member)?;
    Ok(split_history(tx.list_settlements(group_id).await?))
}

fn split_history(settlements: Vec<Settlement>) -> SettlementHistory {
    let (mut pending, mut history): (Vec<_>, Vec<_>) = settlements
        .into_iter()
        .partition(|s| s.status == SettlementStatus::Pending);
    pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    history.sort_by(|a, b| b.resolved_at().cmp(&a.resolved_at()));
    history.truncate(HISTORY_LIMIT);
    SettlementHistory { pending, history }
}
