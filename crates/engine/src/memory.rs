//! In-memory [`LedgerStore`].
//!
//! A transaction takes an owned lock on the ledger and works on a private
//! copy of it. `commit` publishes the copy; `rollback` or drop throws it
//! away. Holding the lock for the whole transaction serializes writers, so a
//! second confirmation of the same settlement always sees the first one's
//! result.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    DebtRecord, EngineError, Expense, ExpenseOrigin, Group, Member, MoneyCents, ResultEngine,
    Settlement, SettlementStatus,
    store::{ExpenseReduction, LedgerStore, LedgerTx},
};

#[derive(Clone, Debug, Default)]
struct LedgerState {
    groups: Vec<Group>,
    expenses: Vec<Expense>,
    debts: Vec<DebtRecord>,
    settlements: Vec<Settlement>,
}

impl LedgerState {
    fn debt_mut(&mut self, record_id: Uuid) -> ResultEngine<&mut DebtRecord> {
        self.debts
            .iter_mut()
            .find(|d| d.id == record_id)
            .ok_or_else(|| EngineError::KeyNotFound("debt record not exists".to_string()))
    }

    fn oldest_first(mut records: Vec<DebtRecord>) -> Vec<DebtRecord> {
        // Stable: records created at the same instant keep insertion order.
        records.sort_by_key(|d| d.created_at);
        records
    }
}

/// Shared in-memory ledger. Cloning yields another handle to the same data.
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<LedgerState>,
    work: LedgerState,
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    type Tx = MemoryTx;

    async fn begin(&self) -> ResultEngine<MemoryTx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx { guard, work })
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn group(&mut self, group_id: Uuid) -> ResultEngine<Option<Group>> {
        Ok(self.work.groups.iter().find(|g| g.id == group_id).cloned())
    }

    async fn list_group_members(&mut self, group_id: Uuid) -> ResultEngine<Vec<Member>> {
        self.work
            .groups
            .iter()
            .find(|g| g.id == group_id)
            .map(|g| g.members.clone())
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))
    }

    async fn list_group_expenses(&mut self, group_id: Uuid) -> ResultEngine<Vec<Expense>> {
        Ok(self
            .work
            .expenses
            .iter()
            .filter(|e| e.group_id == Some(group_id))
            .cloned()
            .collect())
    }

    async fn expense(&mut self, expense_id: Uuid) -> ResultEngine<Option<Expense>> {
        Ok(self.work.expenses.iter().find(|e| e.id == expense_id).cloned())
    }

    async fn list_unpaid_debt_records(
        &mut self,
        group_id: Uuid,
        owed_by: &str,
        paid_to: &str,
    ) -> ResultEngine<Vec<DebtRecord>> {
        let records = self
            .work
            .debts
            .iter()
            .filter(|d| {
                d.group_id == group_id && !d.paid && d.owed_by == owed_by && d.paid_by == paid_to
            })
            .cloned()
            .collect();
        Ok(LedgerState::oldest_first(records))
    }

    async fn list_group_debt_records(
        &mut self,
        group_id: Uuid,
        unpaid_only: bool,
    ) -> ResultEngine<Vec<DebtRecord>> {
        let records = self
            .work
            .debts
            .iter()
            .filter(|d| d.group_id == group_id && (!unpaid_only || !d.paid))
            .cloned()
            .collect();
        Ok(LedgerState::oldest_first(records))
    }

    async fn settlement(&mut self, settlement_id: Uuid) -> ResultEngine<Option<Settlement>> {
        Ok(self
            .work
            .settlements
            .iter()
            .find(|s| s.id == settlement_id)
            .cloned())
    }

    async fn list_settlements(&mut self, group_id: Uuid) -> ResultEngine<Vec<Settlement>> {
        Ok(self
            .work
            .settlements
            .iter()
            .filter(|s| s.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn insert_group(&mut self, group: Group) -> ResultEngine<()> {
        if self.work.groups.iter().any(|g| g.id == group.id) {
            return Err(EngineError::Conflict(format!("group {} already exists", group.id)));
        }
        self.work.groups.push(group);
        Ok(())
    }

    async fn insert_expense(&mut self, expense: Expense) -> ResultEngine<()> {
        if self.work.expenses.iter().any(|e| e.id == expense.id) {
            return Err(EngineError::Conflict(format!(
                "expense {} already exists",
                expense.id
            )));
        }
        self.work.expenses.push(expense);
        Ok(())
    }

    async fn insert_debt_record(&mut self, record: DebtRecord) -> ResultEngine<()> {
        if self.work.debts.iter().any(|d| d.id == record.id) {
            return Err(EngineError::Conflict(format!(
                "debt record {} already exists",
                record.id
            )));
        }
        self.work.debts.push(record);
        Ok(())
    }

    async fn insert_settlement(&mut self, settlement: Settlement) -> ResultEngine<()> {
        if self.work.settlements.iter().any(|s| s.id == settlement.id) {
            return Err(EngineError::Conflict(format!(
                "settlement {} already exists",
                settlement.id
            )));
        }
        self.work.settlements.push(settlement);
        Ok(())
    }

    async fn mark_debt_record_paid(
        &mut self,
        record_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let record = self.work.debt_mut(record_id)?;
        if record.paid {
            return Err(EngineError::Conflict("debt record already paid".to_string()));
        }
        record.paid = true;
        record.paid_at = Some(paid_at);
        Ok(())
    }

    async fn split_debt_record(
        &mut self,
        record_id: Uuid,
        paid_portion: MoneyCents,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<DebtRecord> {
        let paid = self.work.debt_mut(record_id)?.split_paid(paid_portion, paid_at)?;
        self.work.debts.push(paid.clone());
        Ok(paid)
    }

    async fn reduce_or_delete_expense(
        &mut self,
        expense_id: Uuid,
        by: MoneyCents,
        origin: ExpenseOrigin,
    ) -> ResultEngine<ExpenseReduction> {
        let idx = self
            .work
            .expenses
            .iter()
            .position(|e| e.id == expense_id)
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;

        let expense = &mut self.work.expenses[idx];
        let amount = expense.amount.checked_sub(by);
        let normalized = expense.normalized_amount.checked_sub(by);
        match (amount, normalized) {
            (Some(amount), Some(normalized))
                if amount.is_positive() && normalized.is_positive() =>
            {
                expense.amount = amount;
                expense.normalized_amount = normalized;
                expense.origin = origin;
                Ok(ExpenseReduction::Reduced(expense.clone()))
            }
            _ => {
                self.work.expenses.remove(idx);
                Ok(ExpenseReduction::Deleted)
            }
        }
    }

    async fn create_mirrored_expense(&mut self, expense: Expense) -> ResultEngine<()> {
        self.insert_expense(expense).await
    }

    async fn update_settlement_status(
        &mut self,
        settlement_id: Uuid,
        expected: SettlementStatus,
        next: SettlementStatus,
        at: DateTime<Utc>,
    ) -> ResultEngine<Settlement> {
        let settlement = self
            .work
            .settlements
            .iter_mut()
            .find(|s| s.id == settlement_id)
            .ok_or_else(|| EngineError::KeyNotFound("settlement not exists".to_string()))?;
        if settlement.status != expected {
            return Err(EngineError::Conflict(format!(
                "settlement is {}, expected {}",
                settlement.status.as_str(),
                expected.as_str()
            )));
        }
        settlement.transition(next, at)?;
        Ok(settlement.clone())
    }

    async fn commit(self) -> ResultEngine<()> {
        let MemoryTx { mut guard, work } = self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self) -> ResultEngine<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> Group {
        Group {
            id: Uuid::new_v4(),
            name: "Flat".to_string(),
            members: vec![Member::new("alice", "Alice"), Member::new("bob", "Bob")],
        }
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let ledger = MemoryLedger::new();
        let group = group();
        let group_id = group.id;
        {
            let mut tx = ledger.begin().await.unwrap();
            tx.insert_group(group).await.unwrap();
        }
        let mut tx = ledger.begin().await.unwrap();
        assert!(tx.group(group_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let ledger = MemoryLedger::new();
        let group = group();
        let group_id = group.id;
        let mut tx = ledger.begin().await.unwrap();
        tx.insert_group(group).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = ledger.begin().await.unwrap();
        assert_eq!(tx.list_group_members(group_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn status_update_is_compare_and_set() {
        let ledger = MemoryLedger::new();
        let settlement =
            Settlement::new(Uuid::new_v4(), "bob", "alice", MoneyCents::new(10), Utc::now())
                .unwrap();
        let id = settlement.id;
        let mut tx = ledger.begin().await.unwrap();
        tx.insert_settlement(settlement).await.unwrap();
        tx.update_settlement_status(
            id,
            SettlementStatus::Pending,
            SettlementStatus::Confirmed,
            Utc::now(),
        )
        .await
        .unwrap();

        let err = tx
            .update_settlement_status(
                id,
                SettlementStatus::Pending,
                SettlementStatus::Rejected,
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn reduce_deletes_when_nothing_is_left() {
        let ledger = MemoryLedger::new();
        let expense =
            Expense::new(None, "bob", MoneyCents::new(150_00), "Dinner", Utc::now()).unwrap();
        let id = expense.id;
        let mut tx = ledger.begin().await.unwrap();
        tx.insert_expense(expense).await.unwrap();

        let outcome = tx
            .reduce_or_delete_expense(
                id,
                MoneyCents::new(150_00),
                ExpenseOrigin::SettlementAdjustment,
            )
            .await
            .unwrap();
        assert_eq!(outcome, ExpenseReduction::Deleted);
        assert!(tx.expense(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reduce_deletes_when_normalized_amount_runs_out() {
        let ledger = MemoryLedger::new();
        let expense = Expense::new(None, "bob", MoneyCents::new(300), "Taxi", Utc::now())
            .unwrap()
            .normalized(MoneyCents::new(100))
            .unwrap();
        let id = expense.id;
        let mut tx = ledger.begin().await.unwrap();
        tx.insert_expense(expense).await.unwrap();

        let outcome = tx
            .reduce_or_delete_expense(
                id,
                MoneyCents::new(100),
                ExpenseOrigin::SettlementAdjustment,
            )
            .await
            .unwrap();
        assert_eq!(outcome, ExpenseReduction::Deleted);
        assert!(tx.expense(id).await.unwrap().is_none());
    }
}
