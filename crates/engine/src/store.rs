//! Ledger storage seam.
//!
//! The engine never talks to a database directly. It opens a unit of work
//! with [`LedgerStore::begin`] and performs every read and write of one
//! operation through the returned [`LedgerTx`], which is then committed or
//! rolled back as a whole.
//!
//! Implementations must guarantee:
//! - dropping a transaction without `commit` discards its writes;
//! - two transactions touching the same settlement are serialized, or the
//!   later [`LedgerTx::update_settlement_status`] fails with
//!   [`EngineError::Conflict`](crate::EngineError::Conflict).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    DebtRecord, Expense, ExpenseOrigin, Group, Member, MoneyCents, ResultEngine, Settlement,
    SettlementStatus,
};

/// Outcome of shrinking an expense.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpenseReduction {
    Reduced(Expense),
    Deleted,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Tx: LedgerTx;

    async fn begin(&self) -> ResultEngine<Self::Tx>;
}

#[async_trait]
pub trait LedgerTx: Send {
    async fn group(&mut self, group_id: Uuid) -> ResultEngine<Option<Group>>;

    async fn list_group_members(&mut self, group_id: Uuid) -> ResultEngine<Vec<Member>>;

    async fn list_group_expenses(&mut self, group_id: Uuid) -> ResultEngine<Vec<Expense>>;

    async fn expense(&mut self, expense_id: Uuid) -> ResultEngine<Option<Expense>>;

    /// Unpaid records where `owed_by` owes `paid_to`, oldest first.
    async fn list_unpaid_debt_records(
        &mut self,
        group_id: Uuid,
        owed_by: &str,
        paid_to: &str,
    ) -> ResultEngine<Vec<DebtRecord>>;

    /// All debt records of a group, oldest first.
    async fn list_group_debt_records(
        &mut self,
        group_id: Uuid,
        unpaid_only: bool,
    ) -> ResultEngine<Vec<DebtRecord>>;

    async fn settlement(&mut self, settlement_id: Uuid) -> ResultEngine<Option<Settlement>>;

    async fn list_settlements(&mut self, group_id: Uuid) -> ResultEngine<Vec<Settlement>>;

    async fn insert_group(&mut self, group: Group) -> ResultEngine<()>;

    async fn insert_expense(&mut self, expense: Expense) -> ResultEngine<()>;

    async fn insert_debt_record(&mut self, record: DebtRecord) -> ResultEngine<()>;

    async fn insert_settlement(&mut self, settlement: Settlement) -> ResultEngine<()>;

    async fn mark_debt_record_paid(
        &mut self,
        record_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<()>;

    /// Splits `paid_portion` off an unpaid record into a new paid record and
    /// returns it. The original keeps the rest, unpaid.
    async fn split_debt_record(
        &mut self,
        record_id: Uuid,
        paid_portion: MoneyCents,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<DebtRecord>;

    /// Reduces amount and normalized amount by `by`. Deletes the expense when
    /// either value would drop to zero or below, otherwise stamps `origin` on
    /// it.
    async fn reduce_or_delete_expense(
        &mut self,
        expense_id: Uuid,
        by: MoneyCents,
        origin: ExpenseOrigin,
    ) -> ResultEngine<ExpenseReduction>;

    async fn create_mirrored_expense(&mut self, expense: Expense) -> ResultEngine<()>;

    /// Compare-and-set on the settlement status.
    ///
    /// Fails with `Conflict` when the stored status is not `expected`.
    async fn update_settlement_status(
        &mut self,
        settlement_id: Uuid,
        expected: SettlementStatus,
        next: SettlementStatus,
        at: DateTime<Utc>,
    ) -> ResultEngine<Settlement>;

    async fn commit(self) -> ResultEngine<()>;

    async fn rollback(self) -> ResultEngine<()>;
}
