//! Group ledger settlement engine.
//!
//! Turns the shared expenses of a group into per-member balances, proposes
//! the payments that zero them, and applies confirmed settlements to the
//! debt ledger inside a single transaction.

pub use balances::compute_member_balances;
pub use commands::{CreateGroupCmd, ExpenseShare, RecordExpenseCmd, RequestSettlementCmd};
pub use debts::DebtRecord;
pub use error::EngineError;
pub use events::{EventSink, LedgerEvent, MemoryEvents, TracingEvents};
pub use expenses::{Expense, ExpenseOrigin};
pub use members::{Group, Member, MemberBalance};
pub use memory::{MemoryLedger, MemoryTx};
pub use minimize::minimize_settlements;
pub use money::{EPSILON, MoneyCents};
pub use ops::{
    CounterpartyDebt, Engine, EngineBuilder, HISTORY_LIMIT, MemberDebts, SettlementHistory,
};
pub use settlements::{Settlement, SettlementStatus};
pub use store::{ExpenseReduction, LedgerStore, LedgerTx};

pub mod balances;
mod commands;
mod debts;
mod error;
mod events;
mod expenses;
mod members;
mod memory;
pub mod minimize;
mod money;
mod ops;
mod settlements;
mod store;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
