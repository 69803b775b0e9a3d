//! Expense primitives.
//!
//! An [`Expense`] is a payment made by one member. Inside a group it is the
//! input of the balance calculator; when it carries a shared-split marker it
//! is divided equally among every member of the group.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

/// Provenance of an expense.
///
/// Expenses touched by a settlement confirmation are tagged so downstream
/// notification logic can tell them apart from what a member typed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseOrigin {
    #[default]
    User,
    /// The creditor's original expense, shrunk by a confirmed settlement.
    SettlementAdjustment,
    /// The debtor's record of a payment made through a settlement.
    SettlementMirror,
}

impl ExpenseOrigin {
    /// Whether a change to an expense with this origin should stay silent.
    #[must_use]
    pub fn suppresses_notification(self) -> bool {
        !matches!(self, Self::User)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: Option<Uuid>,
    /// Member the expense belongs to.
    pub owner: String,
    /// Member who actually paid.
    pub paid_by: String,
    pub amount: MoneyCents,
    /// Amount in the ledger unit. Fixed at creation.
    pub normalized_amount: MoneyCents,
    /// Per-head share when the expense is divided among the whole group.
    pub split_amount: Option<MoneyCents>,
    pub description: String,
    pub category: Option<String>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub origin: ExpenseOrigin,
}

impl Expense {
    /// Creates a self-funded user expense; the amount is already normalized.
    pub fn new(
        group_id: Option<Uuid>,
        owner: impl Into<String>,
        amount: MoneyCents,
        description: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::Validation(
                "expense amount must be > 0".to_string(),
            ));
        }
        let owner = owner.into();
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            paid_by: owner.clone(),
            owner,
            amount,
            normalized_amount: amount,
            split_amount: None,
            description: description.into(),
            category: None,
            note: None,
            occurred_at,
            created_at: Utc::now(),
            origin: ExpenseOrigin::User,
        })
    }

    #[must_use]
    pub fn paid_by(mut self, member_id: impl Into<String>) -> Self {
        self.paid_by = member_id.into();
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn shared(mut self, split_amount: MoneyCents) -> Self {
        self.split_amount = Some(split_amount);
        self
    }

    /// Sets an amount in the ledger unit that differs from the entered one.
    pub fn normalized(mut self, normalized_amount: MoneyCents) -> ResultEngine<Self> {
        if !normalized_amount.is_positive() {
            return Err(EngineError::Validation(
                "normalized amount must be > 0".to_string(),
            ));
        }
        self.normalized_amount = normalized_amount;
        Ok(self)
    }

    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.split_amount.is_some()
    }

    /// Builds the debtor-side record of a confirmed settlement.
    pub(crate) fn settlement_mirror(
        group_id: Uuid,
        debtor: &str,
        amount: MoneyCents,
        template: Option<&Expense>,
        creditor_name: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        let description = match template {
            Some(original) => format!("Debt settlement - {}", original.description),
            None => "Debt settlement".to_string(),
        };
        let mut mirror = Self::new(Some(group_id), debtor, amount, description, at)?
            .note(format!("Settled with {creditor_name}"));
        mirror.category = template.and_then(|original| original.category.clone());
        mirror.origin = ExpenseOrigin::SettlementMirror;
        Ok(mirror)
    }
}
