//! Debt records.
//!
//! A [`DebtRecord`] is a single directed IOU: `owed_by` owes `paid_by` an
//! amount, tied to the expense that created it. Settlement confirmation marks
//! records paid, splitting the last one when a payment is partial.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtRecord {
    pub id: Uuid,
    pub group_id: Uuid,
    pub expense_id: Uuid,
    /// Debtor.
    pub owed_by: String,
    /// Creditor.
    pub paid_by: String,
    pub amount: MoneyCents,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DebtRecord {
    pub fn new(
        group_id: Uuid,
        expense_id: Uuid,
        owed_by: impl Into<String>,
        paid_by: impl Into<String>,
        amount: MoneyCents,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        let owed_by = owed_by.into();
        let paid_by = paid_by.into();
        if !amount.is_positive() {
            return Err(EngineError::Validation(
                "debt amount must be > 0".to_string(),
            ));
        }
        if owed_by == paid_by {
            return Err(EngineError::Validation(
                "a member cannot owe themselves".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            expense_id,
            owed_by,
            paid_by,
            amount,
            paid: false,
            paid_at: None,
            created_at,
        })
    }

    /// Splits off `paid_portion` as a new, paid record.
    ///
    /// `self` keeps the unpaid rest. Both halves keep the expense linkage and
    /// the original creation time so oldest-first ordering is preserved.
    pub fn split_paid(
        &mut self,
        paid_portion: MoneyCents,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<DebtRecord> {
        if !paid_portion.is_positive() || paid_portion >= self.amount {
            return Err(EngineError::Validation(format!(
                "cannot split {} off a debt of {}",
                paid_portion, self.amount
            )));
        }
        if self.paid {
            return Err(EngineError::Conflict(
                "debt record already paid".to_string(),
            ));
        }
        self.amount -= paid_portion;
        Ok(DebtRecord {
            id: Uuid::new_v4(),
            amount: paid_portion,
            paid: true,
            paid_at: Some(paid_at),
            group_id: self.group_id,
            expense_id: self.expense_id,
            owed_by: self.owed_by.clone(),
            paid_by: self.paid_by.clone(),
            created_at: self.created_at,
        })
    }
}
