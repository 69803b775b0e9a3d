//! Settlement primitives.
//!
//! A [`Settlement`] is a proposed or executed payment from a debtor (`from`)
//! to a creditor (`to`). It is created `PENDING` and moves exactly once to
//! `CONFIRMED` or `REJECTED`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl SettlementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Rejected => "REJECTED",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub group_id: Uuid,
    /// Debtor.
    pub from: String,
    /// Creditor.
    pub to: String,
    pub amount: MoneyCents,
    pub status: SettlementStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl Settlement {
    /// Creates a `PENDING` settlement.
    pub fn new(
        group_id: Uuid,
        from: impl Into<String>,
        to: impl Into<String>,
        amount: MoneyCents,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        let from = from.into();
        let to = to.into();
        if !amount.is_positive() {
            return Err(EngineError::Validation(
                "settlement amount must be > 0".to_string(),
            ));
        }
        if from == to {
            return Err(EngineError::Validation(
                "settlement from/to must differ".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            from,
            to,
            amount,
            status: SettlementStatus::Pending,
            note: None,
            created_at,
            confirmed_at: None,
            rejected_at: None,
        })
    }

    #[must_use]
    pub fn note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    /// Applies a terminal transition. Anything but `PENDING -> terminal` is a
    /// conflict.
    pub fn transition(&mut self, next: SettlementStatus, at: DateTime<Utc>) -> ResultEngine<()> {
        if self.status.is_terminal() {
            return Err(EngineError::Conflict(format!(
                "settlement is already {}",
                self.status.as_str()
            )));
        }
        match next {
            SettlementStatus::Confirmed => self.confirmed_at = Some(at),
            SettlementStatus::Rejected => self.rejected_at = Some(at),
            SettlementStatus::Pending => {
                return Err(EngineError::Validation(
                    "cannot move a settlement back to PENDING".to_string(),
                ));
            }
        }
        self.status = next;
        Ok(())
    }

    /// Time of the terminal transition, if any.
    #[must_use]
    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at.or(self.rejected_at)
    }
}
