//! Command structs for engine operations.
//!
//! These types group parameters for write operations (group creation,
//! expense recording, settlement requests), keeping call sites readable and
//! avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Member, MoneyCents};

/// Create a group.
#[derive(Clone, Debug)]
pub struct CreateGroupCmd {
    pub name: String,
    pub members: Vec<Member>,
    pub created_by: String,
}

impl CreateGroupCmd {
    #[must_use]
    pub fn new(name: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            created_by: created_by.into(),
        }
    }

    #[must_use]
    pub fn member(mut self, id: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.members.push(Member::new(id, display_name));
        self
    }
}

/// How an expense is shared inside its group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ExpenseShare {
    /// Paid and consumed by the same member.
    #[default]
    Personal,
    /// Divided equally; every participant other than the payer owes a share.
    /// `None` means every member of the group.
    Group { participants: Option<Vec<String>> },
    /// Paid by `paid_by` on behalf of the expense owner, owed in full.
    OnBehalfOf { owner: String },
}

/// Record an expense paid by a group member.
#[derive(Clone, Debug)]
pub struct RecordExpenseCmd {
    pub group_id: Uuid,
    pub paid_by: String,
    pub amount: MoneyCents,
    /// Amount in the ledger unit, when the expense was entered in another
    /// currency. Defaults to `amount`.
    pub normalized_amount: Option<MoneyCents>,
    pub description: String,
    pub category: Option<String>,
    pub note: Option<String>,
    pub share: ExpenseShare,
    pub occurred_at: DateTime<Utc>,
}

impl RecordExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: Uuid,
        paid_by: impl Into<String>,
        amount: MoneyCents,
        description: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id,
            paid_by: paid_by.into(),
            amount,
            normalized_amount: None,
            description: description.into(),
            category: None,
            note: None,
            share: ExpenseShare::Personal,
            occurred_at,
        }
    }

    #[must_use]
    pub fn split_with_group(mut self) -> Self {
        self.share = ExpenseShare::Group { participants: None };
        self
    }

    /// Limits debt records to `participants`. Balances still divide the
    /// expense across the whole group, so proposals may ask members without
    /// debt records to pay, which `request_settlement` rejects.
    #[must_use]
    pub fn split_with(mut self, participants: Vec<String>) -> Self {
        self.share = ExpenseShare::Group {
            participants: Some(participants),
        };
        self
    }

    #[must_use]
    pub fn on_behalf_of(mut self, owner: impl Into<String>) -> Self {
        self.share = ExpenseShare::OnBehalfOf {
            owner: owner.into(),
        };
        self
    }

    #[must_use]
    pub fn normalized_amount(mut self, amount: MoneyCents) -> Self {
        self.normalized_amount = Some(amount);
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
}

/// Ask for a settlement between two members of a group.
#[derive(Clone, Debug)]
pub struct RequestSettlementCmd {
    pub group_id: Uuid,
    pub from: String,
    pub to: String,
    pub amount: MoneyCents,
    pub note: Option<String>,
    pub acting_member: String,
    pub at: DateTime<Utc>,
}

impl RequestSettlementCmd {
    #[must_use]
    pub fn new(
        group_id: Uuid,
        from: impl Into<String>,
        to: impl Into<String>,
        amount: MoneyCents,
        acting_member: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id,
            from: from.into(),
            to: to.into(),
            amount,
            note: None,
            acting_member: acting_member.into(),
            at,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
