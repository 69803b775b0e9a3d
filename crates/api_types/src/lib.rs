use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberNew {
        pub id: String,
        pub display_name: String,
    }

    /// Request body for creating a group. The acting member must be listed.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
        pub members: Vec<MemberNew>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub id: String,
        pub display_name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: Uuid,
        pub name: String,
        pub members: Vec<MemberView>,
    }
}

pub mod expense {
    use super::*;

    /// How the expense is divided.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum ExpenseSplit {
        #[default]
        Personal,
        /// Divided equally. Without `participants`, among every member.
        Group { participants: Option<Vec<String>> },
        /// Paid by the acting member for `owner`.
        OnBehalfOf { owner: String },
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub amount_minor: i64,
        /// Amount in the ledger unit, when entered in another currency.
        pub normalized_amount_minor: Option<i64>,
        pub description: String,
        pub category: Option<String>,
        pub note: Option<String>,
        #[serde(default)]
        pub split: ExpenseSplit,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseCreated {
        pub id: Uuid,
        /// Per-head share, present on shared expenses.
        pub split_amount_minor: Option<i64>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberBalanceView {
        pub member_id: String,
        /// Positive: owes the group. Negative: is owed.
        pub balance_minor: i64,
        pub paid_minor: i64,
        pub owed_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesResponse {
        pub balances: Vec<MemberBalanceView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CounterpartyView {
        pub member_id: String,
        pub display_name: Option<String>,
        pub total_minor: i64,
        pub record_ids: Vec<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtsResponse {
        pub member_id: String,
        pub owes: Vec<CounterpartyView>,
        pub owed_by: Vec<CounterpartyView>,
        pub net_minor: i64,
    }
}

pub mod settlement {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum SettlementStatus {
        Pending,
        Confirmed,
        Rejected,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementNew {
        pub from: String,
        pub to: String,
        pub amount_minor: i64,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementView {
        pub id: Uuid,
        pub group_id: Uuid,
        pub from: String,
        pub to: String,
        pub amount_minor: i64,
        pub status: SettlementStatus,
        pub note: Option<String>,
        pub created_at: DateTime<Utc>,
        pub confirmed_at: Option<DateTime<Utc>>,
        pub rejected_at: Option<DateTime<Utc>>,
    }

    /// Settlement proposals. Not persisted: confirm them by requesting.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProposalsResponse {
        pub proposals: Vec<SettlementView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementsResponse {
        pub pending: Vec<SettlementView>,
        pub history: Vec<SettlementView>,
    }
}
