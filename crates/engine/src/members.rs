//! Groups, members and derived balances.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub display_name: String,
}

impl Member {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// A group of members sharing expenses. Member order is join order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<Member>,
}

impl Group {
    pub fn member(&self, member_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == member_id)
    }

    pub fn is_member(&self, member_id: &str) -> bool {
        self.member(member_id).is_some()
    }
}

/// Net position of a member within a group. Derived, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    pub member_id: String,
    /// Positive: owes the group. Negative: the group owes them.
    pub balance: MoneyCents,
    /// Total paid out of pocket.
    pub paid: MoneyCents,
    /// Total share of expenses consumed.
    pub owed: MoneyCents,
}

impl MemberBalance {
    pub fn zero(member_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            balance: MoneyCents::ZERO,
            paid: MoneyCents::ZERO,
            owed: MoneyCents::ZERO,
        }
    }
}
