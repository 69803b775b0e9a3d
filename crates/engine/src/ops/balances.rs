use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    DebtRecord, LedgerStore, LedgerTx, MemberBalance, MoneyCents, ResultEngine, Settlement,
    compute_member_balances, minimize_settlements,
    util::{amount_overflow, checked_total, require_member},
};

use super::{Engine, require_group, with_tx};

/// Unpaid debt between one member and a single counterparty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartyDebt {
    pub member_id: String,
    pub display_name: Option<String>,
    pub total: MoneyCents,
    pub record_ids: Vec<Uuid>,
}

/// Unpaid debt position of one member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDebts {
    pub member_id: String,
    /// What the member owes, per creditor.
    pub owes: Vec<CounterpartyDebt>,
    /// What others owe the member, per debtor.
    pub owed_by: Vec<CounterpartyDebt>,
    /// `owed_by - owes`.
    pub net: MoneyCents,
}

impl<S: LedgerStore> Engine<S> {
    /// Net balance of every current member, in member order.
    ///
    /// Expenses whose payer or owner left the group are skipped.
    pub async fn compute_balances(&self, group_id: Uuid) -> ResultEngine<Vec<MemberBalance>> {
        let balances = with_tx!(self, |tx| load_balances(&mut tx, group_id).await)?;
        tracing::debug!(%group_id, members = balances.len(), "balances computed");
        Ok(balances)
    }

    /// Payments that would zero every balance of the group.
    ///
    /// Proposals are `Pending` and are not persisted.
    pub async fn compute_settlement_proposals(
        &self,
        group_id: Uuid,
        at: DateTime<Utc>,
    ) -> ResultEngine<Vec<Settlement>> {
        let balances = self.compute_balances(group_id).await?;
        minimize_settlements(group_id, &balances, at)
    }

    /// Unpaid debts of `member_id`, grouped by counterparty.
    pub async fn member_debts(&self, group_id: Uuid, member_id: &str) -> ResultEngine<MemberDebts> {
        with_tx!(self, |tx| load_member_debts(&mut tx, group_id, member_id).await)
    }

    /// Net unpaid debt of every member, in member order. Sums to zero.
    pub async fn debt_balances(&self, group_id: Uuid) -> ResultEngine<Vec<MemberDebts>> {
        with_tx!(self, |tx| load_debt_balances(&mut tx, group_id).await)
    }
}

async fn load_balances<T: LedgerTx>(tx: &mut T, group_id: Uuid) -> ResultEngine<Vec<MemberBalance>> {
    let members = tx.list_group_members(group_id).await?;
    let expenses = tx.list_group_expenses(group_id).await?;
    compute_member_balances(&expenses, &members)
}

async fn load_member_debts<T: LedgerTx>(
    tx: &mut T,
    group_id: Uuid,
    member_id: &str,
) -> ResultEngine<MemberDebts> {
    let group = require_group(tx, group_id).await?;
    require_member(&group, member_id, "member")?;
    let records = tx.list_group_debt_records(group_id, true).await?;

    let mut debts = debts_of(member_id, &records)?;
    for counterparty in debts.owes.iter_mut().chain(debts.owed_by.iter_mut()) {
        counterparty.display_name = group
            .member(&counterparty.member_id)
            .map(|m| m.display_name.clone());
    }
    Ok(debts)
}

async fn load_debt_balances<T: LedgerTx>(
    tx: &mut T,
    group_id: Uuid,
) -> ResultEngine<Vec<MemberDebts>> {
    let group = require_group(tx, group_id).await?;
    let records = tx.list_group_debt_records(group_id, true).await?;
    group
        .members
        .iter()
        .map(|member| debts_of(&member.id, &records))
        .collect()
}

/// Groups unpaid records touching `member_id` by counterparty.
fn debts_of(member_id: &str, records: &[DebtRecord]) -> ResultEngine<MemberDebts> {
    let mut owes: BTreeMap<&str, Vec<&DebtRecord>> = BTreeMap::new();
    let mut owed_by: BTreeMap<&str, Vec<&DebtRecord>> = BTreeMap::new();
    for record in records.iter().filter(|r| !r.paid) {
        if record.owed_by == member_id {
            owes.entry(record.paid_by.as_str()).or_default().push(record);
        } else if record.paid_by == member_id {
            owed_by.entry(record.owed_by.as_str()).or_default().push(record);
        }
    }

    let owes = collapse(owes)?;
    let owed_by = collapse(owed_by)?;
    let owes_total = checked_total(owes.iter().map(|d| d.total))?;
    let owed_total = checked_total(owed_by.iter().map(|d| d.total))?;
    let net = owed_total.checked_sub(owes_total).ok_or_else(amount_overflow)?;
    Ok(MemberDebts {
        member_id: member_id.to_string(),
        owes,
        owed_by,
        net,
    })
}

fn collapse(grouped: BTreeMap<&str, Vec<&DebtRecord>>) -> ResultEngine<Vec<CounterpartyDebt>> {
    grouped
        .into_iter()
        .map(|(counterparty, records)| {
            Ok(CounterpartyDebt {
                member_id: counterparty.to_string(),
                display_name: None,
                total: checked_total(records.iter().map(|r| r.amount))?,
                record_ids: records.iter().map(|r| r.id).collect(),
            })
        })
        .collect()
}
