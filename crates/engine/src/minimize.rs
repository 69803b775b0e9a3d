//! Settlement minimizer.
//!
//! Greedy multi-debtor/multi-creditor matching: the largest debtor pays the
//! largest creditor until one side is exhausted. Not globally optimal in
//! every debt graph, but it never needs more than
//! `debtors + creditors - 1` payments.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{MemberBalance, MoneyCents, ResultEngine, Settlement};

/// Derives `PENDING` settlement proposals that zero every balance.
///
/// Debtors (balance >= one cent) and creditors (balance <= minus one cent)
/// are ordered by magnitude, largest first. The sort is stable, so ties keep
/// the input order and the output is deterministic for a given input.
pub fn minimize_settlements(
    group_id: Uuid,
    balances: &[MemberBalance],
    at: DateTime<Utc>,
) -> ResultEngine<Vec<Settlement>> {
    let mut debtors: Vec<(&str, MoneyCents)> = balances
        .iter()
        .filter(|b| b.balance.is_positive() && b.balance.is_significant())
        .map(|b| (b.member_id.as_str(), b.balance))
        .collect();
    let mut creditors: Vec<(&str, MoneyCents)> = balances
        .iter()
        .filter(|b| b.balance.is_negative() && b.balance.is_significant())
        .map(|b| (b.member_id.as_str(), b.balance.abs()))
        .collect();
    debtors.sort_by(|a, b| b.1.cmp(&a.1));
    creditors.sort_by(|a, b| b.1.cmp(&a.1));

    let mut settlements = Vec::new();
    let (mut d, mut c) = (0, 0);
    while d < debtors.len() && c < creditors.len() {
        let (debtor, owes) = debtors[d];
        let (creditor, owed) = creditors[c];
        let amount = owes.min(owed);

        if amount.is_significant() {
            settlements.push(Settlement::new(group_id, debtor, creditor, amount, at)?);
        }

        debtors[d].1 -= amount;
        creditors[c].1 -= amount;
        if !debtors[d].1.is_significant() {
            d += 1;
        }
        if !creditors[c].1.is_significant() {
            c += 1;
        }
    }

    tracing::debug!(
        %group_id,
        debtors = debtors.len(),
        creditors = creditors.len(),
        proposals = settlements.len(),
        "settlement proposals computed"
    );
    Ok(settlements)
}
