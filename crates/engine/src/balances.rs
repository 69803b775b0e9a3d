//! Balance calculator.
//!
//! Folds the expenses of a group into one signed net balance per member.
//! Every expense contributes exactly zero to the group total, so the sum of
//! all balances is always zero.

use std::collections::HashMap;

use crate::{Expense, Member, MemberBalance, MoneyCents, ResultEngine, util::amount_overflow};

/// Computes member balances from group expenses.
///
/// - Shared expenses credit the payer with the full amount and debit every
///   member (payer included) with an equal share. Remainder cents go to the
///   leading members in list order.
/// - Personal debts (payer != owner, no split marker) credit the payer and
///   debit the owner with the full amount.
/// - Self-funded expenses leave the balance untouched.
///
/// Expenses whose payer (or, for personal debts, owner) is not in `members`
/// are skipped. The output follows `members` order.
///
/// Fails with `Validation` when a running total overflows.
pub fn compute_member_balances(
    expenses: &[Expense],
    members: &[Member],
) -> ResultEngine<Vec<MemberBalance>> {
    let mut balances: Vec<MemberBalance> = members
        .iter()
        .map(|m| MemberBalance::zero(m.id.as_str()))
        .collect();
    let index: HashMap<&str, usize> = members
        .iter()
        .enumerate()
        .map(|(idx, m)| (m.id.as_str(), idx))
        .collect();

    for expense in expenses {
        let amount = expense.normalized_amount;
        let Some(&payer) = index.get(expense.paid_by.as_str()) else {
            tracing::debug!(expense_id = %expense.id, "payer left the group, skipping expense");
            continue;
        };

        if expense.is_shared() {
            let payer = &mut balances[payer];
            payer.paid = add(payer.paid, amount)?;
            payer.balance = sub(payer.balance, amount)?;
            for (member, share) in balances.iter_mut().zip(amount.split_evenly(members.len())) {
                member.owed = add(member.owed, share)?;
                member.balance = add(member.balance, share)?;
            }
            continue;
        }

        let Some(&owner) = index.get(expense.owner.as_str()) else {
            tracing::debug!(expense_id = %expense.id, "owner left the group, skipping expense");
            continue;
        };
        balances[payer].paid = add(balances[payer].paid, amount)?;
        balances[owner].owed = add(balances[owner].owed, amount)?;
        if payer != owner {
            balances[payer].balance = sub(balances[payer].balance, amount)?;
            balances[owner].balance = add(balances[owner].balance, amount)?;
        }
    }

    Ok(balances)
}

fn add(lhs: MoneyCents, rhs: MoneyCents) -> ResultEngine<MoneyCents> {
    lhs.checked_add(rhs).ok_or_else(amount_overflow)
}

fn sub(lhs: MoneyCents, rhs: MoneyCents) -> ResultEngine<MoneyCents> {
    lhs.checked_sub(rhs).ok_or_else(amount_overflow)
}

/// Sum of all balances. Zero for any output of [`compute_member_balances`].
pub fn total(balances: &[MemberBalance]) -> MoneyCents {
    balances.iter().map(|b| b.balance).sum()
}
