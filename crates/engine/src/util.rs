//! Internal helpers for validation.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so the engine enforces consistent invariants.

use crate::{EngineError, Group, Member, MoneyCents, ResultEngine};

/// Look up a member of `group`, failing with a labeled `KeyNotFound`.
pub(crate) fn require_member<'a>(
    group: &'a Group,
    member_id: &str,
    label: &str,
) -> ResultEngine<&'a Member> {
    group.member(member_id).ok_or_else(|| {
        EngineError::KeyNotFound(format!("{label} {member_id} is not a member of the group"))
    })
}

/// Reject amounts that are not strictly positive.
pub(crate) fn ensure_positive(amount: MoneyCents, label: &str) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::Validation(format!("{label} must be > 0")));
    }
    Ok(())
}

pub(crate) fn amount_overflow() -> EngineError {
    EngineError::Validation("amount overflow".to_string())
}

/// Sum amounts, reporting overflow instead of wrapping.
pub(crate) fn checked_total<I>(amounts: I) -> ResultEngine<MoneyCents>
where
    I: IntoIterator<Item = MoneyCents>,
{
    amounts
        .into_iter()
        .try_fold(MoneyCents::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or_else(amount_overflow)
}
