use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    CreateGroupCmd, DebtRecord, EngineError, Expense, ExpenseShare, Group, LedgerEvent,
    LedgerStore, LedgerTx, Member, RecordExpenseCmd, ResultEngine, compute_member_balances,
    util::{ensure_positive, require_member},
};

use super::{
    Engine, normalize_optional_text, normalize_required_name, require_group, require_membership,
    with_tx,
};

impl<S: LedgerStore> Engine<S> {
    /// Creates a group. The creator must be one of the members.
    pub async fn create_group(&self, cmd: CreateGroupCmd) -> ResultEngine<Group> {
        let group = build_group(cmd)?;
        let created = with_tx!(self, |tx| insert_group(&mut tx, group).await)?;
        tracing::info!(group_id = %created.id, members = created.members.len(), "group created");
        Ok(created)
    }

    /// Records an expense paid by a group member.
    ///
    /// Shared expenses carry the split marker and create one unpaid debt per
    /// participant other than the payer. Expenses paid on behalf of another
    /// member create a single debt for the full amount.
    pub async fn record_expense(&self, cmd: RecordExpenseCmd) -> ResultEngine<Expense> {
        let (expense, debts) = with_tx!(self, |tx| insert_expense(&mut tx, cmd).await)?;

        tracing::info!(
            expense_id = %expense.id,
            debts = debts.len(),
            shared = expense.is_shared(),
            "expense recorded"
        );
        for debt in debts {
            self.emit(LedgerEvent::ExpenseShared {
                group_id: debt.group_id,
                expense_id: debt.expense_id,
                recipient: debt.owed_by,
                payer: debt.paid_by,
                amount: debt.amount,
            })
            .await;
        }
        Ok(expense)
    }

    /// Loads a group on behalf of one of its members.
    pub async fn group(&self, group_id: Uuid, acting_member: &str) -> ResultEngine<Group> {
        with_tx!(self, |tx| load_group(&mut tx, group_id, acting_member).await)
    }
}

async fn insert_expense<T: LedgerTx>(
    tx: &mut T,
    cmd: RecordExpenseCmd,
) -> ResultEngine<(Expense, Vec<DebtRecord>)> {
    ensure_positive(cmd.amount, "expense amount")?;
    let normalized = cmd.normalized_amount.unwrap_or(cmd.amount);
    ensure_positive(normalized, "normalized amount")?;

    let group = require_group(tx, cmd.group_id).await?;
    require_member(&group, &cmd.paid_by, "payer")?;

    let description = normalize_required_name(&cmd.description, "description")?;
    let mut expense = Expense::new(
        Some(group.id),
        cmd.paid_by.as_str(),
        cmd.amount,
        description,
        cmd.occurred_at,
    )?
    .normalized(normalized)?;
    expense.category = normalize_optional_text(cmd.category.as_deref());
    expense.note = normalize_optional_text(cmd.note.as_deref());

    let now = Utc::now();
    let mut debts = Vec::new();
    match cmd.share {
        ExpenseShare::Personal => {}
        ExpenseShare::Group { participants } => {
            let participants = resolve_participants(&group, participants)?;
            let shares = normalized.split_evenly(participants.len());
            expense.split_amount = shares.first().copied();
            for (participant, share) in participants.iter().zip(shares) {
                if participant == &cmd.paid_by || !share.is_positive() {
                    continue;
                }
                debts.push(DebtRecord::new(
                    group.id,
                    expense.id,
                    participant.as_str(),
                    cmd.paid_by.as_str(),
                    share,
                    now,
                )?);
            }
        }
        ExpenseShare::OnBehalfOf { owner } => {
            require_member(&group, &owner, "owner")?;
            if owner == cmd.paid_by {
                return Err(EngineError::Validation(
                    "an expense cannot be paid on behalf of the payer".to_string(),
                ));
            }
            debts.push(DebtRecord::new(
                group.id,
                expense.id,
                owner.as_str(),
                cmd.paid_by.as_str(),
                normalized,
                now,
            )?);
            expense.owner = owner;
        }
    }

    // Balances must stay representable with the new expense in.
    let mut expenses = tx.list_group_expenses(group.id).await?;
    expenses.push(expense.clone());
    compute_member_balances(&expenses, &group.members)?;

    tx.insert_expense(expense.clone()).await?;
    for debt in &debts {
        tx.insert_debt_record(debt.clone()).await?;
    }
    Ok((expense, debts))
}

async fn insert_group<T: LedgerTx>(tx: &mut T, group: Group) -> ResultEngine<Group> {
    tx.insert_group(group.clone()).await?;
    Ok(group)
}

async fn load_group<T: LedgerTx>(
    tx: &mut T,
    group_id: Uuid,
    acting_member: &str,
) -> ResultEngine<Group> {
    let group = require_group(tx, group_id).await?;
    require_membership(&group, acting_member)?;
    Ok(group)
}

fn build_group(cmd: CreateGroupCmd) -> ResultEngine<Group> {
    let name = normalize_required_name(&cmd.name, "group name")?;
    if cmd.members.is_empty() {
        return Err(EngineError::Validation(
            "a group needs at least one member".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut members = Vec::with_capacity(cmd.members.len());
    for member in cmd.members {
        let id = normalize_required_name(&member.id, "member id")?;
        if !seen.insert(id.clone()) {
            return Err(EngineError::Validation(format!("duplicate member {id}")));
        }
        let display_name =
            normalize_optional_text(Some(&member.display_name)).unwrap_or_else(|| id.clone());
        members.push(Member::new(id, display_name));
    }
    if !seen.contains(cmd.created_by.trim()) {
        return Err(EngineError::Validation(
            "the creator must be a member of the group".to_string(),
        ));
    }

    Ok(Group {
        id: Uuid::new_v4(),
        name,
        members,
    })
}

/// Participants of a shared expense, in group order, deduplicated.
fn resolve_participants(
    group: &Group,
    requested: Option<Vec<String>>,
) -> ResultEngine<Vec<String>> {
    let Some(requested) = requested else {
        return Ok(group.members.iter().map(|m| m.id.clone()).collect());
    };
    for id in &requested {
        require_member(group, id, "participant")?;
    }
    let participants: Vec<String> = group
        .members
        .iter()
        .filter(|m| requested.contains(&m.id))
        .map(|m| m.id.clone())
        .collect();
    if participants.is_empty() {
        return Err(EngineError::Validation(
            "a shared expense needs at least one participant".to_string(),
        ));
    }
    Ok(participants)
}
