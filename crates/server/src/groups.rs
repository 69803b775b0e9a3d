//! Group and expense API endpoints

use api_types::{
    expense::{ExpenseCreated, ExpenseNew, ExpenseSplit},
    group::{GroupNew, GroupView, MemberView},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use engine::{CreateGroupCmd, MoneyCents, RecordExpenseCmd};
use uuid::Uuid;

use crate::{
    ServerError,
    server::{ActingMember, ServerState},
};

/// Handle requests for creating a new group
pub async fn group_new(
    Extension(member): Extension<ActingMember>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<Json<GroupView>, ServerError> {
    let cmd = payload.members.into_iter().fold(
        CreateGroupCmd::new(payload.name, member.0),
        |cmd, m| cmd.member(m.id, m.display_name),
    );
    let group = state.engine.create_group(cmd).await?;

    Ok(Json(GroupView {
        id: group.id,
        name: group.name,
        members: group
            .members
            .into_iter()
            .map(|m| MemberView {
                id: m.id,
                display_name: m.display_name,
            })
            .collect(),
    }))
}

/// Handle requests for recording an expense paid by the acting member
pub async fn expense_new(
    Extension(member): Extension<ActingMember>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<ExpenseNew>,
) -> Result<Json<ExpenseCreated>, ServerError> {
    state.engine.group(group_id, &member.0).await?;

    let mut cmd = RecordExpenseCmd::new(
        group_id,
        member.0,
        MoneyCents::new(payload.amount_minor),
        payload.description,
        payload.occurred_at.with_timezone(&Utc),
    );
    cmd.normalized_amount = payload.normalized_amount_minor.map(MoneyCents::new);
    cmd.category = payload.category;
    cmd.note = payload.note;
    let cmd = match payload.split {
        ExpenseSplit::Personal => cmd,
        ExpenseSplit::Group {
            participants: None,
        } => cmd.split_with_group(),
        ExpenseSplit::Group {
            participants: Some(participants),
        } => cmd.split_with(participants),
        ExpenseSplit::OnBehalfOf { owner } => cmd.on_behalf_of(owner),
    };

    let expense = state.engine.record_expense(cmd).await?;
    Ok(Json(ExpenseCreated {
        id: expense.id,
        split_amount_minor: expense.split_amount.map(MoneyCents::cents),
    }))
}
