//! Balance, proposal and debt API endpoints

use api_types::{
    balance::{BalancesResponse, CounterpartyView, DebtsResponse, MemberBalanceView},
    settlement::ProposalsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use engine::CounterpartyDebt;
use uuid::Uuid;

use crate::{
    ServerError,
    server::{ActingMember, ServerState},
    settlements::settlement_view,
};

fn counterparty_view(debt: CounterpartyDebt) -> CounterpartyView {
    CounterpartyView {
        member_id: debt.member_id,
        display_name: debt.display_name,
        total_minor: debt.total.cents(),
        record_ids: debt.record_ids,
    }
}

pub async fn get_balances(
    Extension(member): Extension<ActingMember>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<BalancesResponse>, ServerError> {
    state.engine.group(group_id, &member.0).await?;
    let balances = state
        .engine
        .compute_balances(group_id)
        .await?
        .into_iter()
        .map(|b| MemberBalanceView {
            member_id: b.member_id,
            balance_minor: b.balance.cents(),
            paid_minor: b.paid.cents(),
            owed_minor: b.owed.cents(),
        })
        .collect();

    Ok(Json(BalancesResponse { balances }))
}

pub async fn get_proposals(
    Extension(member): Extension<ActingMember>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<ProposalsResponse>, ServerError> {
    state.engine.group(group_id, &member.0).await?;
    let proposals = state
        .engine
        .compute_settlement_proposals(group_id, Utc::now())
        .await?
        .into_iter()
        .map(settlement_view)
        .collect();

    Ok(Json(ProposalsResponse { proposals }))
}

/// Unpaid debts of the acting member
pub async fn get_debts(
    Extension(member): Extension<ActingMember>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<DebtsResponse>, ServerError> {
    state.engine.group(group_id, &member.0).await?;
    let debts = state.engine.member_debts(group_id, &member.0).await?;

    Ok(Json(DebtsResponse {
        member_id: debts.member_id,
        owes: debts.owes.into_iter().map(counterparty_view).collect(),
        owed_by: debts.owed_by.into_iter().map(counterparty_view).collect(),
        net_minor: debts.net.cents(),
    }))
}
