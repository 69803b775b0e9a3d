//! Settlement API endpoints

use api_types::settlement::{
    SettlementNew, SettlementStatus as ApiStatus, SettlementView, SettlementsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use engine::{MoneyCents, RequestSettlementCmd, Settlement, SettlementStatus};
use uuid::Uuid;

use crate::{
    ServerError,
    server::{ActingMember, ServerState},
};

fn map_status(status: SettlementStatus) -> ApiStatus {
    match status {
        SettlementStatus::Pending => ApiStatus::Pending,
        SettlementStatus::Confirmed => ApiStatus::Confirmed,
        SettlementStatus::Rejected => ApiStatus::Rejected,
    }
}

pub(crate) fn settlement_view(settlement: Settlement) -> SettlementView {
    SettlementView {
        id: settlement.id,
        group_id: settlement.group_id,
        from: settlement.from,
        to: settlement.to,
        amount_minor: settlement.amount.cents(),
        status: map_status(settlement.status),
        note: settlement.note,
        created_at: settlement.created_at,
        confirmed_at: settlement.confirmed_at,
        rejected_at: settlement.rejected_at,
    }
}

pub async fn list(
    Extension(member): Extension<ActingMember>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<SettlementsResponse>, ServerError> {
    let listed = state.engine.list_settlements(group_id, &member.0).await?;

    Ok(Json(SettlementsResponse {
        pending: listed.pending.into_iter().map(settlement_view).collect(),
        history: listed.history.into_iter().map(settlement_view).collect(),
    }))
}

pub async fn request(
    Extension(member): Extension<ActingMember>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<SettlementNew>,
) -> Result<Json<SettlementView>, ServerError> {
    let mut cmd = RequestSettlementCmd::new(
        group_id,
        payload.from,
        payload.to,
        MoneyCents::new(payload.amount_minor),
        member.0,
        Utc::now(),
    );
    cmd.note = payload.note;
    let settlement = state.engine.request_settlement(cmd).await?;

    Ok(Json(settlement_view(settlement)))
}

pub async fn confirm(
    Extension(member): Extension<ActingMember>,
    State(state): State<ServerState>,
    Path(settlement_id): Path<Uuid>,
) -> Result<Json<SettlementView>, ServerError> {
    let settlement = state
        .engine
        .confirm_settlement(settlement_id, &member.0, Utc::now())
        .await?;

    Ok(Json(settlement_view(settlement)))
}

pub async fn reject(
    Extension(member): Extension<ActingMember>,
    State(state): State<ServerState>,
    Path(settlement_id): Path<Uuid>,
) -> Result<Json<SettlementView>, ServerError> {
    let settlement = state
        .engine
        .reject_settlement(settlement_id, &member.0, Utc::now())
        .await?;

    Ok(Json(settlement_view(settlement)))
}
