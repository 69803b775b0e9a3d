use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};

use std::sync::Arc;

use crate::{balances, groups, settlements};
use engine::{Engine, MemoryLedger};

/// Engine the HTTP adapter serves.
pub type LedgerEngine = Engine<MemoryLedger>;

static MEMBER_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("member-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<LedgerEngine>,
}

/// Member on whose behalf the request runs.
#[derive(Clone, Debug)]
pub struct ActingMember(pub String);

/// `TypedHeader` for the acting member
///
/// Every request must contain a non-blank "member-id" entry in the header.
#[derive(Debug)]
struct MemberHeader(String);

impl Header for MemberHeader {
    fn name() -> &'static axum::http::HeaderName {
        &MEMBER_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };

        Ok(MemberHeader(value.trim().to_string()))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        match axum::http::HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode member-id header"),
        }
    }
}

async fn auth(
    member_header: Option<TypedHeader<MemberHeader>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(MemberHeader(member_id))) = member_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if member_id.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(ActingMember(member_id));
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/groups", post(groups::group_new))
        .route("/groups/{group_id}/expenses", post(groups::expense_new))
        .route("/groups/{group_id}/balances", get(balances::get_balances))
        .route("/groups/{group_id}/proposals", get(balances::get_proposals))
        .route("/groups/{group_id}/debts", get(balances::get_debts))
        .route(
            "/groups/{group_id}/settlements",
            get(settlements::list).post(settlements::request),
        )
        .route(
            "/settlements/{settlement_id}/confirm",
            post(settlements::confirm),
        )
        .route("/settlements/{settlement_id}/reject", post(settlements::reject))
        .route_layer(middleware::from_fn(auth))
        .with_state(state)
}

pub async fn run(engine: LedgerEngine, addr: &str) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: LedgerEngine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: LedgerEngine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
