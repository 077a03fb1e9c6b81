//! Request handlers.
//!
//! Each handler authenticates from the `X-API-Key` header, calls the
//! `Gateway`, and serializes the result. Authorization lives in the
//! gateway, not here.
//!
//! Gateway calls take locks and may `sync_data` the audit journal, so they
//! run on tokio's blocking pool through `run_blocking`.

use std::{str::FromStr, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use unbound_contracts::{
    command::CommandEvent,
    error::GatewayError,
    rule::{NewRule, Rule, RuleId, RulePatch},
    user::{IssuedCredential, Role, User, UserId},
    verdict::ExecutionStatus,
};
use unbound_core::Gateway;

use crate::error::{ApiError, ApiResult};

pub const API_KEY_HEADER: &str = "x-api-key";

type SharedGateway = State<Arc<Gateway>>;

fn authenticate(gateway: &Gateway, headers: &HeaderMap) -> ApiResult<User> {
    let credential = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    Ok(gateway.authenticate(credential)?)
}

/// Run `f` against the gateway on the blocking thread pool.
async fn run_blocking<T, F>(gateway: &Arc<Gateway>, f: F) -> ApiResult<T>
where
    F: FnOnce(&Gateway) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let gateway = Arc::clone(gateway);
    tokio::task::spawn_blocking(move || f(&gateway))
        .await
        .map_err(|e| {
            ApiError(GatewayError::StorageUnavailable {
                reason: format!("gateway task failed: {}", e),
            })
        })?
}

/// Parse a path segment into a UUID-backed id such as `UserId`.
fn parse_id<T, U: FromStr>(raw: &str, wrap: fn(U) -> T) -> ApiResult<T> {
    U::from_str(raw).map(wrap).map_err(|_| {
        ApiError(GatewayError::InvalidInput {
            reason: format!("'{}' is not a valid id", raw),
        })
    })
}

// ── Request & response bodies ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub rules: usize,
    pub users: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserBody {
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Member
}

#[derive(Debug, Deserialize)]
pub struct SetCreditsRequest {
    pub credits: u64,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub command_text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub admin_view: bool,
    pub limit: Option<usize>,
}

// ── Health & auth ─────────────────────────────────────────────────────────────

pub async fn health(State(gateway): SharedGateway) -> ApiResult<Json<HealthBody>> {
    let stats = run_blocking(&gateway, |gw| Ok(gw.stats()?)).await?;
    Ok(Json(HealthBody { status: "ok", rules: stats.rules, users: stats.users }))
}

pub async fn verify(State(gateway): SharedGateway, headers: HeaderMap) -> ApiResult<Json<UserBody>> {
    let user = run_blocking(&gateway, move |gw| authenticate(gw, &headers)).await?;
    Ok(Json(UserBody { user }))
}

// ── Users ─────────────────────────────────────────────────────────────────────

pub async fn list_users(State(gateway): SharedGateway, headers: HeaderMap) -> ApiResult<Json<Vec<User>>> {
    let users = run_blocking(&gateway, move |gw| {
        let actor = authenticate(gw, &headers)?;
        Ok(gw.list_users(&actor)?)
    })
    .await?;
    Ok(Json(users))
}

pub async fn create_user(
    State(gateway): SharedGateway,
    headers: HeaderMap,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IssuedCredential>)> {
    let issued = run_blocking(&gateway, move |gw| {
        let actor = authenticate(gw, &headers)?;
        let Json(request) = body?;
        Ok(gw.create_user(&actor, &request.name, request.role)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

pub async fn set_credits(
    State(gateway): SharedGateway,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<SetCreditsRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let user = run_blocking(&gateway, move |gw| {
        let actor = authenticate(gw, &headers)?;
        let user_id = parse_id(&id, UserId)?;
        let Json(request) = body?;
        Ok(gw.set_credits(&actor, user_id, request.credits)?)
    })
    .await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(gateway): SharedGateway,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    run_blocking(&gateway, move |gw| {
        let actor = authenticate(gw, &headers)?;
        let user_id = parse_id(&id, UserId)?;
        Ok(gw.delete_user(&actor, user_id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Rules ─────────────────────────────────────────────────────────────────────

pub async fn list_rules(State(gateway): SharedGateway, headers: HeaderMap) -> ApiResult<Json<Vec<Rule>>> {
    let rules = run_blocking(&gateway, move |gw| {
        let actor = authenticate(gw, &headers)?;
        Ok(gw.list_rules(&actor)?)
    })
    .await?;
    Ok(Json(rules))
}

pub async fn create_rule(
    State(gateway): SharedGateway,
    headers: HeaderMap,
    body: Result<Json<NewRule>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Rule>)> {
    let rule = run_blocking(&gateway, move |gw| {
        let actor = authenticate(gw, &headers)?;
        let Json(rule) = body?;
        Ok(gw.create_rule(&actor, rule)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn update_rule(
    State(gateway): SharedGateway,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<RulePatch>, JsonRejection>,
) -> ApiResult<Json<Rule>> {
    let rule = run_blocking(&gateway, move |gw| {
        let actor = authenticate(gw, &headers)?;
        let rule_id = parse_id(&id, RuleId)?;
        let Json(patch) = body?;
        Ok(gw.update_rule(&actor, rule_id, patch)?)
    })
    .await?;
    Ok(Json(rule))
}

pub async fn delete_rule(
    State(gateway): SharedGateway,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    run_blocking(&gateway, move |gw| {
        let actor = authenticate(gw, &headers)?;
        let rule_id = parse_id(&id, RuleId)?;
        Ok(gw.delete_rule(&actor, rule_id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// `INSUFFICIENT_CREDITS` is answered with 402 and the usual outcome body.
pub async fn execute(
    State(gateway): SharedGateway,
    headers: HeaderMap,
    body: Result<Json<ExecuteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let outcome = run_blocking(&gateway, move |gw| {
        let actor = authenticate(gw, &headers)?;
        let Json(request) = body?;
        Ok(gw.execute(&actor, &request.command_text)?)
    })
    .await?;

    let status = match outcome.status {
        ExecutionStatus::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

pub async fn history(
    State(gateway): SharedGateway,
    headers: HeaderMap,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<Json<Vec<CommandEvent>>> {
    let events = run_blocking(&gateway, move |gw| {
        let actor = authenticate(gw, &headers)?;
        let Query(params) = params?;
        Ok(gw.history(&actor, params.admin_view, params.limit)?)
    })
    .await?;
    Ok(Json(events))
}
