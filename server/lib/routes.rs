//! HTTP endpoints.
//!
//! Every solve runs on the blocking thread pool; handlers only move requests
//! and responses across it and log the outcome.

use std::{ sync::Arc, time::Instant };
use axum::{
    extract::State,
    routing::{ get, post },
    Json,
    Router,
};
use serde::Serialize;
use tdse::{
    api::{
        self,
        ObservableRequest,
        ObservableResponse,
        SolveResult,
        TimeDep1DRequest,
        TimeDep1DResponse,
        TimeDep2DRequest,
        TimeDep2DResponse,
        TimeIndep1DRequest,
        TimeIndep1DResponse,
        TimeIndep2DRequest,
        TimeIndep2DResponse,
    },
    limits::Limits,
};
use crate::error::ApiError;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// State shared by all handlers.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub limits: Arc<Limits>,
}

impl AppState {
    pub fn new(limits: Limits) -> Self { Self { limits: Arc::new(limits) } }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/solve/1d/timedependent", post(timedep_1d))
        .route("/solve/2d/timedependent", post(timedep_2d))
        .route("/solve/1d/timeindependent", post(timeindep_1d))
        .route("/solve/2d/timeindependent", post(timeindep_2d))
        .route("/observable/eval", post(observable))
        .with_state(state)
}

#[derive(Serialize)]
pub struct Banner {
    message: &'static str,
}

pub async fn index() -> Json<Banner> {
    Json(Banner { message: "Grid Schrödinger solver. POST requests to /solve/{1d,2d}/{timedependent,timeindependent} or /observable/eval." })
}

async fn run<Req, Res, F>(
    endpoint: &'static str,
    summary: String,
    state: AppState,
    req: Req,
    solve: F,
) -> ApiResult<Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
    F: FnOnce(&Req, &Limits) -> SolveResult<Res> + Send + 'static,
{
    let start = Instant::now();
    let limits = Arc::clone(&state.limits);
    match tokio::task::spawn_blocking(move || solve(&req, &limits)).await {
        Ok(Ok(res)) => {
            log::info!("{endpoint}: {summary} in {:.3?}", start.elapsed());
            Ok(Json(res))
        },
        Ok(Err(err)) => {
            log::warn!("{endpoint}: {summary} failed after {:.3?}: {err}", start.elapsed());
            Err(err.into())
        },
        Err(err) => {
            log::warn!("{endpoint}: {summary} panicked or was cancelled: {err}");
            Err(err.into())
        },
    }
}

pub async fn timedep_1d(
    State(state): State<AppState>,
    Json(req): Json<TimeDep1DRequest>,
) -> ApiResult<TimeDep1DResponse> {
    let summary = format!("{} points, {} times", req.num_points, req.times.len());
    run("/solve/1d/timedependent", summary, state, req, api::solve_timedep_1d).await
}

pub async fn timedep_2d(
    State(state): State<AppState>,
    Json(req): Json<TimeDep2DRequest>,
) -> ApiResult<TimeDep2DResponse> {
    let summary
        = format!("{}x{} points, {} times", req.num_x, req.num_y, req.times.len());
    run("/solve/2d/timedependent", summary, state, req, api::solve_timedep_2d).await
}

pub async fn timeindep_1d(
    State(state): State<AppState>,
    Json(req): Json<TimeIndep1DRequest>,
) -> ApiResult<TimeIndep1DResponse> {
    let summary = format!("{} points, {} states", req.num_points, req.num_eigen);
    run("/solve/1d/timeindependent", summary, state, req, api::solve_timeindep_1d).await
}

pub async fn timeindep_2d(
    State(state): State<AppState>,
    Json(req): Json<TimeIndep2DRequest>,
) -> ApiResult<TimeIndep2DResponse> {
    let summary
        = format!("{}x{} points, {} states", req.num_x, req.num_y, req.num_eigen);
    run("/solve/2d/timeindependent", summary, state, req, api::solve_timeindep_2d).await
}

pub async fn observable(
    State(state): State<AppState>,
    Json(req): Json<ObservableRequest>,
) -> ApiResult<ObservableResponse> {
    let summary = format!("expr '{}'", req.expr);
    run("/observable/eval", summary, state, req, api::eval_observable).await
}
