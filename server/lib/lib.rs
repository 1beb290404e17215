//! JSON-over-HTTP front end for the [`tdse`] solver.
//!
//! Endpoints:
//! - `GET /`: service banner
//! - `POST /solve/1d/timedependent`, `POST /solve/2d/timedependent`
//! - `POST /solve/1d/timeindependent`, `POST /solve/2d/timeindependent`
//! - `POST /observable/eval`
//!
//! Request and response bodies are the models in [`tdse::api`]. Failures are
//! returned as `{"detail": "..."}` with status 422 when caused by the request
//! and 500 otherwise.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
