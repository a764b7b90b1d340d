//! Pocket Money Inference API Library
//!
//! Serves the spending-tag classifier, the credit score regressor and the
//! activity reward transformer over HTTP.
//!
//! # Modules
//!
//! - `artifacts`: Loads model artifacts into the immutable model context.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `features`: Request payload to model feature row.
//! - `handlers`: HTTP request handlers.
//! - `inference`: Prediction interface and tabular model families.
//! - `models`: Request/response and prediction types.
//! - `orchestrator`: Per-request sequencing of model calls.
//! - `preprocessing`: Fitted column transformer in front of tabular models.
//! - `reward`: BERT reward regressor.
//! - `routes`: Router and OpenAPI document.
//! - `summary`: Weekly transaction summary aggregation.

pub mod artifacts;
pub mod config;
pub mod errors;
pub mod features;
pub mod handlers;
pub mod inference;
pub mod models;
pub mod orchestrator;
pub mod preprocessing;
pub mod reward;
pub mod routes;
pub mod summary;
