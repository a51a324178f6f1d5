//! # Mayfly Errors
//!
//! Error handling for the Mayfly ephemeral provisioning system.
//!
//! One enum per concern, named fields throughout. Provisioning errors are
//! fatal to the run and never retried here; retry policy belongs to the
//! surrounding test harness.

use serde::Serialize;
use thiserror::Error;

/// Provisioner errors: the runtime could not create or ready a resource
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Failed to start {image}: {reason}")]
    StartFailed { image: String, reason: String },

    #[error("Resource {image} did not become ready within {waited_ms}ms")]
    Timeout { image: String, waited_ms: u64 },

    #[error("Invalid resource spec: {reason}")]
    InvalidSpec { reason: String },

    #[error("Container runtime error: {reason}")]
    Runtime { reason: String }
}

/// Ordering error: connection facts or a bound accessor were consulted
/// before the resource reported ready. Always a bug in the caller, never
/// an expected runtime condition.
#[derive(Debug, Clone, Error, Serialize)]
#[error("Resource {resource} is not ready (state: {state})")]
pub struct NotReadyError {
    pub resource: String,
    pub state: String
}

/// Dynamic configuration binding errors
#[derive(Debug, Error)]
pub enum BindError {
    #[error("No override registered for key: {key}")]
    MissingKey { key: String },

    #[error("Override already registered for key: {key}")]
    DuplicateKey { key: String },

    #[error(transparent)]
    NotReady(#[from] NotReadyError)
}

/// Lifecycle state machine errors
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Invalid lifecycle transition: {from} to {to}")]
    InvalidTransition { from: String, to: String }
}

/// Readiness probe errors
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Probe connection failed: {reason}")]
    Io { reason: String },

    #[error("Probe query failed: {reason}")]
    Sql { reason: String },

    #[error("Probe attempts exhausted after {attempts} tries")]
    Exhausted { attempts: u32 }
}
