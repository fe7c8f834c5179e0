#![allow(clippy::result_large_err)]
//! # Voyage Core
//!
//! Client-side session and data-orchestration layer of the Voyage travel
//! booking front end.
//!
//! ## Architecture
//!
//! - **Session**: process-wide token and identity, persisted across restarts
//! - **Aggregate**: concurrent dashboard fetches with per-endpoint fallback
//! - **Gate**: deferred-action authentication gate for protected actions
//! - **API**: REST client for the package, agent, admin, booking and auth services
//! - **Dashboard**: customer, agent and admin snapshot loaders
//! - **Telemetry**: structured logging with redaction, metric names

pub mod aggregate;
pub mod api;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod gate;
pub mod session;
pub mod telemetry;

pub use client::VoyageClient;
pub use error::{ErrorCode, ErrorContext, ErrorDetails, ErrorSeverity, Result, VoyageError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::aggregate::{
        AggregateEntry, AggregateResult, Aggregator, EndpointDescriptor, FailureReporter,
        PendingAggregate, TracingReporter, ViewScope,
    };
    pub use crate::api::{AdminApi, AgentApi, ApiClient, AuthApi, BookingsApi, PackagesApi};
    pub use crate::client::VoyageClient;
    pub use crate::config::VoyageConfig;
    pub use crate::dashboard::{AdminDashboard, AgentDashboard, CustomerDashboard, DashboardLoader};
    pub use crate::error::{ErrorCode, ErrorContext, ErrorDetails, ErrorSeverity, Result, VoyageError};
    pub use crate::gate::{
        ActionIntent, ActionKind, ActionReceipt, AuthGate, AuthOutcome, GateOutcome, GateSignal,
        GateState, IntentToken, ProtectedAction, RestoreOutcome,
    };
    pub use crate::session::{
        FileStorage, MemoryStorage, Role, Session, SessionStorage, SessionStore, UserIdentity,
    };
}
