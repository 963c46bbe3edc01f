//! Shared dashboard service layer for floodcat.
//!
//! Both front ends drive a [`DashboardSession`]: it owns the run registry,
//! submits runs, owns one poller per pending run, applies poll results
//! through the registry reducer, and loads the selected run's overlay.
//! [`LayerState`] and [`RiskReport`] back the map and risk pages.
//! Backend requests can also be taken out as detached jobs and run on a
//! [`BackgroundTask`], so a UI thread never waits on the network.

pub mod config_service;
pub mod error;
pub mod layers;
pub mod poll;
pub mod risk;
pub mod session;
pub mod submit;
pub mod task;

pub use config_service::load_config;
pub use error::{AppError, AppResult};
pub use layers::{LayerState, WmsRequest};
pub use poll::{PollEvent, PollHandle, PollPolicy, spawn_poll};
pub use risk::{RiskLevel, RiskQuery, RiskReport};
pub use session::{DashboardSession, SelectOutcome, SelectStart};
pub use submit::{PropertyFile, RunParams, ValidatedRun};
pub use task::{BackgroundTask, TaskState};
