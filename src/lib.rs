//! upwingo-bot: streaming client and trading bot for Upwingo binary options
//!
//! This library provides the core components for:
//! - Live candle streaming over SocketCluster with per-channel watchers
//! - Idle detection, disconnect teardown and reconnection
//! - A rolling candle window and trend reversal decision rule
//! - Order submission through the Upwingo REST API or a paper backend
//! - Structured logging and Prometheus metrics

pub mod api;
pub mod bot;
pub mod candle;
pub mod cli;
pub mod config;
pub mod execution;
pub mod orchestrator;
pub mod telemetry;
pub mod ticker;
pub mod ws;
