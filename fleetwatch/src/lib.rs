//! fleetwatch: terminal dashboard for a fleet of monitored clients.
//!
//! The library holds everything that does not need a terminal: wire types,
//! the snapshot reconciler, the screenshot workflow, the HTTP client and the
//! demo fleet. The binary wires them to crossterm/ratatui.

pub mod api;
pub mod app;
pub mod card;
pub mod demo;
pub mod format;
pub mod intent;
pub mod logging;
pub mod profiles;
pub mod reconcile;
pub mod screenshot;
pub mod toast;
pub mod types;
pub mod ui;
