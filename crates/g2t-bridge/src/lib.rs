//! goe2tesla bridge library.
//!
//! Re-exports all modules so external crates (e.g. `g2t-e2e-tests`) can
//! drive the controller, watcher, and scheduler directly.

pub mod config;
pub mod controller;
pub mod gate;
pub mod mqtt_loop;
pub mod notifier;
pub mod scheduler;
pub mod shutdown;
pub mod watcher;
