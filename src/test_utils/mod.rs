//! Test utilities shared by unit and HTTP-level tests.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - An in-memory payment store standing in for Postgres
//! - Scriptable gateway and scheduler doubles
//! - Builders wiring use cases and `AppState` from those doubles

mod app_state_builder;
mod factories;
mod payment_mocks;

pub use app_state_builder::*;
pub use factories::*;
pub use payment_mocks::*;
