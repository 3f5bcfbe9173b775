//! Common test utilities and fixtures for presenter-engine integration tests
//!
//! This module provides:
//! - `fixtures`: a small in-memory corpus with known Shabads, a Bani and
//!   source metadata
//! - `harness`: an in-process presenter with test clients that record every
//!   frame they are sent

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod fixtures;
pub mod harness;

pub use fixtures::corpus;
pub use harness::{TestClient, TestServer};
