//! Test helper modules for integration tests
#![allow(dead_code)]

pub mod harness;

pub use harness::*;
