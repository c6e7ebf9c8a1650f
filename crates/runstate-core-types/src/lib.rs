//! Core types shared across runstate facilities
//!
//! This crate provides the canonical schema constants used by both the
//! error and logging facilities, so every backend emits the same field
//! keys and event names.

pub mod schema;
