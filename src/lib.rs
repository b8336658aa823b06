//! Chat-scoped link shortener
//!
//! Resolves short paths to target URLs and creates new links, optionally
//! scoped to a messaging chat. The library exposes every component so the
//! binary and the integration tests share one implementation.

pub mod chat;
pub mod codec;
pub mod config;
pub mod creation;
pub mod database;
pub mod enrichment;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod repository;
pub mod route;
