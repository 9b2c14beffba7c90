//! Kazwab Admission - Rate Limiting for the Kazwab Content API
//!
//! This crate implements the admission-control layer of the Kazwab content
//! API. It tracks per-client request counts within rolling time windows and
//! decides admit/reject for each inbound request, with a configurable policy
//! per route class and an allowlist for exempt callers. Counter state is
//! memory-resident; a periodic sweep bounds growth from abandoned clients.

pub mod admission;
pub mod config;
pub mod error;
pub mod http;
