//! Aggsource Core — unit of work and event-replaying repository.
//!
//! This crate rebuilds aggregate roots by replaying their append-only event
//! streams, tracks every root touched during one business operation in a
//! [`unit_of_work::UnitOfWork`], and reports precisely when a stream is
//! missing or deleted. It contains no infrastructure code; store
//! connections live in `aggsource-event-store`.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod event;
pub mod optional;
pub mod reader;
pub mod repository;
pub mod store;
pub mod unit_of_work;
