//! Shared types for kafka-relay.
//!
//! This crate provides the data model that the consumer and the producer
//! crates exchange:
//!
//! - [`Message`] - an owned Kafka record together with its origin
//!   (topic, partition, offset)
//! - [`HandlerResult`] - the closed set of outcomes a message handler can report
//!
//! # Dependency Direction
//!
//! Both `kafka-relay-consumer` and `kafka-relay-producer` depend on this crate.
//! The dead-letter router lives in the producer crate and forwards [`Message`]s
//! fetched by the consumer, so the type has to live below both of them.

pub mod message;
pub mod outcome;

pub use message::Message;
pub use outcome::HandlerResult;
