//! Concrete [`ClientWrapper`](crate::client_wrapper::ClientWrapper) implementations.
//!
//! Each submodule offers a client that speaks a particular vendor's API while conforming to
//! the uniform transport contract consumed by the request scheduler.

pub mod common;

pub mod openai;
