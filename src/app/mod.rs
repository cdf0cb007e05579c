//! Engine core — link rules, zero device I/O.
//!
//! This module holds the NCI link engine: the [`service::HalService`]
//! state machine, the commands it accepts, the events it emits and the
//! queue that serializes them. All interaction with the controller, the
//! clock and the stack above happens through **port traits** defined in
//! [`ports`] and [`crate::link::transport`], keeping this layer fully
//! testable with scripted mocks.

pub mod commands;
pub mod events;
pub mod ports;
pub mod queue;
pub mod service;
