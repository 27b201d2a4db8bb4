//! Language model backends.
//!
//! A backend is a [`client::ModelClient`] pairing a wire-shape adapter
//! ([`adapter::ChatAdapter`] or [`adapter::TextAdapter`]) with an HTTP
//! transport. Jobs look backends up by name in the [`registry::BackendRegistry`].

pub mod adapter;
pub mod client;
pub mod registry;

pub use client::{Completion, LanguageModel};
pub use registry::BackendRegistry;
