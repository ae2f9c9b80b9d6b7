//! # refuge-backend
//!
//! Client surface of the hosted backend platform the Refuge app delegates
//! persistence and realtime delivery to.
//!
//! The surface is a set of async store traits ([`ChatStore`],
//! [`ProfileStore`], [`RescueStore`]) plus a [`Realtime`] subscription
//! handle, unified behind the [`Backend`] trait object. [`MemoryBackend`]
//! implements all of them in-process and is what tests and local development
//! run against; the hosted platform itself is an external collaborator.

pub mod api;
pub mod config;
pub mod memory;
pub mod models;
pub mod realtime;

mod error;

pub use api::{Backend, ChatStore, ProfileStore, RescueStore};
pub use config::BackendConfig;
pub use error::BackendError;
pub use memory::MemoryBackend;
pub use models::*;
pub use realtime::{ChangeEvent, ChangeKind, ChannelScope, Realtime, Subscription};
