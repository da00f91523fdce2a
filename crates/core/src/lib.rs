//! # Onager Core
//!
//! Domain types, traits, and error definitions for the Onager agent runtime.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the control loop talks to is defined as a trait here:
//! the completion service, the capability provider, and the memory service.
//! Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted mock collaborators
//! - Clean dependency graph (all crates depend inward on core)

pub mod capability;
pub mod completion;
pub mod error;
pub mod memory;
pub mod message;

// Re-export key types at crate root for ergonomics
pub use capability::{Capability, CapabilityOutcome, CapabilityProvider, CapabilitySpec};
pub use completion::{CompletionRequest, CompletionService};
pub use error::{Error, Result};
pub use memory::MemoryService;
pub use message::{Message, Role};
