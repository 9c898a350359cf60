//! Core value types of the completion algebra.
//!
//! - [`completion`]: the three completion channels and a captured completion
//! - [`signature`]: completion signatures and their set algebra

pub mod completion;
pub mod signature;

pub use completion::{Channel, Completion};
pub use signature::{resolve_signatures, CompletionSignatures, Signature, Signatures};
