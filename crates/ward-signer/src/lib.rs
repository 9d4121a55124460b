//! Signing Engine for Ward.
//!
//! Wraps an application message in the host contract's double
//! envelope, builds the amino sign document, and signs it with the key
//! the custodian hands out for that one call.
//!
//! # Modules
//!
//! - [`sign_doc`]: amino sign documents and their canonical bytes
//! - [`wrap`]: inner and outer contract envelopes
//! - [`engine`]: the [`SigningEngine`] and its request types

pub mod engine;
pub mod sign_doc;
pub mod wrap;

pub use engine::{AminoRequest, DirectRequest, DirectSignDoc, SignDelegate, SignRequest, SigningEngine};
pub use sign_doc::{AminoSignResponse, PubKeyJson, StdFee, StdSignDoc, StdSignature};
pub use wrap::{unwrap_body_proxy, MsgExecuteContract, WrappedMessage};
