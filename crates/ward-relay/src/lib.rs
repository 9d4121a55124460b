//! Cross-Context Relay for Ward.
//!
//! Lets an unprivileged caller reach the credential store and the sign
//! prompt owned by a privileged context. Every request carries a
//! correlation id and is answered at most once, by a `<type>-result`
//! event with the same id.
//!
//! # Modules
//!
//! - [`protocol`]: wire messages and correlation ids
//! - [`background`]: the privileged dispatcher
//! - [`client`]: correlated request/response client
//! - [`popup`]: prompt surface and popup parameters
//! - [`session`]: popup-side signing

pub mod background;
pub mod client;
pub mod popup;
pub mod protocol;
pub mod session;

pub use background::{Background, RelayHub};
pub use client::RelayClient;
pub use popup::{ChannelPrompt, PopupGeometry, PopupRequest, PromptSurface};
pub use protocol::{Envelope, RelayRequest, RelayResponse, RequestId, RequestKind, SignOutcome};
pub use session::SignSession;
