//! Sign prompt surface.
//!
//! The background never signs. It encodes the request as a query
//! string and asks a [`PromptSurface`] to show it in a focused popup;
//! the popup runs a [`SignSession`](crate::SignSession) from that query.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use ward_types::config::RelayConfig;
use ward_types::{Address, Result, SignMode, WardError};

use crate::protocol::RequestId;

/// Parameters passed to the popup. All are required.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PopupRequest {
    /// Sign document as JSON text.
    pub tx: String,
    #[serde(rename = "signMode")]
    pub sign_mode: SignMode,
    /// Signer address.
    pub who: Address,
    /// Id of the originating `sign` request.
    pub rid: RequestId,
}

impl PopupRequest {
    /// Encodes the request as a URL query string.
    pub fn to_query(&self) -> Result<String> {
        serde_urlencoded::to_string(self).map_err(|e| WardError::ProtocolError {
            reason: format!("failed to encode popup query: {e}"),
        })
    }

    /// Decodes a URL query string.
    ///
    /// # Errors
    ///
    /// [`WardError::ProtocolError`] when a parameter is missing or
    /// malformed.
    pub fn from_query(query: &str) -> Result<Self> {
        serde_urlencoded::from_str(query.trim_start_matches('?')).map_err(|e| {
            WardError::ProtocolError {
                reason: format!("malformed popup query: {e}"),
            }
        })
    }
}

/// Window placement of the popup.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PopupGeometry {
    pub width: u32,
    pub height: u32,
    pub focused: bool,
}

impl From<&RelayConfig> for PopupGeometry {
    fn from(config: &RelayConfig) -> Self {
        Self {
            width: config.popup_width,
            height: config.popup_height,
            focused: true,
        }
    }
}

/// Somewhere a sign prompt can be shown.
#[async_trait]
pub trait PromptSurface: Send + Sync {
    /// Shows the prompt. Returns once it is open, not when it completes.
    async fn open(&self, popup: PopupRequest, geometry: PopupGeometry) -> Result<()>;
}

/// [`PromptSurface`] that hands each popup to a channel consumer.
pub struct ChannelPrompt {
    tx: mpsc::Sender<(PopupRequest, PopupGeometry)>,
}

impl ChannelPrompt {
    /// Creates the surface and the receiving end for the popup driver.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<(PopupRequest, PopupGeometry)>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl PromptSurface for ChannelPrompt {
    async fn open(&self, popup: PopupRequest, geometry: PopupGeometry) -> Result<()> {
        self.tx
            .send((popup, geometry))
            .await
            .map_err(|_| WardError::RelayError {
                reason: "no prompt surface is listening".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn popup() -> std::result::Result<PopupRequest, WardError> {
        Ok(PopupRequest {
            tx: r#"{"chain_id":"foo-1","memo":"a&b=c"}"#.into(),
            sign_mode: SignMode::Amino,
            who: Address::parse("cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4")?,
            rid: RequestId(12),
        })
    }

    #[test]
    fn query_roundtrip_preserves_json() -> std::result::Result<(), WardError> {
        let popup = popup()?;
        let query = popup.to_query()?;
        assert!(query.contains("signMode=amino"));
        assert!(query.contains("rid=12"));
        assert_eq!(PopupRequest::from_query(&format!("?{query}"))?, popup);
        Ok(())
    }

    #[test]
    fn missing_parameter_rejected() {
        let result = PopupRequest::from_query("tx=%7B%7D&signMode=amino&rid=1");
        assert!(matches!(result, Err(WardError::ProtocolError { .. })));
    }

    #[test]
    fn default_geometry_is_focused_portrait() {
        let geometry = PopupGeometry::from(&RelayConfig::default());
        assert_eq!((geometry.width, geometry.height), (400, 600));
        assert!(geometry.focused);
    }

    #[tokio::test]
    async fn channel_prompt_forwards() -> std::result::Result<(), WardError> {
        let (surface, mut rx) = ChannelPrompt::new(1);
        surface.open(popup()?, PopupGeometry::from(&RelayConfig::default())).await?;
        let (received, _) = rx.recv().await.ok_or_else(|| WardError::RelayError {
            reason: "nothing forwarded".into(),
        })?;
        assert_eq!(received.rid, RequestId(12));

        drop(rx);
        assert!(surface.open(popup()?, PopupGeometry::from(&RelayConfig::default())).await.is_err());
        Ok(())
    }
}
