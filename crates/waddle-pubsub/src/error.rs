//! Error types for the PubSub client.

use thiserror::Error;
use waddle_xmpp_xep_dataforms::DataFormError;

use crate::config::ConfigError;

/// PubSub client errors.
///
/// Protocol-level `<error/>` responses are not represented here: they are
/// delivered untouched to the completion callback.
#[derive(Debug, Error)]
pub enum PubSubError {
    /// The transport could not send the stanza.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A JID supplied by the caller could not be parsed.
    #[error("Invalid JID '{jid}': {reason}")]
    InvalidJid {
        /// The offending input
        jid: String,
        /// Parser message
        reason: String,
    },

    /// Configuration could not be loaded or validated.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A data form could not be read.
    #[error("Data form error: {0}")]
    DataForm(#[from] DataFormError),
}

impl PubSubError {
    /// Create a new transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new invalid JID error.
    pub fn invalid_jid(jid: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidJid {
            jid: jid.into(),
            reason: reason.to_string(),
        }
    }
}
