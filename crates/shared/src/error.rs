use thiserror::Error;

/// Errors from talking to the host game's object model.
///
/// None of these are fatal. Per-candidate errors are folded into that
/// candidate's classification or augmentation outcome, and an unavailable
/// provider just means there's nothing to scan right now.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// A candidate's attribute couldn't be read, either because the host
    /// doesn't expose it or because the read itself failed.
    #[error("{attribute} is unavailable: {reason}")]
    AttributeUnavailable {
        /// The name of the attribute, as the host calls it.
        attribute: &'static str,
        /// Why the read failed.
        reason: String,
    },

    /// The host refused to attach an interaction.
    #[error("couldn't attach interaction: {0}")]
    AttachFailed(String),

    /// There's no active session to enumerate, for example during a load.
    #[error("world state is unavailable")]
    ProviderUnavailable,
}

impl ProbeError {
    /// Shorthand for [ProbeError::AttributeUnavailable].
    pub fn unavailable(attribute: &'static str, reason: impl Into<String>) -> Self {
        ProbeError::AttributeUnavailable {
            attribute,
            reason: reason.into(),
        }
    }
}
