//! Authenticated identity.

use serde::{Deserialize, Serialize};

/// The signed-in user as reported by the auth provider.
///
/// An identity is always replaced wholesale; there is no partial update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable subject identifier (e.g. `google:1234`).
    pub id: String,
    /// Name shown in the auth bar.
    pub display_name: String,
    /// Optional avatar image URL.
    pub avatar_url: Option<String>,
    /// Optional e-mail address.
    pub email: Option<String>,
    /// Login provider that issued the identity.
    pub provider: Option<String>,
}

impl Identity {
    /// Creates an identity with only the required fields set.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
            email: None,
            provider: None,
        }
    }
}
