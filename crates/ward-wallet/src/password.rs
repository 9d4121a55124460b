//! Scoped password handle.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// User password, wiped from memory when dropped.
///
/// Deliberately not `Clone`; `Debug` prints a placeholder.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Password(String);

impl Password {
    /// Takes ownership of `password`.
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Borrows the secret for the duration of a single operation.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` for an empty password.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let pw = Password::new("hunter2");
        assert_eq!(format!("{pw:?}"), "Password(***)");
        assert_eq!(pw.expose(), "hunter2");
    }
}
