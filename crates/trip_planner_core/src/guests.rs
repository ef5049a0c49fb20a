//! crates/trip_planner_core/src/guests.rs
//!
//! The list of guest e-mails collected in the guest overlay.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("e-mail pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuestError {
    #[error("Invalid e-mail: {0}")]
    InvalidEmailFormat(String),
    #[error("E-mail already added: {0}")]
    DuplicateEmail(String),
}

/// Validated, lowercase guest e-mails in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestEmailRegistry {
    emails: Vec<String>,
}

impl GuestEmailRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, email: &str) -> Result<(), GuestError> {
        let email = email.trim().to_lowercase();
        if !EMAIL_PATTERN.is_match(&email) {
            return Err(GuestError::InvalidEmailFormat(email));
        }
        if self.contains(&email) {
            return Err(GuestError::DuplicateEmail(email));
        }
        self.emails.push(email);
        Ok(())
    }

    /// Returns `false` when the e-mail was not in the list.
    pub fn remove(&mut self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        let before = self.emails.len();
        self.emails.retain(|existing| *existing != email);
        self.emails.len() != before
    }

    pub fn contains(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.emails.iter().any(|existing| *existing == email)
    }

    pub fn count(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.emails.iter().map(String::as_str)
    }

    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    /// Short summary shown on the main form while the overlay is closed.
    pub fn badge_text(&self) -> String {
        match self.emails.len() {
            0 => String::new(),
            n => format!("{n} guest(s)"),
        }
    }
}
