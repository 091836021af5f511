//! Account identifier strategy: drivers sign up and log in with an email
//! address or a bare phone number. The identity provider only knows emails,
//! so phone identifiers map to a synthetic address on a reserved domain.

/// Reserved domain for phone-derived account emails.
pub const SYNTHETIC_PHONE_DOMAIN: &str = "phone.autodir.app";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Email(String),
    Phone(String),
}

impl Identifier {
    /// Picks the identifier from the submitted fields; email wins when both
    /// are present. Returns `None` when neither field carries a value.
    pub fn from_input(email: Option<&str>, phone: Option<&str>) -> Option<Identifier> {
        if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
            return Some(Identifier::Email(email.trim().to_string()));
        }
        phone
            .filter(|p| !p.trim().is_empty())
            .map(|p| Identifier::Phone(p.trim().to_string()))
    }

    /// The email the identity provider sees for this identifier.
    pub fn account_email(&self) -> String {
        match self {
            Identifier::Email(email) => email.clone(),
            Identifier::Phone(phone) => synthetic_email(phone),
        }
    }

    pub fn is_phone(&self) -> bool {
        matches!(self, Identifier::Phone(_))
    }
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit())
}

pub fn synthetic_email(phone: &str) -> String {
    format!("{phone}@{SYNTHETIC_PHONE_DOMAIN}")
}
