//! Lead capture form model.
//!
//! [`LeadForm`] holds the field values of the contact form independent of
//! any rendering. [`LeadForm::validate`] applies the form's rules in order
//! and either yields the [`LeadPayload`] sent to the lead webhook or a
//! [`FormError`] whose message is shown to the user as-is.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;

/// Dialing code preselected for phone methods.
pub const DEFAULT_DIAL_CODE: &str = "+91";
/// Dialing code whose numbers must have exactly ten digits.
const INDIA_DIAL_CODE: &str = "+91";
/// `source` tag written into every payload unless configured otherwise.
pub const DEFAULT_SOURCE: &str = "portfolio-site";

/// A phone-based contact method (call or WhatsApp).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneContact {
    pub dial_code: String,
    pub number: String,
}

impl PhoneContact {
    pub fn new(dial_code: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            dial_code: dial_code.into(),
            number: number.into(),
        }
    }

    pub fn digits(&self) -> String {
        digits_only(&self.number)
    }

    /// `"<code> <digits>"`, trimmed.
    fn formatted(&self) -> String {
        format!("{} {}", self.dial_code.trim(), self.digits())
            .trim()
            .to_string()
    }
}

/// Contact form field values. `None` for a contact method means the
/// method's checkbox is off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadForm {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub service: String,
    pub message: String,
    pub email: Option<String>,
    pub call: Option<PhoneContact>,
    pub whatsapp: Option<PhoneContact>,
}

/// A validation failure with its user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    NoContactMethod,
    MissingEmail,
    InvalidEmail,
    MissingPhone,
    MissingWhatsApp,
    PhoneDigits,
    WhatsAppDigits,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FormError::NoContactMethod => "Please select at least one contact method.",
            FormError::MissingEmail => "Please enter your email address.",
            FormError::InvalidEmail => "Please enter a valid email address.",
            FormError::MissingPhone => "Please enter your phone number.",
            FormError::MissingWhatsApp => "Please enter your WhatsApp number.",
            FormError::PhoneDigits => "Phone number must be 10 digits for India.",
            FormError::WhatsAppDigits => "WhatsApp must be 10 digits for India.",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for FormError {}

/// Preferred contact channels as sent to the webhook; empty string when a
/// method is off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactPref {
    pub email: String,
    pub call: String,
    pub whatsapp: String,
}

/// The JSON body forwarded to the lead webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadPayload {
    pub name: String,
    /// Kept for the sheet's column layout; the address lives in
    /// `contact_pref.email`.
    pub email: String,
    pub company: String,
    pub service: String,
    pub message: String,
    pub contact_pref: ContactPref,
    pub source: String,
    /// RFC 3339 UTC with milliseconds.
    pub timestamp: String,
}

/// Keep ASCII digits only.
pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

impl LeadForm {
    /// Validate the form and build the webhook payload.
    ///
    /// Rules, first failure wins: at least one contact method; each enabled
    /// method has a value; email contains `@`; `+91` numbers have exactly
    /// ten digits.
    pub fn validate(&self, source: &str) -> Result<LeadPayload, FormError> {
        if self.email.is_none() && self.call.is_none() && self.whatsapp.is_none() {
            return Err(FormError::NoContactMethod);
        }

        let email = match &self.email {
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(FormError::MissingEmail);
                }
                if !is_plausible_email(trimmed) {
                    return Err(FormError::InvalidEmail);
                }
                trimmed.to_string()
            }
            None => String::new(),
        };

        let call = match &self.call {
            Some(phone) => {
                check_phone(phone, FormError::MissingPhone, FormError::PhoneDigits)?;
                phone.formatted()
            }
            None => String::new(),
        };

        let whatsapp = match &self.whatsapp {
            Some(phone) => {
                check_phone(phone, FormError::MissingWhatsApp, FormError::WhatsAppDigits)?;
                phone.formatted()
            }
            None => String::new(),
        };

        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string();

        Ok(LeadPayload {
            name,
            email: String::new(),
            company: self.company.trim().to_string(),
            service: self.service.trim().to_string(),
            message: self.message.trim().to_string(),
            contact_pref: ContactPref {
                email,
                call,
                whatsapp,
            },
            source: source.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

fn check_phone(phone: &PhoneContact, missing: FormError, digits: FormError) -> Result<(), FormError> {
    let count = phone.digits().len();
    if count == 0 {
        return Err(missing);
    }
    if phone.dial_code.trim() == INDIA_DIAL_CODE && count != 10 {
        return Err(digits);
    }
    Ok(())
}

fn is_plausible_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !s.contains(' '),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> LeadForm {
        LeadForm {
            first_name: "  Asha ".to_string(),
            last_name: "Rao".to_string(),
            company: "Acme".to_string(),
            service: "Meta Ads".to_string(),
            message: "Need help scaling.".to_string(),
            ..LeadForm::default()
        }
    }

    #[test]
    fn test_requires_a_contact_method() {
        let err = base().validate(DEFAULT_SOURCE).unwrap_err();
        assert_eq!(err, FormError::NoContactMethod);
        assert_eq!(err.to_string(), "Please select at least one contact method.");
    }

    #[test]
    fn test_email_payload() {
        let mut form = base();
        form.email = Some(" asha@example.com ".to_string());
        let payload = form.validate(DEFAULT_SOURCE).unwrap();
        assert_eq!(payload.name, "Asha Rao");
        assert_eq!(payload.email, "");
        assert_eq!(payload.contact_pref.email, "asha@example.com");
        assert_eq!(payload.contact_pref.call, "");
        assert_eq!(payload.source, "portfolio-site");
        assert!(payload.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_email_checks() {
        let mut form = base();
        form.email = Some("   ".to_string());
        assert_eq!(form.validate(DEFAULT_SOURCE).unwrap_err(), FormError::MissingEmail);
        form.email = Some("asha.example.com".to_string());
        assert_eq!(form.validate(DEFAULT_SOURCE).unwrap_err(), FormError::InvalidEmail);
    }

    #[test]
    fn test_india_numbers_need_ten_digits() {
        let mut form = base();
        form.call = Some(PhoneContact::new("+91", "98765 4321"));
        assert_eq!(form.validate(DEFAULT_SOURCE).unwrap_err(), FormError::PhoneDigits);

        form.call = Some(PhoneContact::new("+91", "98765-43210"));
        form.whatsapp = Some(PhoneContact::new("+91", "12345"));
        let err = form.validate(DEFAULT_SOURCE).unwrap_err();
        assert_eq!(err.to_string(), "WhatsApp must be 10 digits for India.");
    }

    #[test]
    fn test_other_codes_accept_any_length() {
        let mut form = base();
        form.call = Some(PhoneContact::new("+1", "(415) 555-01"));
        let payload = form.validate("landing").unwrap();
        assert_eq!(payload.contact_pref.call, "+1 41555501");
        assert_eq!(payload.source, "landing");
    }

    #[test]
    fn test_phone_formatting() {
        let mut form = base();
        form.whatsapp = Some(PhoneContact::new("+91", "98765 43210"));
        let payload = form.validate(DEFAULT_SOURCE).unwrap();
        assert_eq!(payload.contact_pref.whatsapp, "+91 9876543210");
    }

    #[test]
    fn test_missing_phone_value() {
        let mut form = base();
        form.call = Some(PhoneContact::new("+44", "  "));
        assert_eq!(form.validate(DEFAULT_SOURCE).unwrap_err(), FormError::MissingPhone);
    }

    #[test]
    fn test_payload_json_shape() {
        let mut form = base();
        form.email = Some("a@b.co".to_string());
        let json = serde_json::to_value(form.validate(DEFAULT_SOURCE).unwrap()).unwrap();
        for key in ["name", "email", "company", "service", "message", "source", "timestamp"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["contact_pref"]["email"], "a@b.co");
    }
}
