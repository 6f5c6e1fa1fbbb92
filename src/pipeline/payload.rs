// SPDX-License-Identifier: MPL-2.0

//! Decoded payload classification
//!
//! QR payloads carry recognizable prefixes for URLs, WiFi credentials,
//! contact cards and the like. Classification only inspects the shape of
//! the content; nothing here validates or parses the payload fields.

/// Content category of one decoded payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// http/https URL
    Url,
    /// WiFi credentials (WIFI:...)
    Wifi,
    /// Phone number (tel: URI)
    Phone,
    /// Email (mailto: URI)
    Email,
    /// SMS (sms:/smsto: URI)
    Sms,
    /// Geographic location (geo: URI)
    Location,
    /// vCard contact
    Contact,
    /// Calendar event (VCALENDAR/VEVENT)
    Event,
    /// Anything else
    Text,
}

impl PayloadKind {
    /// Classify one decoded payload by its leading marker
    pub fn classify(content: &str) -> Self {
        let trimmed = content.trim();

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url
        } else if trimmed.starts_with("WIFI:") {
            Self::Wifi
        } else if trimmed.starts_with("tel:") {
            Self::Phone
        } else if trimmed.starts_with("mailto:") {
            Self::Email
        } else if trimmed.starts_with("sms:") || trimmed.starts_with("smsto:") {
            Self::Sms
        } else if trimmed.starts_with("geo:") {
            Self::Location
        } else if trimmed.starts_with("BEGIN:VCARD") {
            Self::Contact
        } else if trimmed.starts_with("BEGIN:VCALENDAR") || trimmed.starts_with("BEGIN:VEVENT") {
            Self::Event
        } else {
            Self::Text
        }
    }

    /// Short label used in logs and notification summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::Url => "Link",
            Self::Wifi => "WiFi network",
            Self::Phone => "Phone number",
            Self::Email => "Email",
            Self::Sms => "SMS",
            Self::Location => "Location",
            Self::Contact => "Contact",
            Self::Event => "Event",
            Self::Text => "Text",
        }
    }
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
