//! Itinerary, stop, follow, and booking records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::ModelError;

/// Maximum length of a booking requester's name.
pub const MAX_BOOKING_NAME_LENGTH: usize = 120;

/// A named, ordered tour through several sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    /// Database primary key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
}

/// One stop of an itinerary. `order` is unique within an itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    /// Database primary key.
    pub id: i64,
    /// Owning itinerary.
    pub itinerary_id: i64,
    /// Visited site.
    pub site_id: i64,
    /// Position in the traversal sequence.
    pub order: u32,
}

/// A user's marker of interest in an itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowRecord {
    /// The following user.
    pub user: String,
    /// The followed itinerary.
    pub itinerary_id: i64,
    /// When the follow was recorded.
    pub created_at: DateTime<Utc>,
}

/// Outcome of toggling a follow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FollowStatus {
    /// The record was created.
    Added,
    /// The record already existed and was deleted.
    Removed,
}

/// A validation failure on a single form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as submitted by the client.
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Creates a field error.
    #[must_use]
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub(crate) fn describe_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A booking request that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    /// Booked itinerary.
    pub itinerary_id: i64,
    /// Requester name.
    pub name: String,
    /// Requester email.
    pub email: String,
    /// Requested visit date.
    pub date: NaiveDate,
    /// Number of people in the party.
    pub party_size: u32,
    /// Free-text notes.
    pub note: String,
}

impl NewBooking {
    /// Validates the request against the date it is being made on.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidBooking`] listing every failing field:
    /// blank or overlong name, malformed email, a date that is not strictly
    /// after `today`, or an empty party.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ModelError> {
        let mut errors = Vec::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push(FieldError::new("nome", "This field is required."));
        } else if name.chars().count() > MAX_BOOKING_NAME_LENGTH {
            errors.push(FieldError::new(
                "nome",
                format!("Ensure this value has at most {MAX_BOOKING_NAME_LENGTH} characters."),
            ));
        }

        if !is_valid_email(&self.email) {
            errors.push(FieldError::new("email", "Enter a valid email address."));
        }

        if self.date <= today {
            errors.push(FieldError::new("data", "La data deve essere nel futuro."));
        }

        if self.party_size < 1 {
            errors.push(FieldError::new(
                "numero_persone",
                "Ensure this value is greater than or equal to 1.",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ModelError::InvalidBooking(errors))
        }
    }
}

/// A stored booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Database primary key.
    pub id: i64,
    /// Booked itinerary.
    pub itinerary_id: i64,
    /// Requester name.
    pub name: String,
    /// Requester email.
    pub email: String,
    /// Requested visit date.
    pub date: NaiveDate,
    /// Number of people in the party.
    pub party_size: u32,
    /// Free-text notes.
    pub note: String,
    /// When the booking was stored.
    pub created_at: DateTime<Utc>,
}

/// Syntactic email check: one `@`, a non-empty local part, and a dotted
/// domain without empty labels. No whitespace anywhere.
fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(date: NaiveDate) -> NewBooking {
        NewBooking {
            itinerary_id: 1,
            name: "Giulia Rossi".to_string(),
            email: "giulia@example.it".to_string(),
            date,
            party_size: 2,
            note: String::new(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn accepts_future_booking() {
        let b = booking(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        assert!(b.validate(today()).is_ok());
    }

    #[test]
    fn rejects_today_and_past() {
        for date in [today(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()] {
            let Err(ModelError::InvalidBooking(errors)) = booking(date).validate(today()) else {
                panic!("expected invalid booking for {date}");
            };
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field, "data");
        }
    }

    #[test]
    fn collects_every_failing_field() {
        let mut b = booking(today());
        b.name = "   ".to_string();
        b.email = "not-an-email".to_string();
        b.party_size = 0;
        let Err(ModelError::InvalidBooking(errors)) = b.validate(today()) else {
            panic!("expected invalid booking");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["nome", "email", "data", "numero_persone"]);
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.it"));
        assert!(is_valid_email(" mario.rossi@comune.roma.it "));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.it"));
        assert!(!is_valid_email("a@@b.it"));
        assert!(!is_valid_email("a b@c.it"));
        assert!(!is_valid_email("a@b..it"));
    }

    #[test]
    fn follow_status_wire_format() {
        assert_eq!(FollowStatus::Added.to_string(), "added");
        assert_eq!(
            serde_json::to_string(&FollowStatus::Removed).unwrap(),
            "\"removed\""
        );
    }
}
