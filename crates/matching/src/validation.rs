//! Input rules shared by the services.
//!
//! Each function returns the cleaned value (trimmed, normalised) or a
//! [`MatchingError::Validation`] naming the offending field.

use std::collections::HashSet;

use uuid::Uuid;

use crate::MatchingError;

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_POSTAL_CODE_LEN: usize = 4;
pub const VERIFICATION_CODE_LEN: usize = 6;
pub const MIN_DESCRIPTION_LEN: usize = 20;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MIN_CONTACT_MESSAGE_LEN: usize = 10;
pub const MAX_MESSAGE_LEN: usize = 2000;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn name(field: &'static str, value: &str) -> Result<String, MatchingError> {
    let value = value.trim();
    if char_len(value) < MIN_NAME_LEN {
        return Err(MatchingError::validation(
            field,
            format!("must be at least {MIN_NAME_LEN} characters"),
        ));
    }
    Ok(value.to_owned())
}

/// `local@domain.tld`, lower-cased.
pub fn email(value: &str) -> Result<String, MatchingError> {
    let value = value.trim().to_lowercase();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !value.contains(char::is_whitespace)
                && domain
                    .rsplit_once('.')
                    .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    };
    if !valid {
        return Err(MatchingError::validation("email", "please enter a valid email address"));
    }
    Ok(value)
}

pub fn password(value: &str) -> Result<(), MatchingError> {
    if char_len(value) < MIN_PASSWORD_LEN {
        return Err(MatchingError::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

pub fn postal_code(value: &str) -> Result<String, MatchingError> {
    let value = value.trim();
    if char_len(value) < MIN_POSTAL_CODE_LEN {
        return Err(MatchingError::validation(
            "postal_code",
            format!("must be at least {MIN_POSTAL_CODE_LEN} characters"),
        ));
    }
    Ok(value.to_owned())
}

pub fn verification_code(value: &str) -> Result<String, MatchingError> {
    let value = value.trim();
    if value.len() != VERIFICATION_CODE_LEN || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MatchingError::validation(
            "code",
            format!("must be exactly {VERIFICATION_CODE_LEN} digits"),
        ));
    }
    Ok(value.to_owned())
}

pub fn description(value: &str) -> Result<String, MatchingError> {
    let value = value.trim();
    let len = char_len(value);
    if len < MIN_DESCRIPTION_LEN {
        return Err(MatchingError::validation(
            "description",
            format!("must be at least {MIN_DESCRIPTION_LEN} characters"),
        ));
    }
    if len > MAX_DESCRIPTION_LEN {
        return Err(MatchingError::validation(
            "description",
            format!("cannot be longer than {MAX_DESCRIPTION_LEN} characters"),
        ));
    }
    Ok(value.to_owned())
}

/// A required free-text field; blank counts as missing.
pub fn required(field: &'static str, value: &str) -> Result<String, MatchingError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MatchingError::validation(field, "is required"));
    }
    Ok(value.to_owned())
}

/// Blank optional strings become `None`.
pub fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

pub fn house_number(value: &str) -> Result<i32, MatchingError> {
    required("number", value)?
        .parse::<i32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| MatchingError::validation("number", "must be a whole number"))
}

pub fn contact_message(value: &str) -> Result<String, MatchingError> {
    let value = value.trim();
    if char_len(value) < MIN_CONTACT_MESSAGE_LEN {
        return Err(MatchingError::validation(
            "message",
            format!("must be at least {MIN_CONTACT_MESSAGE_LEN} characters"),
        ));
    }
    Ok(value.to_owned())
}

pub fn message_content(value: &str) -> Result<String, MatchingError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MatchingError::validation("content", "message cannot be empty"));
    }
    if char_len(value) > MAX_MESSAGE_LEN {
        return Err(MatchingError::validation(
            "content",
            format!("cannot be longer than {MAX_MESSAGE_LEN} characters"),
        ));
    }
    Ok(value.to_owned())
}

/// Between one and `max` timeslots, no repeats.
pub fn timeslot_selection(ids: &[Uuid], max: usize) -> Result<(), MatchingError> {
    if ids.is_empty() {
        return Err(MatchingError::validation("timeslot_ids", "select at least one timeslot"));
    }
    if ids.len() > max {
        return Err(MatchingError::validation(
            "timeslot_ids",
            format!("select at most {max} timeslots"),
        ));
    }
    let distinct: HashSet<&Uuid> = ids.iter().collect();
    if distinct.len() != ids.len() {
        return Err(MatchingError::validation("timeslot_ids", "timeslots must be distinct"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert_eq!(email("  Jan@Example.BE ").unwrap(), "jan@example.be");
        for bad in ["", "jan", "jan@", "@example.be", "jan@example", "jan@.be", "a b@c.de", "a@b@c.de"] {
            assert!(email(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn verification_code_is_six_digits() {
        assert_eq!(verification_code(" 012345 ").unwrap(), "012345");
        assert!(verification_code("12345").is_err());
        assert!(verification_code("1234567").is_err());
        assert!(verification_code("12a456").is_err());
    }

    #[test]
    fn description_bounds_count_characters() {
        assert!(description("too short").is_err());
        assert!(description(&"é".repeat(20)).is_ok());
        assert!(description(&"x".repeat(500)).is_ok());
        assert!(description(&"x".repeat(501)).is_err());
    }

    #[test]
    fn message_content_is_trimmed_and_bounded() {
        assert_eq!(message_content("  hi  ").unwrap(), "hi");
        assert!(message_content("   ").is_err());
        assert!(message_content(&"x".repeat(2001)).is_err());
    }

    #[test]
    fn selection_rules() {
        let a = Uuid::new_v4();
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        assert!(timeslot_selection(&[], 5).is_err());
        assert!(timeslot_selection(&ids, 5).is_ok());
        assert!(timeslot_selection(&[ids.clone(), vec![a]].concat(), 5).is_err());
        assert!(timeslot_selection(&[a, a], 5).is_err());
    }

    #[test]
    fn house_number_must_be_positive_integer() {
        assert_eq!(house_number(" 12 ").unwrap(), 12);
        assert!(house_number("12b").is_err());
        assert!(house_number("").is_err());
        assert!(house_number("0").is_err());
    }
}
