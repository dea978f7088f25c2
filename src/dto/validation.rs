//! Validation and parsing helpers for text typed by club members.

use time::{Date, OffsetDateTime, format_description::FormatItem, macros::format_description};
use validator::ValidationError;

use crate::dao::evidence::is_confined;

/// `DD.MM.YYYY`; single-digit day and month are accepted on input.
const BIRTH_DATE_INPUT: &[FormatItem<'static>] =
    format_description!("[day padding:none].[month padding:none].[year]");
/// `DD.MM.YYYY`, zero padded, as echoed back to members.
pub const BIRTH_DATE_DISPLAY: &[FormatItem<'static>] = format_description!("[day].[month].[year]");

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Rejects strings made only of whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "Value must not be blank".into()));
    }
    Ok(())
}

/// Parse a birth date typed as `DD.MM.YYYY`.
///
/// # Examples
///
/// ```ignore
/// parse_birth_date("12.04.2008") // Ok(2008-04-12)
/// parse_birth_date("2008-04-12") // Err - wrong layout
/// parse_birth_date("31.02.2008") // Err - no such day
/// ```
pub fn parse_birth_date(text: &str) -> Result<Date, ValidationError> {
    let date = Date::parse(text.trim(), BIRTH_DATE_INPUT).map_err(|_| {
        invalid(
            "birth_date_format",
            format!("Invalid date `{}`. Please enter the date as DD.MM.YYYY", text.trim()),
        )
    })?;

    if date > OffsetDateTime::now_utc().date() {
        return Err(invalid(
            "birth_date_future",
            "Birth date cannot be in the future".into(),
        ));
    }
    Ok(date)
}

/// Parse a lap time in seconds; a decimal comma is accepted.
///
/// # Examples
///
/// ```ignore
/// parse_lap_time("38.106") // Ok(38.106)
/// parse_lap_time("38,106") // Ok(38.106)
/// parse_lap_time("-1")     // Err - not positive
/// ```
pub fn parse_lap_time(text: &str) -> Result<f64, ValidationError> {
    let normalized = text.trim().replace(',', ".");
    let not_a_time = || {
        invalid(
            "lap_time_format",
            format!("`{}` is not a time. Please enter a number of seconds", text.trim()),
        )
    };

    let seconds: f64 = normalized.parse().map_err(|_| not_a_time())?;
    if !seconds.is_finite() {
        return Err(not_a_time());
    }
    if seconds <= 0.0 {
        return Err(invalid(
            "lap_time_positive",
            "Time must be greater than zero".into(),
        ));
    }
    Ok(seconds)
}

/// Evidence paths must stay below the evidence directory.
pub fn validate_evidence_path(path: &str) -> Result<(), ValidationError> {
    if !is_confined(path) {
        return Err(invalid(
            "evidence_path",
            format!("Evidence path `{path}` must be relative to the evidence directory"),
        ));
    }
    Ok(())
}

/// Human readable message carried by a [`ValidationError`].
pub fn message_of(err: &ValidationError) -> String {
    err.message
        .as_ref()
        .map(|message| message.to_string())
        .unwrap_or_else(|| err.code.to_string())
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn test_parse_birth_date_valid() {
        assert_eq!(parse_birth_date("12.04.2008").unwrap(), date!(2008 - 04 - 12));
        assert_eq!(parse_birth_date(" 1.2.2009 ").unwrap(), date!(2009 - 02 - 01));
    }

    #[test]
    fn test_parse_birth_date_invalid() {
        assert!(parse_birth_date("2008-04-12").is_err()); // ISO layout
        assert!(parse_birth_date("31.02.2008").is_err()); // no such day
        assert!(parse_birth_date("12/04/2008").is_err()); // wrong separator
        assert!(parse_birth_date("").is_err());
        assert!(parse_birth_date("01.01.9999").is_err()); // future
    }

    #[test]
    fn test_parse_lap_time_valid() {
        assert_eq!(parse_lap_time("38.106").unwrap(), 38.106);
        assert_eq!(parse_lap_time("38,106").unwrap(), 38.106);
        assert_eq!(parse_lap_time(" 40 ").unwrap(), 40.0);
    }

    #[test]
    fn test_parse_lap_time_invalid() {
        assert!(parse_lap_time("fast").is_err());
        assert!(parse_lap_time("0").is_err());
        assert!(parse_lap_time("-3.5").is_err());
        assert!(parse_lap_time("NaN").is_err());
        assert!(parse_lap_time("inf").is_err());
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Ivanov").is_ok());
        assert!(validate_not_blank("   ").is_err());
    }

    #[test]
    fn test_validate_evidence_path() {
        assert!(validate_evidence_path("42/shot.png").is_ok());
        assert!(validate_evidence_path("../shot.png").is_err());
        assert!(validate_evidence_path("/var/shot.png").is_err());
    }

    #[test]
    fn test_message_of_prefers_message() {
        let err = parse_lap_time("fast").unwrap_err();
        assert!(message_of(&err).contains("not a time"));
    }
}
