//! Validation helpers for DTOs.

use uuid::Uuid;
use validator::ValidationError;

/// Validates that a player identifier is a well-formed uuid.
pub fn validate_uuid(id: &str) -> Result<(), ValidationError> {
    if Uuid::parse_str(id).is_err() {
        let mut err = ValidationError::new("uuid_format");
        err.message = Some(format!("`{id}` is not a valid uuid").into());
        return Err(err);
    }
    Ok(())
}

/// Validates a ban duration: `0` bans permanently, positive values are
/// seconds, `-1` is reserved for the unban endpoint.
pub fn validate_ban_duration(duration_seconds: i64) -> Result<(), ValidationError> {
    if duration_seconds < -1 {
        let mut err = ValidationError::new("ban_duration");
        err.message = Some("duration_seconds must be -1, 0 or positive".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_uuids() {
        assert!(validate_uuid("00000000-0000-0000-0000-000000000001").is_ok());
        assert!(validate_uuid("c7b9e6a0-9d3f-4d65-8a11-2f5a7b1c9d10").is_ok());
    }

    #[test]
    fn rejects_non_uuids() {
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
        assert!(validate_uuid("00000000-0000-0000-0000").is_err());
    }

    #[test]
    fn ban_duration_bounds() {
        assert!(validate_ban_duration(0).is_ok());
        assert!(validate_ban_duration(-1).is_ok());
        assert!(validate_ban_duration(3600).is_ok());
        assert!(validate_ban_duration(-2).is_err());
    }
}
