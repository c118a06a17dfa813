use crate::model::ModelValidationError;
use time::{
    OffsetDateTime, PrimitiveDateTime, UtcDateTime, UtcOffset,
    format_description::well_known::{Iso8601, Rfc3339},
};

/// Parses a server timestamp. Offset-less date-times are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<UtcDateTime, ModelValidationError> {
    if let Ok(with_offset) = OffsetDateTime::parse(value, &Rfc3339) {
        let utc = with_offset.to_offset(UtcOffset::UTC);
        return Ok(PrimitiveDateTime::new(utc.date(), utc.time()).as_utc());
    }

    PrimitiveDateTime::parse(value, &Iso8601::DEFAULT)
        .map(PrimitiveDateTime::as_utc)
        .map_err(|_| ModelValidationError::InvalidTimestamp(value.to_owned()))
}
