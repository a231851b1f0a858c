// handlers/mod.rs - Three handler tiers
//
// Public (anonymous reads, login) → Protected (any admin session) → Elevated (dev role)
//
// Every handler extracts the optional `Session` and passes the principal to the
// service, which performs the authorization check itself.

pub mod elevated;
pub mod protected;
pub mod public;

use std::str::FromStr;

use crate::error::ApiError;
use crate::types::ParseError;

/// Parse a path segment (locale, namespace) into its typed form.
pub(crate) fn parse_segment<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = ParseError>,
{
    Ok(raw.parse::<T>()?)
}
