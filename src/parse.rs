//! Parsers for command line values.

use core::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use domain::utils::base16;

use crate::dnssec::zonemd::ZonemdHash;
use crate::duration;
use crate::error::Error;
use crate::zone::StoredName;

pub fn parse_name(arg: &str) -> Result<StoredName, Error> {
    StoredName::from_str(arg).map_err(|e| Error::from(format!("invalid domain name '{arg}': {e}")))
}

/// Parses a date given as `YYYYMMDD` into seconds since the epoch.
///
/// The result is midnight UTC of that day.
pub fn parse_date(arg: &str) -> Result<u32, Error> {
    if arg.len() != 8 || !arg.bytes().all(|ch| ch.is_ascii_digit()) {
        return Err(format!("invalid date '{arg}', expected YYYYMMDD").into());
    }
    let date = NaiveDate::parse_from_str(arg, "%Y%m%d")
        .map_err(|e| format!("invalid date '{arg}': {e}"))?;
    let secs = date
        .and_hms_opt(0, 0, 0)
        .map(|time| time.and_utc().timestamp())
        .ok_or_else(|| format!("invalid date '{arg}'"))?;
    u32::try_from(secs)
        .map_err(|_| format!("date '{arg}' is outside of the range of DNSSEC timestamps").into())
}

pub fn parse_duration(arg: &str) -> Result<Duration, Error> {
    duration::parse_duration(arg).map_err(|e| format!("invalid duration '{arg}': {e}").into())
}

/// Parses an NSEC3 salt in hex, `-` being the empty salt.
pub fn parse_salt(arg: &str) -> Result<Vec<u8>, Error> {
    if arg == "-" {
        return Ok(Vec::new());
    }
    let salt: Vec<u8> =
        base16::decode(arg).map_err(|e| format!("invalid NSEC3 salt '{arg}': {e}"))?;
    if salt.len() > 255 {
        return Err("NSEC3 salt must not be longer than 255 octets".into());
    }
    Ok(salt)
}

pub fn parse_hash_digest(arg: &str) -> Result<ZonemdHash, Error> {
    match arg {
        "1" => Ok(ZonemdHash::Sha384),
        "2" => Ok(ZonemdHash::Sha512),
        _ => Err(format!(
            "invalid ZONEMD hash algorithm '{arg}', expected 1 (SHA-384) or 2 (SHA-512)"
        )
        .into()),
    }
}

//============ Tests =========================================================
