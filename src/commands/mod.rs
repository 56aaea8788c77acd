//! The commands of _zonesigner_.
pub mod digest;
pub mod reset;
pub mod sign;
pub mod verify;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::builder::ValueParser;

use crate::env::Env;
use crate::error::{Error, Result};
use crate::parse::{parse_date, parse_duration, parse_name};
use crate::util::write_output;
use crate::zone::reader::read_zone;
use crate::zone::writer::write_zone;
use crate::zone::{StoredName, Zone};

#[derive(Clone, Debug, clap::Subcommand)]
pub enum Command {
    /// Sign a zone
    ///
    /// The zone is read, its serial increased, and an NSEC or NSEC3 chain,
    /// the DNSKEY records, and the signatures are added. Signing data of an
    /// earlier run is replaced. The DS record of the key signing key is
    /// logged and, if the zone is written to a file, printed to stdout.
    #[command(subcommand)]
    Sign(self::sign::Sign),

    /// Verify the signatures and digests of a signed zone
    #[command(name = "verify")]
    Verify(self::verify::Verify),

    /// Add or check ZONEMD digests without touching signatures
    #[command(name = "digest")]
    Digest(self::digest::Digest),

    /// Destroy all keys with the given label in a PKCS#11 token
    #[command(name = "reset-pkcs11-keys")]
    ResetPkcs11Keys(self::reset::ResetPkcs11Keys),
}

impl Command {
    pub fn execute(self, env: impl Env) -> Result<()> {
        match self {
            Self::Sign(sign) => sign.execute(env),
            Self::Verify(verify) => verify.execute(env),
            Self::Digest(digest) => digest.execute(env),
            Self::ResetPkcs11Keys(reset) => reset.execute(env),
        }
    }
}

//------------ ZoneInput -----------------------------------------------------

/// Where to read the zone from.
#[derive(Clone, Debug, clap::Args)]
pub struct ZoneInput {
    /// The zone file to read, stdin if missing or '-'
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// The apex of the zone, taken from the SOA record if missing
    #[arg(
        short = 'z',
        long = "zone",
        value_name = "NAME",
        value_parser = ValueParser::new(parse_name),
    )]
    pub zone: Option<StoredName>,
}

impl ZoneInput {
    /// Reads the zone and brings it into canonical order.
    pub fn read(&self, env: &impl Env) -> Result<Zone> {
        let mut zone = read_zone(env, self.file.as_deref(), self.zone.as_ref())?;
        zone.sort();
        Ok(zone)
    }
}

/// Writes a zone to the given path or stdout.
fn write(env: &impl Env, output: Option<&Path>, zone: &Zone) -> Result<()> {
    write_output(env, output, |target| write_zone(zone, target))
}

//------------ Threshold -----------------------------------------------------

/// The point in time signatures must be valid until.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct Threshold {
    /// Signatures must not expire before this date (YYYYMMDD)
    #[arg(
        long = "verify-threshold-date",
        value_name = "YYYYMMDD",
        value_parser = ValueParser::new(parse_date),
        conflicts_with = "verify_threshold_duration",
    )]
    pub verify_threshold_date: Option<u32>,

    /// Signatures must be valid for at least this long, e.g. '1 week'
    #[arg(
        long = "verify-threshold-duration",
        value_name = "DURATION",
        value_parser = ValueParser::new(parse_duration),
    )]
    pub verify_threshold_duration: Option<Duration>,
}

impl Threshold {
    /// Resolves the threshold as seconds since the epoch.
    ///
    /// Without any option, this is `now`.
    pub fn resolve(&self, now: u32) -> Result<u32> {
        match (self.verify_threshold_date, self.verify_threshold_duration) {
            (Some(date), _) => Ok(date),
            (None, Some(duration)) => add_duration(now, duration),
            (None, None) => Ok(now),
        }
    }
}

/// Adds a duration to a DNSSEC timestamp.
fn add_duration(now: u32, duration: Duration) -> Result<u32> {
    u32::try_from(duration.as_secs())
        .ok()
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| Error::from("duration reaches beyond the range of DNSSEC timestamps"))
}

//============ Tests =========================================================
