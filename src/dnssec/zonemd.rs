//! Message digests for DNS zones.
//!
//! This implements the SIMPLE scheme of [RFC 8976] with SHA-384 and
//! SHA-512.
//!
//! [RFC 8976]: https://www.rfc-editor.org/rfc/rfc8976

use std::fmt;

use bytes::Bytes;
use domain::base::iana::Rtype;
use domain::base::Record;
use domain::rdata::zonemd::{Algorithm, Scheme};
use domain::rdata::{ZoneRecordData, Zonemd};
use ring::digest;
use tracing::debug;

use crate::zone::rrset::compose_canonical;
use crate::zone::{covered_type, StoredRecord, Zone};

//------------ ZonemdHash ----------------------------------------------------

/// The supported ZONEMD hash algorithms.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ZonemdHash {
    Sha384,
    Sha512,
}

impl ZonemdHash {
    pub fn zonemd_algorithm(self) -> Algorithm {
        match self {
            ZonemdHash::Sha384 => Algorithm::Sha384,
            ZonemdHash::Sha512 => Algorithm::Sha512,
        }
    }

    pub fn from_zonemd_algorithm(algorithm: Algorithm) -> Option<Self> {
        match algorithm {
            Algorithm::Sha384 => Some(ZonemdHash::Sha384),
            Algorithm::Sha512 => Some(ZonemdHash::Sha512),
            _ => None,
        }
    }

    /// Returns the hash of a ZONEMD record if it uses a supported scheme.
    fn of(zonemd: &Zonemd<Bytes>) -> Option<Self> {
        match zonemd.scheme() {
            Scheme::Simple => Self::from_zonemd_algorithm(zonemd.algorithm()),
            _ => None,
        }
    }

    /// The length of the digest in octets.
    pub fn digest_len(self) -> usize {
        self.algorithm().output_len()
    }

    fn algorithm(self) -> &'static digest::Algorithm {
        match self {
            ZonemdHash::Sha384 => &digest::SHA384,
            ZonemdHash::Sha512 => &digest::SHA512,
        }
    }
}

impl fmt::Display for ZonemdHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ZonemdHash::Sha384 => "SHA384",
            ZonemdHash::Sha512 => "SHA512",
        })
    }
}

//------------ Computing -----------------------------------------------------

/// Computes the digest of a zone.
///
/// All records are included in canonical order, except for the ZONEMD
/// RRset at the apex and its signatures. Duplicate records are only
/// included once. See [RFC 8976, section 3.3.1].
///
/// The zone must be sorted.
///
/// [RFC 8976, section 3.3.1]: https://www.rfc-editor.org/rfc/rfc8976#section-3.3.1
pub fn compute_digest(zone: &Zone, hash: ZonemdHash) -> Vec<u8> {
    debug_assert!(zone.is_sorted());

    let mut ctx = digest::Context::new(hash.algorithm());
    let mut buf = Vec::new();
    let mut prev: Option<&StoredRecord> = None;
    for record in zone.records() {
        if record.owner() == zone.apex()
            && (record.rtype() == Rtype::ZONEMD || covered_type(record) == Some(Rtype::ZONEMD))
        {
            continue;
        }
        // Record equality ignores the TTL.
        if prev == Some(record) {
            continue;
        }
        buf.clear();
        compose_canonical(record, record.ttl(), &mut buf);
        ctx.update(&buf);
        prev = Some(record);
    }
    ctx.finish().as_ref().to_vec()
}

/// Adds a ZONEMD record with an all-zero digest for the given hash.
///
/// Nothing happens if the zone already has a ZONEMD record with the SIMPLE
/// scheme and this hash algorithm.
pub fn add_placeholder(zone: &mut Zone, hash: ZonemdHash) {
    if zone.zonemds().any(|zonemd| ZonemdHash::of(zonemd) == Some(hash)) {
        return;
    }
    let record = Record::new(
        zone.apex().clone(),
        zone.class(),
        zone.soa_ttl(),
        ZoneRecordData::Zonemd(Zonemd::new(
            zone.soa().serial(),
            Scheme::Simple,
            hash.zonemd_algorithm(),
            Bytes::from(vec![0; hash.digest_len()]),
        )),
    );
    debug!("Added {hash} ZONEMD placeholder");
    zone.push(record);
}

/// Recomputes the digests of all supported ZONEMD records of the zone.
///
/// The serial of the records is set to that of the SOA. ZONEMD records of
/// other schemes or hash algorithms are left alone. Returns the number of
/// records updated.
pub fn update_digests(zone: &mut Zone) -> usize {
    let digests: Vec<(ZonemdHash, Vec<u8>)> = supported(zone)
        .map(|hash| (hash, compute_digest(zone, hash)))
        .collect();
    let serial = zone.soa().serial();
    let apex = zone.apex().clone();
    let mut count = 0;
    for record in zone.records_mut() {
        if record.owner() != &apex {
            continue;
        }
        let ZoneRecordData::Zonemd(zonemd) = record.data() else {
            continue;
        };
        let Some(hash) = ZonemdHash::of(zonemd) else {
            continue;
        };
        if let Some((_, digest)) = digests.iter().find(|(found, _)| *found == hash) {
            *record.data_mut() = ZoneRecordData::Zonemd(Zonemd::new(
                serial,
                Scheme::Simple,
                hash.zonemd_algorithm(),
                Bytes::copy_from_slice(digest),
            ));
            count += 1;
            debug!("Updated {hash} ZONEMD digest");
        }
    }
    count
}

/// Returns the hash algorithms of the supported ZONEMD records.
fn supported(zone: &Zone) -> impl Iterator<Item = ZonemdHash> + '_ {
    zone.zonemds().filter_map(ZonemdHash::of)
}

//------------ Verifying -----------------------------------------------------

/// Checks the ZONEMD records of the zone.
///
/// All ZONEMD records must have the serial of the SOA. The digest of every
/// record with a supported scheme and hash algorithm must match. There
/// must be at least one such record and, if `required` is given, one for
/// this hash algorithm.
///
/// The zone must be sorted. Returns the number of digests checked.
pub fn verify_digests(zone: &Zone, required: Option<ZonemdHash>) -> Result<usize, ZonemdError> {
    let serial = zone.serial();
    if let Some(zonemd) = zone
        .zonemds()
        .find(|zonemd| zonemd.serial().into_int() != serial)
    {
        return Err(ZonemdError::SerialMismatch {
            found: zonemd.serial().into_int(),
            expected: serial,
        });
    }
    if let Some(hash) = required {
        if !supported(zone).any(|found| found == hash) {
            return Err(ZonemdError::Missing(Some(hash)));
        }
    }

    let mut count = 0;
    for zonemd in zone.zonemds() {
        let Some(hash) = ZonemdHash::of(zonemd) else {
            debug!(
                "Skipping ZONEMD with unsupported scheme {} and hash algorithm {}",
                u8::from(zonemd.scheme()),
                u8::from(zonemd.algorithm())
            );
            continue;
        };
        if compute_digest(zone, hash) != zonemd.digest().as_ref() {
            return Err(ZonemdError::DigestMismatch(hash));
        }
        debug!("{hash} ZONEMD digest verified");
        count += 1;
    }
    if count == 0 {
        return Err(ZonemdError::Missing(None));
    }
    Ok(count)
}

//------------ ZonemdError ---------------------------------------------------

/// A zone digest didn't check out.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ZonemdError {
    /// There is no usable ZONEMD record, or none for the given hash.
    Missing(Option<ZonemdHash>),

    /// A ZONEMD record has a serial other than the SOA.
    SerialMismatch { found: u32, expected: u32 },

    /// The digest is wrong.
    DigestMismatch(ZonemdHash),
}

impl fmt::Display for ZonemdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZonemdError::Missing(None) => {
                f.write_str("no ZONEMD record with a supported scheme and hash algorithm")
            }
            ZonemdError::Missing(Some(hash)) => write!(f, "no {hash} ZONEMD record found"),
            ZonemdError::SerialMismatch { found, expected } => write!(
                f,
                "ZONEMD serial {found} does not match SOA serial {expected}"
            ),
            ZonemdError::DigestMismatch(hash) => write!(f, "{hash} ZONEMD digest mismatch"),
        }
    }
}

impl std::error::Error for ZonemdError {}

//============ Tests =========================================================
