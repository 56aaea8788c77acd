//! Reading zones from presentation format.
//!
//! Tokenizing is left to the zone file parser of `domain`. The records it
//! produces are flattened into [`StoredRecord`]s with lowercased owner
//! names. Names in the record data keep their case.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use domain::base::iana::Rtype;
use domain::base::name::{FlattenInto, ToName};
use domain::base::Record;
use domain::rdata::zonemd::{Algorithm, Scheme};
use domain::rdata::ZoneRecordData;
use domain::zonefile::inplace::{self, Entry};
use tracing::{debug, warn};

use crate::env::Env;
use crate::error::{Context, Error, Result};
use crate::util;

use super::{StoredName, StoredRecord, Zone};

/// How deep `$INCLUDE` directives may be nested.
const MAX_INCLUDE_DEPTH: usize = 8;

//------------ Reading -------------------------------------------------------

/// Reads a zone from a file or, if `path` is `None` or `-`, from stdin.
///
/// If an origin is given, it is the expected apex of the zone and the
/// origin for relative names. Without it, the zone file must only contain
/// absolute names or set `$ORIGIN` itself.
pub fn read_zone(env: &impl Env, path: Option<&Path>, origin: Option<&StoredName>) -> Result<Zone> {
    match path {
        Some(path) if !util::is_stdio(path) => {
            let mut file = util::open_file(env, path)?;
            read_zone_from(env, &mut file, origin)
                .with_context(|| format!("reading zone file '{}'", path.display()))
        }
        _ => read_zone_from(env, &mut env.stdin(), origin).context("reading zone from stdin"),
    }
}

/// Reads a zone from the given reader.
pub fn read_zone_from(
    env: &impl Env,
    read: &mut impl io::Read,
    origin: Option<&StoredName>,
) -> Result<Zone> {
    let mut records = Vec::new();
    load_records(env, read, origin, 0, &mut records)?;
    let zone = assemble(records, origin)?;
    debug!(
        "Read zone {} with {} records, serial {}",
        zone.apex(),
        zone.records().len(),
        zone.serial()
    );
    Ok(zone)
}

fn load_records(
    env: &impl Env,
    read: &mut impl io::Read,
    origin: Option<&StoredName>,
    depth: usize,
    records: &mut Vec<StoredRecord>,
) -> Result<()> {
    let mut reader = inplace::Zonefile::load(read)?;
    if let Some(origin) = origin {
        reader.set_origin(origin.clone());
    }
    for entry in reader {
        let entry = entry.map_err(|err| format!("Invalid zone file: {err}"))?;
        match entry {
            Entry::Record(record) => records.push(lowercase_owner(record.flatten_into())),
            Entry::Include { path, origin: include_origin } => {
                if depth >= MAX_INCLUDE_DEPTH {
                    return Err("Invalid zone file: $INCLUDE nested too deeply".into());
                }
                let path = PathBuf::from(path.to_string());
                let include_origin = include_origin.or_else(|| origin.cloned());
                let mut file = util::open_file(env, &path)?;
                load_records(env, &mut file, include_origin.as_ref(), depth + 1, records)
                    .with_context(|| format!("reading included file '{}'", path.display()))?;
            }
        }
    }
    Ok(())
}

fn lowercase_owner(record: StoredRecord) -> StoredRecord {
    let (class, ttl) = (record.class(), record.ttl());
    let (owner, data) = record.into_owner_and_data();
    Record::new(owner.to_canonical_name(), class, ttl, data)
}

/// Determines the apex and builds the zone from the loaded records.
fn assemble(records: Vec<StoredRecord>, expected_apex: Option<&StoredName>) -> Result<Zone> {
    let soa = records
        .iter()
        .find(|record| record.rtype() == Rtype::SOA)
        .ok_or_else(|| Error::from("Invalid zone file: Cannot find SOA record"))?;
    if let Some(expected_apex) = expected_apex {
        if soa.owner() != expected_apex {
            return Err(format!(
                "Zone apex ({}) does not match the expected apex ({expected_apex})",
                soa.owner()
            )
            .into());
        }
    }
    let mut zone = Zone::new(soa.clone())
        .ok_or_else(|| Error::from("Invalid zone file: malformed SOA record"))?;

    let mut seen_soa = false;
    let mut zonemds = HashSet::new();
    for record in records {
        if !record.owner().ends_with(zone.apex()) {
            warn!(
                "Ignoring {} record for {} which is outside of zone {}",
                record.rtype(),
                record.owner(),
                zone.apex()
            );
            continue;
        }
        if record.class() != zone.class() {
            warn!(
                "Ignoring {} record for {} in class {}",
                record.rtype(),
                record.owner(),
                record.class()
            );
            continue;
        }
        match record.data() {
            ZoneRecordData::Soa(_) => {
                if seen_soa {
                    warn!("Ignoring additional SOA record for {}", record.owner());
                }
                seen_soa = true;
                continue;
            }
            ZoneRecordData::Zonemd(zonemd) if record.owner() == zone.apex() => {
                let (scheme, algorithm) = (zonemd.scheme(), zonemd.algorithm());
                if scheme == Scheme::Simple
                    && matches!(algorithm, Algorithm::Sha384 | Algorithm::Sha512)
                    && !zonemds.insert((scheme, algorithm))
                {
                    return Err(format!(
                        "Invalid zone file: duplicate ZONEMD record with scheme {} and hash algorithm {}",
                        u8::from(scheme),
                        u8::from(algorithm)
                    )
                    .into());
                }
            }
            _ => {}
        }
        zone.push(record);
    }
    Ok(zone)
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use domain::base::iana::Class;

    use super::*;
    use crate::env::fake::{FakeCmd, FakeEnv};
    use crate::zone::tests::name;

    fn read(zone: &str, origin: Option<&str>) -> Result<Zone> {
        let env = FakeEnv::from(FakeCmd::new(["zonesigner"]));
        let origin = origin.map(name);
        read_zone_from(&env, &mut zone.as_bytes(), origin.as_ref())
    }

    #[test]
    fn minimal_zone() {
        let zone = read(
            "example.com. 86400 IN SOA ns1 hostmaster 1 10800 15 604800 10800\n\
             example.com. 86400 IN NS ns1\n\
             NS1.example.com. 86400 IN A 127.0.0.1\n",
            Some("example.com."),
        )
        .unwrap();
        assert_eq!(zone.apex(), &name("example.com."));
        assert_eq!(zone.class(), Class::IN);
        assert_eq!(zone.serial(), 1);
        assert_eq!(zone.soa().mname(), &name("ns1.example.com."));
        assert_eq!(zone.records().len(), 3);

        let owner = zone.records()[2].owner();
        assert_eq!(owner, &name("ns1.example.com."));
        assert_eq!(owner.to_string(), "ns1.example.com");
    }

    #[test]
    fn drops_foreign_records_and_extra_soa() {
        let zone = read(
            "example. 3600 IN SOA ns hostmaster 1 2 3 4 5\n\
             www.example. 3600 IN A 192.0.2.1\n\
             www.example.org. 3600 IN A 192.0.2.2\n\
             example. 3600 IN SOA ns hostmaster 2 2 3 4 5\n",
            Some("example."),
        )
        .unwrap();
        assert_eq!(zone.records().len(), 2);
        assert_eq!(zone.serial(), 1);
    }

    #[test]
    fn owners_are_lowercased() {
        let zone = read(
            "Example.COM. 3600 IN SOA NS1 hostmaster 1 2 3 4 5\n\
             WWW 3600 IN CNAME Host.Example.COM.\n",
            Some("example.com."),
        )
        .unwrap();
        assert_eq!(zone.apex().to_string(), "example.com");
        let owners: Vec<_> = zone
            .records()
            .iter()
            .map(|record| record.owner().to_string())
            .collect();
        assert_eq!(owners, ["example.com", "www.example.com"]);
        assert_eq!(zone.soa().mname().to_string(), "NS1.example.com");
        assert_eq!(zone.records()[1].data().to_string(), "Host.Example.COM.");
    }

    #[test]
    fn rejects_bad_zones() {
        assert!(read("example. 3600 IN A 192.0.2.1\n", Some("example.")).is_err());
        assert!(read(
            "example. 3600 IN SOA ns hostmaster 1 2 3 4 5\n",
            Some("example.org.")
        )
        .is_err());

        let zonemd = "example. 3600 IN ZONEMD 1 1 1 \
            0000000000000000000000000000000000000000000000000000000000000000\
            00000000000000000000000000000000\n";
        let zone = format!("example. 3600 IN SOA ns hostmaster 1 2 3 4 5\n{zonemd}{zonemd}");
        let err = read(&zone, Some("example.")).unwrap_err();
        assert!(err.to_string().contains("duplicate ZONEMD"));
    }
}
