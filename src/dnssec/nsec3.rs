//! Authenticated denial of existence using NSEC3.
//!
//! See [RFC 5155]. Only the SHA-1 hash algorithm exists for NSEC3.
//!
//! [RFC 5155]: https://www.rfc-editor.org/rfc/rfc5155

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use bytes::Bytes;
use domain::base::iana::{Nsec3HashAlg, Rtype};
use domain::base::name::{PushError, ToName};
use domain::base::Record;
use domain::rdata::nsec3::{Nsec3Salt, Nsec3SaltError, OwnerHash};
use domain::rdata::{Nsec3, Nsec3param, ZoneRecordData};
use domain::utils::base32;
use ring::digest;
use tracing::debug;

use super::type_bitmap;
use crate::zone::rrset::families;
use crate::zone::{prepend_label, NameKind, StoredName, StoredRecord, Zone};

//------------ Nsec3Config ---------------------------------------------------

/// The parameters of an NSEC3 chain.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Nsec3Config {
    /// The number of additional hash iterations.
    pub iterations: u16,

    /// The salt, at most 255 octets.
    pub salt: Vec<u8>,

    /// Whether insecure delegations are left out of the chain.
    pub opt_out: bool,
}

//------------ Nsec3Records --------------------------------------------------

/// The records created for an NSEC3 chain.
#[derive(Clone, Debug)]
pub struct Nsec3Records {
    /// The NSEC3 records in canonical order.
    pub nsec3s: Vec<StoredRecord>,

    /// The NSEC3PARAM record for the apex.
    pub nsec3param: StoredRecord,
}

//------------ Hashing -------------------------------------------------------

/// Returns the NSEC3 hash of an owner name.
///
/// From [RFC 5155, section 5]:
///
/// ```text
/// IH(salt, x, 0) = H(x || salt), and
/// IH(salt, x, k) = H(IH(salt, x, k-1) || salt), if k > 0
/// ```
///
/// where `x` is the owner name in canonical wire format.
///
/// [RFC 5155, section 5]: https://www.rfc-editor.org/rfc/rfc5155#section-5
pub fn nsec3_hash(owner: &StoredName, salt: &[u8], iterations: u16) -> Vec<u8> {
    let mut ctx = digest::Context::new(&digest::SHA1_FOR_LEGACY_USE_ONLY);
    ctx.update(owner.to_canonical_name::<Vec<u8>>().as_slice());
    ctx.update(salt);
    let mut hash = ctx.finish();
    for _ in 0..iterations {
        let mut ctx = digest::Context::new(&digest::SHA1_FOR_LEGACY_USE_ONLY);
        ctx.update(hash.as_ref());
        ctx.update(salt);
        hash = ctx.finish();
    }
    hash.as_ref().to_vec()
}

/// Returns the hashed owner name for a hash.
fn hashed_owner(apex: &StoredName, hash: &[u8]) -> Result<StoredName, Nsec3Error> {
    let label = base32::encode_string_hex(hash).to_ascii_lowercase();
    Ok(prepend_label(label.as_bytes(), apex)?)
}

//------------ Generation ----------------------------------------------------

/// Creates the NSEC3 chain of a zone.
///
/// The zone must be in canonical order. Every owner name the zone is
/// authoritative for, every delegation point, and every empty
/// non-terminal gets an NSEC3 record. With opt-out, delegations without
/// a DS record are left out and so are the empty non-terminals only
/// leading to them. The Opt-Out flag is then set in both the NSEC3 and
/// NSEC3PARAM records.
///
/// The DNSKEY and NSEC3PARAM RRsets don't exist yet at this point, so
/// their types are added to the bitmap of the apex.
pub fn generate_nsec3s(zone: &Zone, config: &Nsec3Config) -> Result<Nsec3Records, Nsec3Error> {
    let apex = zone.apex();
    let cuts = zone.cuts();
    let salt = Nsec3Salt::from_octets(Bytes::copy_from_slice(&config.salt))?;

    let mut names: BTreeMap<StoredName, Vec<Rtype>> = BTreeMap::new();
    for family in families(zone.records()) {
        let owner = family[0].owner();
        let present = family.iter().map(|record| record.rtype());
        let types: Vec<Rtype> = match cuts.classify(owner) {
            NameKind::Apex => present
                .chain([Rtype::DNSKEY, Rtype::NSEC3PARAM, Rtype::RRSIG])
                .collect(),
            NameKind::Authoritative => present.chain([Rtype::RRSIG]).collect(),
            NameKind::Delegation => {
                let mut types: Vec<Rtype> = present
                    .filter(|rtype| *rtype == Rtype::NS || *rtype == Rtype::DS)
                    .collect();
                if types.contains(&Rtype::DS) {
                    types.push(Rtype::RRSIG);
                } else if config.opt_out {
                    continue;
                }
                types
            }
            NameKind::Occluded => continue,
        };
        names.insert(owner.clone(), types);
    }

    // Empty non-terminals between the included names and the apex.
    let mut ents = Vec::new();
    for name in names.keys() {
        let mut parent = name.parent();
        while let Some(name) = parent {
            if &name == apex || !name.ends_with(apex) {
                break;
            }
            if !names.contains_key(&name) {
                ents.push(name.clone());
            }
            parent = name.parent();
        }
    }
    for name in ents {
        names.entry(name).or_default();
    }

    let mut hashed: Vec<(Vec<u8>, &StoredName, &Vec<Rtype>)> = Vec::with_capacity(names.len());
    let mut seen: HashMap<Vec<u8>, &StoredName> = HashMap::with_capacity(names.len());
    for (name, types) in &names {
        let hash = nsec3_hash(name, &config.salt, config.iterations);
        if let Some(first) = seen.insert(hash.clone(), name) {
            return Err(Nsec3Error::HashCollision {
                first: first.clone(),
                second: name.clone(),
            });
        }
        hashed.push((hash, name, types));
    }
    // The base32hex encoding keeps the order of the hashes, so this is
    // the canonical order of the hashed owner names.
    hashed.sort_by(|left, right| left.0.cmp(&right.0));

    let flags = u8::from(config.opt_out);
    let ttl = zone.denial_ttl();
    let mut nsec3s = Vec::with_capacity(hashed.len());
    for (i, (hash, name, types)) in hashed.iter().enumerate() {
        let (next_owner, _, _) = &hashed[(i + 1) % hashed.len()];
        let owner = hashed_owner(apex, hash)?;
        debug!("NSEC3 {owner} for {name}");
        let next_owner = OwnerHash::from_octets(Bytes::copy_from_slice(next_owner))
            .map_err(|_| Nsec3Error::Hash)?;
        nsec3s.push(Record::new(
            owner,
            zone.class(),
            ttl,
            ZoneRecordData::Nsec3(Nsec3::new(
                Nsec3HashAlg::SHA1,
                flags,
                config.iterations,
                salt.clone(),
                next_owner,
                type_bitmap(types.iter().copied()),
            )),
        ));
    }

    let nsec3param = Record::new(
        apex.clone(),
        zone.class(),
        zone.soa().minimum(),
        ZoneRecordData::Nsec3param(Nsec3param::new(
            Nsec3HashAlg::SHA1,
            flags,
            config.iterations,
            salt,
        )),
    );
    debug!("Generated {} NSEC3 records", nsec3s.len());
    Ok(Nsec3Records { nsec3s, nsec3param })
}

//------------ Nsec3Error ----------------------------------------------------

/// The NSEC3 chain could not be built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Nsec3Error {
    /// Two names have the same hash.
    ///
    /// A different salt will resolve this.
    HashCollision { first: StoredName, second: StoredName },

    /// The hashed owner name is too long.
    Owner(PushError),

    /// The salt is longer than 255 octets.
    Salt,

    /// A hash doesn't fit into the record.
    Hash,
}

impl From<PushError> for Nsec3Error {
    fn from(err: PushError) -> Self {
        Nsec3Error::Owner(err)
    }
}

impl From<Nsec3SaltError> for Nsec3Error {
    fn from(_: Nsec3SaltError) -> Self {
        Nsec3Error::Salt
    }
}

impl fmt::Display for Nsec3Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nsec3Error::HashCollision { first, second } => {
                write!(f, "NSEC3 hash collision between {first} and {second}")
            }
            Nsec3Error::Owner(err) => write!(f, "invalid NSEC3 owner name: {err}"),
            Nsec3Error::Salt => f.write_str("NSEC3 salt longer than 255 octets"),
            Nsec3Error::Hash => f.write_str("NSEC3 hash longer than 255 octets"),
        }
    }
}

impl std::error::Error for Nsec3Error {}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use domain::base::iana::{DigestAlg, SecAlg};
    use domain::base::Ttl;
    use domain::rdata::{Ds, Ns, A};
    use domain::utils::base16;

    use super::*;
    use crate::zone::tests::{name, record, zone};

    fn a(owner: &str) -> StoredRecord {
        record(owner, "192.0.2.1".parse::<A>().unwrap())
    }

    fn hash_str(owner: &str, salt: &str, iterations: u16) -> String {
        let salt = base16::decode_vec(salt).unwrap();
        base32::encode_string_hex(&nsec3_hash(&name(owner), &salt, iterations)).to_ascii_lowercase()
    }

    fn nsec3(record: &StoredRecord) -> &Nsec3<Bytes> {
        match record.data() {
            ZoneRecordData::Nsec3(nsec3) => nsec3,
            _ => panic!("not an NSEC3 record"),
        }
    }

    fn nsec3param(record: &StoredRecord) -> &Nsec3param<Bytes> {
        match record.data() {
            ZoneRecordData::Nsec3param(nsec3param) => nsec3param,
            _ => panic!("not an NSEC3PARAM record"),
        }
    }

    fn first_label(record: &StoredRecord) -> String {
        record.owner().to_string().split('.').next().unwrap().into()
    }

    #[test]
    fn hashes() {
        // RFC 5155, appendix A.
        assert_eq!(
            hash_str("example.", "aabbccdd", 12),
            "0p9mhaveqvm6t7vbl5lop2u3t2rp3tom"
        );
        assert_eq!(
            hash_str("a.example.", "aabbccdd", 12),
            "35mthgpgcu1qg68fab165klnsnk3dpvl"
        );
        assert_eq!(
            hash_str("example.com.", "abcd", 0),
            "vr9c9n860koddjcmhuuq6a3iri5ar02i"
        );
        assert_eq!(
            hash_str("EXAMPLE.com.", "deadbeef", 10),
            "8a5v7auavja88g1dp716ts1hlvbcnjo7"
        );
    }

    #[test]
    fn minimal_chain() {
        let mut zone = zone("example.com.", 1);
        zone.push(record("example.com.", Ns::new(name("ns1.example.com."))));
        zone.push(a("ns1.example.com."));
        zone.sort();

        let config = Nsec3Config {
            iterations: 0,
            salt: vec![0xab, 0xcd],
            opt_out: false,
        };
        let res = generate_nsec3s(&zone, &config).unwrap();
        let labels: Vec<_> = res.nsec3s.iter().map(first_label).collect();
        assert_eq!(
            labels,
            [
                "62qb06h9i34m077om10nrou8cn066vrn",
                "vr9c9n860koddjcmhuuq6a3iri5ar02i"
            ]
        );
        assert_eq!(
            nsec3(&res.nsec3s[0]).next_owner().as_slice(),
            nsec3_hash(zone.apex(), &config.salt, 0)
        );
        assert_eq!(
            nsec3(&res.nsec3s[1]).next_owner().as_slice(),
            nsec3_hash(&name("ns1.example.com."), &config.salt, 0)
        );
        assert_eq!(nsec3(&res.nsec3s[0]).types().to_string(), "A RRSIG");
        assert_eq!(
            nsec3(&res.nsec3s[1]).types().to_string(),
            "NS SOA RRSIG DNSKEY NSEC3PARAM"
        );
        assert_eq!(res.nsec3s[0].ttl(), Ttl::from_secs(3600));

        assert_eq!(res.nsec3param.owner(), zone.apex());
        assert_eq!(res.nsec3param.data().to_string(), "1 0 0 ABCD");
    }

    #[test]
    fn chain_order() {
        let mut zone = zone("example.com.", 1);
        for owner in ["a.example.com.", "b.example.com.", "c.example.com."] {
            zone.push(a(owner));
        }
        zone.sort();

        let config = Nsec3Config {
            iterations: 10,
            salt: vec![0xde, 0xad, 0xbe, 0xef],
            opt_out: false,
        };
        let res = generate_nsec3s(&zone, &config).unwrap();
        let labels: Vec<_> = res.nsec3s.iter().map(first_label).collect();
        assert_eq!(
            labels,
            [
                "2g1v1ug9q8j2t3va5av2ft84dtr528vv",
                "8a5v7auavja88g1dp716ts1hlvbcnjo7",
                "pth9j38c49qm3grbte1gvcc5qoujheog",
                "tte9f1ps2a5hi379ovtf6b0036i4c72k",
            ]
        );
        for (i, record) in res.nsec3s.iter().enumerate() {
            let next = &labels[(i + 1) % labels.len()];
            let next_owner = base32::encode_string_hex(nsec3(record).next_owner().as_slice());
            assert_eq!(&next_owner.to_ascii_lowercase(), next);
            assert_eq!(nsec3(record).iterations(), 10);
        }
    }

    #[test]
    fn opt_out_and_empty_non_terminals() {
        let mut zone = zone("example.", 1);
        zone.push(record("example.", Ns::new(name("ns.example."))));
        zone.push(a("x.y.example."));
        zone.push(record("insecure.example.", Ns::new(name("ns.other."))));
        zone.push(record("d.e.example.", Ns::new(name("ns.other."))));
        zone.push(a("ns.insecure.example."));
        zone.sort();

        let salt = vec![1, 2];
        let generate = |opt_out| {
            let config = Nsec3Config {
                iterations: 1,
                salt: salt.clone(),
                opt_out,
            };
            generate_nsec3s(&zone, &config).unwrap()
        };
        let owners = |res: &Nsec3Records| {
            let mut owners: Vec<_> = res
                .nsec3s
                .iter()
                .map(|record| (record.owner().to_string(), nsec3(record).types().to_string()))
                .collect();
            owners.sort();
            owners
        };
        let hashed = |owner: &str| {
            hashed_owner(zone.apex(), &nsec3_hash(&name(owner), &salt, 1))
                .unwrap()
                .to_string()
        };

        let res = generate(false);
        assert!(res.nsec3s.iter().all(|record| !nsec3(record).opt_out()));
        assert_eq!(nsec3param(&res.nsec3param).flags(), 0);
        assert_eq!(res.nsec3param.data().to_string(), "1 0 1 0102");
        let mut expected = vec![
            (hashed("example."), "NS SOA RRSIG DNSKEY NSEC3PARAM".to_string()),
            (hashed("y.example."), String::new()),
            (hashed("x.y.example."), "A RRSIG".into()),
            (hashed("insecure.example."), "NS".into()),
            (hashed("e.example."), String::new()),
            (hashed("d.e.example."), "NS".into()),
        ];
        expected.sort();
        assert_eq!(owners(&res), expected);

        let res = generate(true);
        assert!(res.nsec3s.iter().all(|record| nsec3(record).flags() == 1));
        assert_eq!(nsec3param(&res.nsec3param).flags(), 1);
        assert_eq!(res.nsec3param.data().to_string(), "1 1 1 0102");
        let mut expected = vec![
            (hashed("example."), "NS SOA RRSIG DNSKEY NSEC3PARAM".to_string()),
            (hashed("y.example."), String::new()),
            (hashed("x.y.example."), "A RRSIG".into()),
        ];
        expected.sort();
        assert_eq!(owners(&res), expected);
    }

    #[test]
    fn secure_delegation_kept_under_opt_out() {
        let mut zone = zone("example.", 1);
        zone.push(record("sub.example.", Ns::new(name("ns.other."))));
        zone.push(record(
            "sub.example.",
            Ds::new(
                1,
                SecAlg::ECDSAP256SHA256,
                DigestAlg::SHA256,
                Bytes::from(vec![0; 32]),
            )
            .unwrap(),
        ));
        zone.sort();

        let config = Nsec3Config {
            iterations: 0,
            salt: Vec::new(),
            opt_out: true,
        };
        let res = generate_nsec3s(&zone, &config).unwrap();
        assert_eq!(res.nsec3s.len(), 2);
        let sub = nsec3_hash(&name("sub.example."), &[], 0);
        let record = res
            .nsec3s
            .iter()
            .find(|record| record.owner() == &hashed_owner(zone.apex(), &sub).unwrap())
            .unwrap();
        assert_eq!(nsec3(record).types().to_string(), "NS DS RRSIG");
        assert_eq!(res.nsec3param.data().to_string(), "1 1 0 -");
    }

    #[test]
    fn long_salt() {
        let zone = zone("example.", 1);
        let config = Nsec3Config {
            iterations: 0,
            salt: vec![0; 256],
            opt_out: false,
        };
        assert_eq!(generate_nsec3s(&zone, &config).unwrap_err(), Nsec3Error::Salt);
    }
}
