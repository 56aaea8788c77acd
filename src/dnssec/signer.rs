//! Signing a zone.
//!
//! A signing run goes through these steps:
//!
//! 1. The SOA serial is increased and signing data of an earlier run is
//!    removed.
//! 2. Optional extra records are added: the informational TXT record and
//!    the ZONEMD placeholder.
//! 3. The NSEC or NSEC3 chain is created.
//! 4. The keys are fetched from the provider and the DNSKEY RRset added.
//! 5. All authoritative RRsets are signed with the ZSK, the DNSKEY RRset
//!    with the KSK.
//! 6. The ZONEMD digests are computed and the ZONEMD RRset signed.
//!
//! Every signature is checked right after it has been made.

use bytes::Bytes;
use chrono::{DateTime, Datelike};
use domain::base::iana::Rtype;
use domain::base::name::ToName;
use domain::base::{Record, Ttl};
use domain::rdata::dnssec::{ProtoRrsig, Timestamp};
use domain::rdata::{Dnskey, Txt, ZoneRecordData};
use rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};

use crate::context::{Denial, Nsec3Salt, SigningContext};
use crate::error::{bail, Context, Error, Result};
use crate::keys::{KeyPair, KeyProvider, KeyRole, SigningKey};
use crate::util::format_timestamp;
use crate::zone::rrset::rrsets;
use crate::zone::{prepend_label, Rrset, StoredName, StoredRecord, Zone};

use super::crypto::{ds_for, verify_signature};
use super::nsec::generate_nsecs;
use super::nsec3::{generate_nsec3s, Nsec3Config, Nsec3Error, Nsec3Records};
use super::signed_data;
use super::zonemd::{add_placeholder, update_digests};

/// How often a signature is attempted before giving up.
const MAX_SIGN_ATTEMPTS: usize = 3;

/// How often a random NSEC3 salt is drawn before a hash collision is fatal.
const MAX_SALT_ATTEMPTS: usize = 10;

/// The label of the owner name of the informational TXT record.
const INFO_LABEL: &[u8] = b"_created_by";

//------------ sign_zone -----------------------------------------------------

/// Signs the zone of the context with keys from the provider.
///
/// On success, the zone of the context is signed and in canonical order.
/// Returns the DS record for the KSK.
pub fn sign_zone<R, P>(ctx: &mut SigningContext<R>, provider: &mut P) -> Result<StoredRecord>
where
    R: RngCore + CryptoRng,
    P: KeyProvider,
{
    let config = &ctx.config;
    let zone = &mut ctx.zone;
    let apex = zone.apex().clone();
    let class = zone.class();

    let serial = bumped_serial(zone.serial(), config.inception);
    debug!("Changing SOA serial from {} to {serial}", zone.serial());
    zone.set_serial(serial);
    strip_signatures(zone, config.info);

    if config.info {
        let record = info_record(zone, &config.denial, provider.kind(), config.inception)?;
        zone.push(record);
    }
    zone.sort();
    normalize_ttls(zone);

    let digesting = match config.digest {
        Some(hash) => {
            add_placeholder(zone, hash);
            true
        }
        None => zone.zonemds().next().is_some(),
    };
    zone.sort();

    add_denial(zone, &config.denial, &mut ctx.rng)?;
    zone.sort();

    let keys = provider
        .get_keys()
        .map_err(Error::from)
        .with_context(|| format!("getting keys from {} provider", provider.kind()))?;
    let zsk = keys.zsk.dnskey(KeyRole::Zsk)?;
    let ksk = keys.ksk.dnskey(KeyRole::Ksk)?;
    let algorithm = config.algorithm.sec_alg();
    if zsk.algorithm() != algorithm || ksk.algorithm() != algorithm {
        bail!("keys do not use algorithm {}", config.algorithm);
    }
    info!(
        "Signing zone {apex} with ZSK {} and KSK {}",
        zsk.key_tag(),
        ksk.key_tag()
    );
    let dnskey_ttl = zone.soa().minimum();
    for dnskey in [&zsk, &ksk] {
        zone.push(Record::new(
            apex.clone(),
            class,
            dnskey_ttl,
            ZoneRecordData::Dnskey(dnskey.clone()),
        ));
    }
    zone.sort();

    let signer = RrsetSigner {
        apex: &apex,
        inception: config.inception,
        expiration: config.expiration,
        keys: &keys,
        zsk: &zsk,
        ksk: &ksk,
    };
    let cuts = zone.cuts();
    let mut signatures = Vec::new();
    for rrset in rrsets(zone.records()) {
        if !cuts.is_signable(rrset.owner(), rrset.rtype()) {
            continue;
        }
        if rrset.rtype() == Rtype::ZONEMD && digesting && rrset.owner() == &apex {
            continue;
        }
        let role = if rrset.rtype() == Rtype::DNSKEY {
            KeyRole::Ksk
        } else {
            KeyRole::Zsk
        };
        signatures.push(signer.sign(&rrset, role)?);
    }
    debug!("Created {} signatures", signatures.len());
    zone.extend(signatures);

    if digesting {
        zone.sort();
        let count = update_digests(zone);
        debug!("Updated {count} ZONEMD digests");
        let zonemds: Vec<StoredRecord> = zone
            .records()
            .iter()
            .filter(|record| record.rtype() == Rtype::ZONEMD && record.owner() == &apex)
            .cloned()
            .collect();
        if let Some(rrset) = Rrset::new(&zonemds) {
            let rrsig = signer.sign(&rrset, KeyRole::Zsk)?;
            zone.push(rrsig);
        }
    }
    zone.sort();

    let ds = ds_for(&apex, &ksk).map_err(|err| format!("creating DS record: {err}"))?;
    Ok(Record::new(apex, class, dnskey_ttl, ZoneRecordData::Ds(ds)))
}

//------------ Preparation ---------------------------------------------------

/// Returns the serial for a newly signed zone.
///
/// This is the current serial increased by two or the date of `now` in
/// the format `YYYYMMDD00`, whichever is larger.
pub fn bumped_serial(current: u32, now: u32) -> u32 {
    let next = current.wrapping_add(2);
    match DateTime::from_timestamp(i64::from(now), 0) {
        Some(now) => {
            // Years up to 2106 fit into a u32 this way.
            let date = u32::try_from(now.year()).unwrap_or(0) * 1_000_000
                + now.month() * 10_000
                + now.day() * 100;
            next.max(date)
        }
        None => next,
    }
}

/// Removes the signing data of an earlier run.
///
/// This is all RRSIG, NSEC, NSEC3 and NSEC3PARAM records and the DNSKEY
/// records at the apex. If `info` is set, an old informational TXT record
/// goes, too.
fn strip_signatures(zone: &mut Zone, info: bool) {
    let apex = zone.apex().clone();
    let info_owner = prepend_label(INFO_LABEL, &apex).ok();
    let before = zone.records().len();
    zone.retain(|record| {
        let rtype = record.rtype();
        if matches!(
            rtype,
            Rtype::RRSIG | Rtype::NSEC | Rtype::NSEC3 | Rtype::NSEC3PARAM
        ) {
            return false;
        }
        if rtype == Rtype::DNSKEY && record.owner() == &apex {
            return false;
        }
        !(info && rtype == Rtype::TXT && Some(record.owner()) == info_owner.as_ref())
    });
    let removed = before - zone.records().len();
    if removed > 0 {
        info!("Removed {removed} records of an earlier signing run");
    }
}

/// Creates the informational TXT record.
fn info_record(zone: &Zone, denial: &Denial, provider: &str, now: u32) -> Result<StoredRecord> {
    let owner = prepend_label(INFO_LABEL, zone.apex())?;
    let time = format_timestamp(now);
    let text = format!(
        "Signed by {} {} using {} with {} keys on {time}",
        clap::crate_name!(),
        clap::crate_version!(),
        denial.mode(),
        provider,
    );
    let txt = Txt::build_from_slice(text.as_bytes())
        .map_err(|err| format!("creating informational TXT record: {err}"))?;
    Ok(Record::new(
        owner,
        zone.class(),
        zone.soa().minimum(),
        ZoneRecordData::Txt(txt),
    ))
}

/// Makes sure all records of an RRset have the same TTL.
///
/// The zone must be sorted. Differing TTLs are replaced by the smallest
/// TTL of the RRset.
fn normalize_ttls(zone: &mut Zone) {
    let mut fixes = Vec::new();
    let mut pos = 0;
    for rrset in rrsets(zone.records()) {
        let len = rrset.records().len();
        let min = rrset.iter().map(|record| record.ttl()).min().unwrap_or(Ttl::ZERO);
        if rrset.iter().any(|record| record.ttl() != min) {
            warn!(
                "Records of {} {} have different TTLs, using {}",
                rrset.owner(),
                rrset.rtype(),
                min.as_secs()
            );
            fixes.push((pos..pos + len, min));
        }
        pos += len;
    }
    for (range, ttl) in fixes {
        for record in &mut zone.records_mut()[range] {
            record.set_ttl(ttl);
        }
    }
}

/// Adds the NSEC or NSEC3 chain to a sorted zone.
fn add_denial(
    zone: &mut Zone,
    denial: &Denial,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<()> {
    let (iterations, salt, opt_out) = match denial {
        Denial::Nsec => {
            let nsecs = generate_nsecs(zone);
            zone.extend(nsecs);
            return Ok(());
        }
        Denial::Nsec3 {
            iterations,
            salt,
            opt_out,
        } => (*iterations, salt, *opt_out),
    };

    let records = nsec3_chain(zone, salt, iterations, opt_out, rng, generate_nsec3s)?;
    zone.extend(records.nsec3s);
    zone.push(records.nsec3param);
    Ok(())
}

/// Builds an NSEC3 chain, drawing a new random salt after a collision.
///
/// A fixed salt fails on the first collision. A random salt is drawn up
/// to [`MAX_SALT_ATTEMPTS`] times.
fn nsec3_chain<F>(
    zone: &Zone,
    salt: &Nsec3Salt,
    iterations: u16,
    opt_out: bool,
    rng: &mut (impl RngCore + CryptoRng),
    mut generate: F,
) -> Result<Nsec3Records>
where
    F: FnMut(&Zone, &Nsec3Config) -> std::result::Result<Nsec3Records, Nsec3Error>,
{
    let mut attempt = 1;
    loop {
        let config = salt.config(iterations, opt_out, &mut *rng);
        match generate(zone, &config) {
            Ok(records) => return Ok(records),
            Err(err @ Nsec3Error::HashCollision { .. })
                if matches!(salt, Nsec3Salt::Random(_)) && attempt < MAX_SALT_ATTEMPTS =>
            {
                warn!("{err}, retrying with a new salt");
                attempt += 1;
            }
            Err(err @ Nsec3Error::HashCollision { .. }) => {
                return Err(Error::from(err)
                    .context("creating the NSEC3 chain, use a different salt"));
            }
            Err(err) => return Err(err.into()),
        }
    }
}

//------------ RrsetSigner ---------------------------------------------------

/// Creates the RRSIG records for RRsets.
struct RrsetSigner<'a, K> {
    apex: &'a StoredName,
    inception: u32,
    expiration: u32,
    keys: &'a KeyPair<K>,
    zsk: &'a Dnskey<Bytes>,
    ksk: &'a Dnskey<Bytes>,
}

impl<K: SigningKey> RrsetSigner<'_, K> {
    /// Signs an RRset with the key of the given role.
    ///
    /// The signature is verified with the public key. If that fails, the
    /// RRset is signed again, up to [`MAX_SIGN_ATTEMPTS`] times in total.
    fn sign(&self, rrset: &Rrset, role: KeyRole) -> Result<StoredRecord> {
        let (key, dnskey) = match role {
            KeyRole::Zsk => (&self.keys.zsk, self.zsk),
            KeyRole::Ksk => (&self.keys.ksk, self.ksk),
        };
        let rrsig = ProtoRrsig::new(
            rrset.rtype(),
            dnskey.algorithm(),
            rrset.owner().rrsig_label_count(),
            rrset.ttl(),
            Timestamp::from(self.expiration),
            Timestamp::from(self.inception),
            dnskey.key_tag(),
            self.apex.clone(),
        );
        let data = signed_data(&rrsig, rrset.ttl(), rrset);
        for attempt in 1..=MAX_SIGN_ATTEMPTS {
            let signature = key.sign(&data)?;
            match verify_signature(dnskey, &data, &signature) {
                Ok(()) => {
                    let rrsig = rrsig
                        .into_rrsig(Bytes::from(signature))
                        .map_err(|err| format!("creating RRSIG record: {err}"))?;
                    return Ok(Record::new(
                        rrset.owner().clone(),
                        rrset.class(),
                        rrset.ttl(),
                        ZoneRecordData::Rrsig(rrsig),
                    ));
                }
                Err(err) => warn!(
                    "Signature for {} {} failed to verify on attempt {attempt}: {err}",
                    rrset.owner(),
                    rrset.rtype()
                ),
            }
        }
        Err(format!(
            "could not create a valid signature for {} {} after {MAX_SIGN_ATTEMPTS} attempts",
            rrset.owner(),
            rrset.rtype()
        )
        .into())
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::Path;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use domain::base::iana::DigestAlg;
    use domain::rdata::A;

    use super::*;
    use crate::context::{SignConfig, VerifyConfig};
    use crate::dnssec::verifier::verify_zone;
    use crate::dnssec::zonemd::ZonemdHash;
    use crate::env::fake::{FakeCmd, FakeEnv};
    use crate::keys::file::{FileKey, FileProvider};
    use crate::keys::{KeyError, SignAlgorithm};
    use crate::zone::covered_type;
    use crate::zone::reader::read_zone_from;
    use crate::zone::tests::name;

    const ZONE: &str = "example.com. 86400 IN SOA ns1 hostmaster 1 10800 15 604800 10800\n\
                        example.com. 86400 IN NS ns1\n\
                        ns1.example.com. 86400 IN A 127.0.0.1\n\
                        sub.example.com. 86400 IN NS ns.sub\n\
                        ns.sub.example.com. 86400 IN A 127.0.0.2\n";

    /// 2023-11-14T22:13:20Z
    const NOW: u32 = 1_700_000_000;

    fn read(data: &str) -> Zone {
        let env = FakeEnv::from(FakeCmd::new(["zonesigner"]));
        let apex = name("example.com.");
        read_zone_from(&env, &mut data.as_bytes(), Some(&apex)).unwrap()
    }

    fn config(algorithm: SignAlgorithm, denial: Denial) -> SignConfig {
        SignConfig {
            algorithm,
            denial,
            digest: None,
            info: false,
            inception: NOW,
            expiration: NOW + 86400 * 30,
        }
    }

    fn sign(config: SignConfig, dir: &Path) -> (Zone, StoredRecord) {
        let env = FakeEnv::from(FakeCmd::new(["zonesigner"]).cwd(dir));
        let mut provider = FileProvider::open(
            &env,
            Path::new("zsk.pem"),
            Path::new("ksk.pem"),
            config.algorithm,
            true,
        )
        .unwrap();
        let mut ctx = SigningContext::new(config, read(ZONE), StdRng::seed_from_u64(42));
        let ds = sign_zone(&mut ctx, &mut provider).unwrap();
        (ctx.zone, ds)
    }

    fn verify(zone: &Zone) -> Result<()> {
        verify_zone(
            zone,
            &VerifyConfig {
                threshold: NOW,
                digest: None,
            },
        )
        .map(|_| ())
    }

    fn types_at<'a>(zone: &'a Zone, owner: &'a str) -> Vec<String> {
        zone.records()
            .iter()
            .filter(|record| record.owner() == &name(owner))
            .map(|record| match covered_type(record) {
                Some(covered) => format!("RRSIG {covered}"),
                None => record.rtype().to_string(),
            })
            .collect()
    }

    #[test]
    fn serials() {
        assert_eq!(bumped_serial(1, NOW), 2023111400);
        assert_eq!(bumped_serial(2023111400, NOW), 2023111402);
        assert_eq!(bumped_serial(2023111500, NOW), 2023111502);
        assert_eq!(bumped_serial(7, 0), 1970010100);
    }

    #[test]
    fn sign_with_nsec() {
        let dir = tempfile::TempDir::new().unwrap();
        let (zone, ds) = sign(
            config(SignAlgorithm::EcdsaP256Sha256, Denial::Nsec),
            dir.path(),
        );
        assert!(zone.is_sorted());
        assert_eq!(zone.serial(), 2023111400);
        assert_eq!(
            types_at(&zone, "example.com."),
            [
                "NS",
                "SOA",
                "RRSIG NS",
                "RRSIG SOA",
                "RRSIG NSEC",
                "RRSIG DNSKEY",
                "NSEC",
                "DNSKEY",
                "DNSKEY"
            ]
        );
        assert_eq!(types_at(&zone, "ns1.example.com."), ["A", "RRSIG A", "RRSIG NSEC", "NSEC"]);
        // The delegation only gets its NSEC signed, the glue nothing.
        assert_eq!(
            types_at(&zone, "sub.example.com."),
            ["NS", "RRSIG NSEC", "NSEC"]
        );
        assert_eq!(types_at(&zone, "ns.sub.example.com."), ["A"]);

        let ZoneRecordData::Ds(ds) = ds.data() else {
            panic!("not a DS record")
        };
        assert_eq!(ds.digest_type(), DigestAlg::SHA256);
        assert_eq!(ds.digest().len(), 32);
        verify(&zone).unwrap();
    }

    #[test]
    fn sign_with_nsec3_and_digest() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = config(
            SignAlgorithm::RsaSha256,
            Denial::Nsec3 {
                iterations: 5,
                salt: Nsec3Salt::Random(8),
                opt_out: true,
            },
        );
        config.digest = Some(ZonemdHash::Sha512);
        config.info = true;
        let (zone, _) = sign(config, dir.path());

        let apex = types_at(&zone, "example.com.");
        assert!(apex.contains(&"ZONEMD".to_string()));
        assert!(apex.contains(&"RRSIG ZONEMD".to_string()));
        assert!(apex.contains(&"NSEC3PARAM".to_string()));
        assert!(!apex.contains(&"NSEC".to_string()));
        assert_eq!(
            types_at(&zone, "_created_by.example.com."),
            ["TXT", "RRSIG TXT"]
        );
        // Apex, ns1, and _created_by; the insecure delegation is opted out.
        let nsec3s = zone
            .records()
            .iter()
            .filter(|record| record.rtype() == Rtype::NSEC3)
            .count();
        assert_eq!(nsec3s, 3);

        verify(&zone).unwrap();
        crate::dnssec::zonemd::verify_digests(&zone, Some(ZonemdHash::Sha512)).unwrap();
    }

    #[test]
    fn resigning_replaces_old_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let (zone, _) = sign(
            config(SignAlgorithm::EcdsaP256Sha256, Denial::Nsec),
            dir.path(),
        );
        let count = zone.records().len();

        let env = FakeEnv::from(FakeCmd::new(["zonesigner"]).cwd(dir.path()));
        let mut provider = FileProvider::open(
            &env,
            Path::new("zsk.pem"),
            Path::new("ksk.pem"),
            SignAlgorithm::EcdsaP256Sha256,
            false,
        )
        .unwrap();
        let mut ctx = SigningContext::new(
            config(SignAlgorithm::EcdsaP256Sha256, Denial::Nsec),
            zone,
            StdRng::seed_from_u64(1),
        );
        sign_zone(&mut ctx, &mut provider).unwrap();
        assert_eq!(ctx.zone.records().len(), count);
        assert_eq!(ctx.zone.serial(), 2023111402);
        verify(&ctx.zone).unwrap();
    }

    #[test]
    fn ttls_are_normalized() {
        let mut zone = read(ZONE);
        zone.push(Record::new(
            name("ns1.example.com."),
            zone.class(),
            Ttl::from_secs(60),
            "127.0.0.3".parse::<A>().unwrap().into(),
        ));
        zone.sort();
        normalize_ttls(&mut zone);
        let ttls: Vec<_> = zone
            .records()
            .iter()
            .filter(|record| record.rtype() == Rtype::A && record.owner() == &name("ns1.example.com."))
            .map(|record| record.ttl().as_secs())
            .collect();
        assert_eq!(ttls, [60, 60]);
    }

    //--- Self-verification

    /// A key that produces garbage for the first few signatures.
    struct FlakyKey {
        key: FileKey,
        failures: Cell<usize>,
    }

    impl SigningKey for FlakyKey {
        fn algorithm(&self) -> SignAlgorithm {
            self.key.algorithm()
        }

        fn public_key(&self) -> std::result::Result<Vec<u8>, KeyError> {
            self.key.public_key()
        }

        fn sign(&self, data: &[u8]) -> std::result::Result<Vec<u8>, KeyError> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Ok(vec![0; 64]);
            }
            self.key.sign(data)
        }
    }

    struct FlakyProvider(Option<KeyPair<FlakyKey>>);

    impl FlakyProvider {
        fn new(failures: usize) -> Self {
            let key = |role| FlakyKey {
                key: FileKey::generate(SignAlgorithm::EcdsaP256Sha256, role).unwrap(),
                failures: Cell::new(failures),
            };
            FlakyProvider(Some(KeyPair {
                zsk: key(KeyRole::Zsk),
                ksk: key(KeyRole::Ksk),
            }))
        }
    }

    impl KeyProvider for FlakyProvider {
        type Key = FlakyKey;

        fn kind(&self) -> &'static str {
            "test"
        }

        fn get_keys(&mut self) -> std::result::Result<KeyPair<FlakyKey>, KeyError> {
            self.0.take().ok_or(KeyError::NoKeys {
                label: "test".into(),
            })
        }

        fn destroy_all_keys(&mut self) -> std::result::Result<(), KeyError> {
            self.0 = None;
            Ok(())
        }

        fn end(&mut self) -> std::result::Result<(), KeyError> {
            Ok(())
        }
    }

    #[test]
    fn retries_bad_signatures() {
        let config = config(SignAlgorithm::EcdsaP256Sha256, Denial::Nsec);

        let mut ctx = SigningContext::new(config.clone(), read(ZONE), StdRng::seed_from_u64(0));
        sign_zone(&mut ctx, &mut FlakyProvider::new(2)).unwrap();
        verify(&ctx.zone).unwrap();

        let mut ctx = SigningContext::new(config, read(ZONE), StdRng::seed_from_u64(0));
        let err = sign_zone(&mut ctx, &mut FlakyProvider::new(3)).unwrap_err();
        assert!(err.to_string().contains("after 3 attempts"));
    }

    //--- NSEC3 salts

    /// A random number generator that fills every request with a counter.
    struct CountingRng(u8);

    impl RngCore for CountingRng {
        fn next_u32(&mut self) -> u32 {
            let mut buf = [0; 4];
            self.fill_bytes(&mut buf);
            u32::from_be_bytes(buf)
        }

        fn next_u64(&mut self) -> u64 {
            let mut buf = [0; 8];
            self.fill_bytes(&mut buf);
            u64::from_be_bytes(buf)
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(self.0);
            self.0 = self.0.wrapping_add(1);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for CountingRng {}

    fn collision() -> Nsec3Error {
        Nsec3Error::HashCollision {
            first: name("a.example.com."),
            second: name("b.example.com."),
        }
    }

    #[test]
    fn salt_collision_is_retried() {
        let mut zone = read(ZONE);
        zone.sort();
        let mut salts = Vec::new();
        let records = nsec3_chain(
            &zone,
            &Nsec3Salt::Random(4),
            0,
            false,
            &mut CountingRng(0),
            |zone, config| {
                salts.push(config.salt.clone());
                if salts.len() == 1 {
                    Err(collision())
                } else {
                    generate_nsec3s(zone, config)
                }
            },
        )
        .unwrap();
        assert_eq!(salts, [[0; 4], [1; 4]]);
        assert_eq!(records.nsec3param.data().to_string(), "1 0 0 01010101");
    }

    #[test]
    fn salt_collision_gives_up() {
        let mut zone = read(ZONE);
        zone.sort();

        let mut attempts = 0;
        let err = nsec3_chain(
            &zone,
            &Nsec3Salt::Random(4),
            0,
            false,
            &mut CountingRng(0),
            |_, _| {
                attempts += 1;
                Err(collision())
            },
        )
        .unwrap_err();
        assert_eq!(attempts, MAX_SALT_ATTEMPTS);
        assert!(err.to_string().contains("NSEC3 hash collision"));

        let mut attempts = 0;
        let err = nsec3_chain(
            &zone,
            &Nsec3Salt::Fixed(vec![0xab]),
            0,
            false,
            &mut CountingRng(0),
            |_, _| {
                attempts += 1;
                Err(collision())
            },
        )
        .unwrap_err();
        assert_eq!(attempts, 1);
        assert!(err.to_string().contains("NSEC3 hash collision"));
    }
}
