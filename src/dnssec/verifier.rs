//! Verifying a signed zone.

use std::borrow::Cow;
use std::collections::BTreeMap;

use bytes::Bytes;
use domain::base::iana::Rtype;
use domain::base::Record;
use domain::rdata::dnssec::ProtoRrsig;
use domain::rdata::{Dnskey, Rrsig, ZoneRecordData};
use tracing::{debug, info, warn};

use crate::context::VerifyConfig;
use crate::error::{ensure, Context, Error, Result};
use crate::keys::KeyRole;
use crate::util::format_timestamp;
use crate::zone::rrset::rrsets;
use crate::zone::writer::RecordLine;
use crate::zone::{Rrset, StoredName, Zone};

use super::crypto::{ds_for, verify_signature};
use super::signed_data;
use super::zonemd::verify_digests;

//------------ VerifyStats ---------------------------------------------------

/// What a successful verification looked at.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct VerifyStats {
    /// The number of RRsets with valid signatures.
    pub rrsets: usize,

    /// The number of signatures checked.
    pub signatures: usize,

    /// The number of ZONEMD digests checked.
    pub digests: usize,
}

//------------ verify_zone ---------------------------------------------------

/// Verifies the signatures and digests of a zone.
///
/// Every RRset the zone is authoritative for must have at least one RRSIG
/// record and all its RRSIG records must be valid. The DNSKEY RRset is
/// checked against the KSKs, everything else against the ZSKs.
///
/// If the zone has ZONEMD records or `config` asks for one, the digests
/// are checked, too.
pub fn verify_zone(zone: &Zone, config: &VerifyConfig) -> Result<VerifyStats> {
    let zone = if zone.is_sorted() {
        Cow::Borrowed(zone)
    } else {
        let mut zone = zone.clone();
        zone.sort();
        Cow::Owned(zone)
    };
    let zone = zone.as_ref();

    let keys = ZoneKeys::collect(zone)?;
    for ksk in &keys.ksks {
        let ds = ds_for(zone.apex(), ksk).map_err(|err| format!("creating DS record: {err}"))?;
        let ds = Record::new(
            zone.apex().clone(),
            zone.class(),
            zone.soa().minimum(),
            ZoneRecordData::Ds(ds),
        );
        info!("{}", RecordLine(&ds));
    }

    let mut rrsigs: BTreeMap<(&StoredName, Rtype), Vec<&StoredRrsig>> = BTreeMap::new();
    for record in zone.records() {
        if let ZoneRecordData::Rrsig(rrsig) = record.data() {
            rrsigs
                .entry((record.owner(), rrsig.type_covered()))
                .or_default()
                .push(rrsig);
        }
    }

    let checker = SignatureChecker {
        apex: zone.apex(),
        threshold: config.threshold,
        keys: &keys,
    };
    let cuts = zone.cuts();
    let mut stats = VerifyStats::default();
    for rrset in rrsets(zone.records()) {
        if !cuts.is_signable(rrset.owner(), rrset.rtype()) {
            continue;
        }
        let Some(sigs) = rrsigs.get(&(rrset.owner(), rrset.rtype())) else {
            return Err(format!("{} {} is not signed", rrset.owner(), rrset.rtype()).into());
        };
        for rrsig in sigs {
            checker
                .check(&rrset, rrsig)
                .with_context(|| format!("verifying {} {}", rrset.owner(), rrset.rtype()))?;
        }
        stats.rrsets += 1;
        stats.signatures += sigs.len();
    }
    debug!(
        "Verified {} signatures over {} RRsets",
        stats.signatures, stats.rrsets
    );

    if config.digest.is_some() || zone.zonemds().next().is_some() {
        stats.digests = verify_digests(zone, config.digest)?;
    }
    Ok(stats)
}

type StoredRrsig = Rrsig<Bytes, StoredName>;

//------------ ZoneKeys ------------------------------------------------------

/// The DNSKEY records at the apex, split by role.
struct ZoneKeys<'a> {
    ksks: Vec<&'a Dnskey<Bytes>>,
    zsks: Vec<&'a Dnskey<Bytes>>,
}

impl<'a> ZoneKeys<'a> {
    fn collect(zone: &'a Zone) -> Result<Self> {
        let mut ksks = Vec::new();
        let mut zsks = Vec::new();
        for record in zone.records() {
            if record.owner() != zone.apex() {
                continue;
            }
            let ZoneRecordData::Dnskey(dnskey) = record.data() else {
                continue;
            };
            match KeyRole::of(dnskey) {
                Some(KeyRole::Ksk) => ksks.push(dnskey),
                Some(KeyRole::Zsk) => zsks.push(dnskey),
                None => debug!("Ignoring DNSKEY with flags {}", dnskey.flags()),
            }
        }
        ensure!(!ksks.is_empty(), "zone has no KSK");
        ensure!(!zsks.is_empty(), "zone has no ZSK");
        Ok(ZoneKeys { ksks, zsks })
    }

    /// Returns the keys that may have made a signature for an RRset type.
    ///
    /// For the DNSKEY RRset, these are the KSKs followed by the ZSKs.
    fn candidates(
        &self,
        rtype: Rtype,
        key_tag: u16,
    ) -> impl Iterator<Item = &'a Dnskey<Bytes>> + '_ {
        let ksks = if rtype == Rtype::DNSKEY {
            self.ksks.as_slice()
        } else {
            &[]
        };
        ksks.iter()
            .chain(self.zsks.iter())
            .copied()
            .filter(move |dnskey| dnskey.key_tag() == key_tag)
    }
}

//------------ SignatureChecker ----------------------------------------------

struct SignatureChecker<'a> {
    apex: &'a StoredName,
    threshold: u32,
    keys: &'a ZoneKeys<'a>,
}

impl SignatureChecker<'_> {
    /// Checks a single signature.
    ///
    /// If several keys share the key tag, one of them has to match.
    fn check(&self, rrset: &Rrset, rrsig: &StoredRrsig) -> Result<()> {
        let mut candidates = self
            .keys
            .candidates(rrset.rtype(), rrsig.key_tag())
            .peekable();
        if candidates.peek().is_none() {
            return Err(format!("no key with tag {}", rrsig.key_tag()).into());
        }
        let mut candidates = candidates
            .filter(|dnskey| dnskey.algorithm() == rrsig.algorithm())
            .peekable();
        if candidates.peek().is_none() {
            return Err(format!(
                "no key with tag {} and algorithm {}",
                rrsig.key_tag(),
                rrsig.algorithm()
            )
            .into());
        }
        if rrsig.signer_name() != self.apex {
            return Err(format!(
                "signer name {} is not the apex",
                rrsig.signer_name().fmt_with_dot()
            )
            .into());
        }
        // Plain integers, the timestamps themselves use serial arithmetic.
        let expiration = rrsig.expiration().into_int();
        let inception = rrsig.inception().into_int();
        if expiration < self.threshold {
            return Err(Error::expired(&format!(
                "signature expired at {}",
                format_timestamp(expiration)
            )));
        }
        if inception > expiration {
            return Err(format!(
                "signature inception {} is after its expiration {}",
                format_timestamp(inception),
                format_timestamp(expiration)
            )
            .into());
        }
        if rrsig.original_ttl() != rrset.ttl() {
            warn!(
                "Original TTL {} of the signature for {} {} differs from TTL {}",
                rrsig.original_ttl().as_secs(),
                rrset.owner(),
                rrset.rtype(),
                rrset.ttl().as_secs()
            );
        }

        let proto = ProtoRrsig::new(
            rrsig.type_covered(),
            rrsig.algorithm(),
            rrsig.labels(),
            rrsig.original_ttl(),
            rrsig.expiration(),
            rrsig.inception(),
            rrsig.key_tag(),
            rrsig.signer_name().clone(),
        );
        let data = signed_data(&proto, rrsig.original_ttl(), rrset);
        let mut last_err = None;
        for dnskey in candidates {
            match verify_signature(dnskey, &data, rrsig.signature().as_ref()) {
                Ok(()) => return Ok(()),
                Err(err) => last_err = Some(err),
            }
        }
        match last_err {
            Some(err) => Err(format!("signature by key {}: {err}", rrsig.key_tag()).into()),
            None => Err("no matching key".into()),
        }
    }
}

//============ Tests =========================================================
