//! Authenticated denial of existence using NSEC.
//!
//! See [RFC 4034, section 4] and [RFC 4035, section 2.3].
//!
//! [RFC 4034, section 4]: https://www.rfc-editor.org/rfc/rfc4034#section-4
//! [RFC 4035, section 2.3]: https://www.rfc-editor.org/rfc/rfc4035#section-2.3

use bytes::Bytes;
use domain::base::iana::Rtype;
use domain::base::name::ToName;
use domain::base::Record;
use domain::rdata::dnssec::RtypeBitmap;
use domain::rdata::{Nsec, ZoneRecordData};
use tracing::debug;

use super::type_bitmap;
use crate::zone::rrset::families;
use crate::zone::{NameKind, StoredName, StoredRecord, Zone};

/// Creates the NSEC chain of a zone.
///
/// The zone must be in canonical order. Every owner name the zone is
/// authoritative for and every delegation point gets one NSEC record
/// pointing to the next such name, with the last one pointing back to the
/// apex. Occluded names are left out. Next names are in canonical form.
///
/// The DNSKEY RRset doesn't exist yet at this point, so its type is added
/// to the bitmap of the apex.
pub fn generate_nsecs(zone: &Zone) -> Vec<StoredRecord> {
    let cuts = zone.cuts();
    let mut owners: Vec<(&StoredName, RtypeBitmap<Bytes>)> = Vec::new();
    for family in families(zone.records()) {
        let owner = family[0].owner();
        let present = family.iter().map(|record| record.rtype());
        let extra = [Rtype::RRSIG, Rtype::NSEC];
        let types = match cuts.classify(owner) {
            NameKind::Apex => type_bitmap(present.chain(extra).chain([Rtype::DNSKEY])),
            NameKind::Authoritative => type_bitmap(present.chain(extra)),
            NameKind::Delegation => type_bitmap(
                present
                    .filter(|rtype| *rtype == Rtype::NS || *rtype == Rtype::DS)
                    .chain(extra),
            ),
            NameKind::Occluded => continue,
        };
        owners.push((owner, types));
    }

    let ttl = zone.denial_ttl();
    let mut res = Vec::with_capacity(owners.len());
    for (i, (owner, types)) in owners.iter().enumerate() {
        let (next_name, _) = &owners[(i + 1) % owners.len()];
        res.push(Record::new(
            (*owner).clone(),
            zone.class(),
            ttl,
            ZoneRecordData::Nsec(Nsec::new(next_name.to_canonical_name(), types.clone())),
        ));
    }
    debug!("Generated {} NSEC records", res.len());
    res
}

//============ Tests =========================================================
