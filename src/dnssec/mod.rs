//! The DNSSEC engine.
//!
//! The modules here operate on a [`Zone`][crate::zone::Zone] in canonical
//! order. [`nsec`] and [`nsec3`] build the authenticated denial of
//! existence records, [`zonemd`] computes and checks zone digests,
//! [`signer`] runs the whole signing pipeline, and [`verifier`] checks the
//! result. The primitives of both signing and verification are in
//! [`crypto`].

use bytes::Bytes;
use domain::base::iana::Rtype;
use domain::base::Ttl;
use domain::dep::octseq::builder::infallible;
use domain::rdata::dnssec::{ProtoRrsig, RtypeBitmap};

use crate::zone::{Rrset, StoredName};

pub mod crypto;
pub mod nsec;
pub mod nsec3;
pub mod signer;
pub mod verifier;
pub mod zonemd;

/// Returns the data signed by an RRSIG record for an RRset.
///
/// This is the RRSIG RDATA without the signature followed by the records
/// of the RRset in canonical form and order, each with the original TTL
/// of the RRSIG. See [RFC 4034, section 3.1.8.1].
///
/// `original_ttl` must be the one given to `rrsig`.
///
/// [RFC 4034, section 3.1.8.1]: https://www.rfc-editor.org/rfc/rfc4034#section-3.1.8.1
pub fn signed_data(
    rrsig: &ProtoRrsig<StoredName>,
    original_ttl: Ttl,
    rrset: &Rrset,
) -> Vec<u8> {
    let mut res = Vec::new();
    infallible(rrsig.compose_canonical(&mut res));
    rrset.compose_canonical(original_ttl, &mut res);
    res
}

/// Builds the type bitmap of an NSEC or NSEC3 record.
///
/// The types can be given in any order and more than once.
pub fn type_bitmap(types: impl IntoIterator<Item = Rtype>) -> RtypeBitmap<Bytes> {
    let mut builder = RtypeBitmap::<Bytes>::builder();
    for rtype in types {
        infallible(builder.add(rtype));
    }
    builder.finalize()
}
