//! Canonical record ordering.
//!
//! From [RFC 4034, section 6.3]:
//!
//! > For the purposes of DNS security, RRs with the same owner name,
//! > class, and type are sorted by treating the RDATA portion of the
//! > canonical form of each RR as a left-justified unsigned octet sequence
//! > in which the absence of an octet sorts before a zero octet.
//!
//! The ordering itself is `domain`'s [`CanonicalOrd`] for records: class,
//! then owner name in canonical name order, then type, and finally the
//! canonical record data. A zone only ever has one class.
//!
//! [RFC 4034, section 6.3]: https://www.rfc-editor.org/rfc/rfc4034#section-6.3

use std::cmp::Ordering;

use domain::base::cmp::CanonicalOrd;

use super::StoredRecord;

/// Sorts records into canonical order.
///
/// Duplicates are kept.
pub fn sort(records: &mut [StoredRecord]) {
    records.sort_by(|left, right| left.canonical_cmp(right));
}

/// Returns whether the records are in canonical order.
pub fn is_sorted(records: &[StoredRecord]) -> bool {
    records
        .windows(2)
        .all(|pair| pair[0].canonical_cmp(&pair[1]) != Ordering::Greater)
}

//============ Tests =========================================================
