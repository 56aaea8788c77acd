//! Partitioning of ordered records.
//!
//! Both iterators in this module expect the records in canonical order and
//! hand out runs of adjacent records. [`rrsets`] groups by owner, class and
//! type, which gives the RRsets to be signed. [`families`] ignores the type
//! and groups all records of an owner, which is what the denial of
//! existence records are built from.

use std::cmp::Ordering;
use std::convert::Infallible;

use domain::base::cmp::CanonicalOrd;
use domain::base::iana::{Class, Rtype};
use domain::base::name::ToName;
use domain::base::rdata::ComposeRecordData;
use domain::base::Ttl;
use domain::dep::octseq::builder::infallible;

use super::{StoredName, StoredRecord};

//------------ Rrset ---------------------------------------------------------

/// A set of records sharing owner, class and type.
#[derive(Clone, Copy, Debug)]
pub struct Rrset<'a> {
    records: &'a [StoredRecord],
}

impl<'a> Rrset<'a> {
    /// Creates an RRset from a non-empty slice of records.
    ///
    /// Returns `None` if the slice is empty.
    pub fn new(records: &'a [StoredRecord]) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Rrset { records })
        }
    }

    pub fn owner(&self) -> &'a StoredName {
        self.first().owner()
    }

    pub fn class(&self) -> Class {
        self.first().class()
    }

    pub fn rtype(&self) -> Rtype {
        self.first().rtype()
    }

    /// Returns the TTL of the RRset.
    ///
    /// This is the TTL of the first record. Signing makes sure all records
    /// agree.
    pub fn ttl(&self) -> Ttl {
        self.first().ttl()
    }

    pub fn records(&self) -> &'a [StoredRecord] {
        self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a StoredRecord> {
        self.records.iter()
    }

    fn first(&self) -> &'a StoredRecord {
        // Never empty, see `new`.
        &self.records[0]
    }

    /// Appends the RRset in the form used as signature input.
    ///
    /// All records are written in canonical form with the given TTL in
    /// canonical order. Duplicate records are included only once, as
    /// required by [RFC 4034, section 6.3].
    ///
    /// [RFC 4034, section 6.3]: https://www.rfc-editor.org/rfc/rfc4034#section-6.3
    pub fn compose_canonical(&self, ttl: Ttl, target: &mut Vec<u8>) {
        let mut records: Vec<_> = self.records.iter().collect();
        records.sort_by(|left, right| left.data().canonical_cmp(right.data()));
        records.dedup_by(|left, right| {
            left.data().canonical_cmp(right.data()) == Ordering::Equal
        });
        for record in records {
            compose_canonical(record, ttl, target);
        }
    }
}

//------------ Canonical Wire Format -----------------------------------------

/// Appends the canonical wire format of a record with the given TTL.
///
/// This is the form defined in [RFC 4034, section 6.2]: the owner name
/// and the names in the record data lowercased and uncompressed.
///
/// [RFC 4034, section 6.2]: https://www.rfc-editor.org/rfc/rfc4034#section-6.2
pub fn compose_canonical(record: &StoredRecord, ttl: Ttl, target: &mut Vec<u8>) {
    infallible(try_compose_canonical(record, ttl, target))
}

fn try_compose_canonical(
    record: &StoredRecord,
    ttl: Ttl,
    target: &mut Vec<u8>,
) -> Result<(), Infallible> {
    record.owner().compose_canonical(target)?;
    record.rtype().compose(target)?;
    record.class().compose(target)?;
    ttl.compose(target)?;
    record.data().compose_canonical_len_rdata(target)
}

//------------ Iterators -----------------------------------------------------

/// Returns an iterator over the RRsets of canonically ordered records.
pub fn rrsets(records: &[StoredRecord]) -> impl Iterator<Item = Rrset<'_>> {
    Runs::new(records, |left, right| {
        left.owner() == right.owner()
            && left.class() == right.class()
            && left.rtype() == right.rtype()
    })
    .map(|records| Rrset { records })
}

/// Returns an iterator over all records sharing owner and class.
pub fn families(records: &[StoredRecord]) -> impl Iterator<Item = &[StoredRecord]> {
    Runs::new(records, |left, right| {
        left.owner() == right.owner() && left.class() == right.class()
    })
}

/// Runs of adjacent records for which a predicate holds.
struct Runs<'a, F> {
    records: &'a [StoredRecord],
    same: F,
}

impl<'a, F: Fn(&StoredRecord, &StoredRecord) -> bool> Runs<'a, F> {
    fn new(records: &'a [StoredRecord], same: F) -> Self {
        Runs { records, same }
    }
}

impl<'a, F: Fn(&StoredRecord, &StoredRecord) -> bool> Iterator for Runs<'a, F> {
    type Item = &'a [StoredRecord];

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.records.first()?;
        let len = self
            .records
            .iter()
            .position(|record| !(self.same)(first, record))
            .unwrap_or(self.records.len());
        let (head, tail) = self.records.split_at(len);
        self.records = tail;
        Some(head)
    }
}

//============ Tests =========================================================
