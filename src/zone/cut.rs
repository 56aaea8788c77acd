//! Zone cuts and the authority of names.

use std::collections::BTreeSet;

use domain::base::iana::Rtype;

use super::{StoredName, StoredRecord};

//------------ NameKind ------------------------------------------------------

/// The role of an owner name in the zone.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameKind {
    /// The apex of the zone.
    Apex,

    /// A name the zone is authoritative for.
    Authoritative,

    /// A delegation point, i.e., a non-apex name with NS records.
    Delegation,

    /// A name below a delegation point.
    ///
    /// Records here are glue or otherwise occluded data.
    Occluded,
}

//------------ ZoneCuts ------------------------------------------------------

/// The delegation points of a zone.
#[derive(Clone, Debug)]
pub struct ZoneCuts {
    apex: StoredName,
    cuts: BTreeSet<StoredName>,
}

impl ZoneCuts {
    /// Collects the zone cuts from the records of a zone.
    pub fn new(apex: &StoredName, records: &[StoredRecord]) -> Self {
        let cuts = records
            .iter()
            .filter(|record| record.rtype() == Rtype::NS && record.owner() != apex)
            .map(|record| record.owner().clone())
            .collect();
        ZoneCuts {
            apex: apex.clone(),
            cuts,
        }
    }

    pub fn apex(&self) -> &StoredName {
        &self.apex
    }

    pub fn is_delegation(&self, owner: &StoredName) -> bool {
        self.classify(owner) == NameKind::Delegation
    }

    /// Determines the role of a name.
    ///
    /// Names outside the zone are reported as occluded.
    pub fn classify(&self, owner: &StoredName) -> NameKind {
        if owner == &self.apex {
            return NameKind::Apex;
        }
        if !owner.ends_with(&self.apex) {
            return NameKind::Occluded;
        }
        let mut parent = owner.parent();
        while let Some(name) = parent {
            if name == self.apex {
                break;
            }
            if self.cuts.contains(&name) {
                return NameKind::Occluded;
            }
            parent = name.parent();
        }
        if self.cuts.contains(owner) {
            NameKind::Delegation
        } else {
            NameKind::Authoritative
        }
    }

    /// Returns whether an RRset of the given type at the owner gets signed.
    ///
    /// At delegation points, only the DS and NSEC RRsets are authoritative.
    /// RRSIG records are never signed themselves.
    pub fn is_signable(&self, owner: &StoredName, rtype: Rtype) -> bool {
        if rtype == Rtype::RRSIG {
            return false;
        }
        match self.classify(owner) {
            NameKind::Apex | NameKind::Authoritative => true,
            NameKind::Delegation => rtype == Rtype::DS || rtype == Rtype::NSEC,
            NameKind::Occluded => false,
        }
    }
}

//============ Tests =========================================================
