//! The data model of a zone.
//!
//! A [`Zone`] is a list of records together with its apex and SOA. The
//! records are those of `domain`: owner names are [`StoredName`]s and the
//! data is [`StoredRecordData`]. They are read from presentation format by
//! [`reader`] and written back by [`writer`]. Everything in between
//! operates on records in canonical order, see [`canonical`], partitioned
//! via [`rrset`].

use bytes::Bytes;
use domain::base::iana::{Class, Rtype};
use domain::base::name::{NameBuilder, PushError, PushNameError};
use domain::base::{Name, Record, Serial, Ttl};
use domain::rdata::{Soa, ZoneRecordData, Zonemd};

pub mod canonical;
pub mod cut;
pub mod reader;
pub mod rrset;
pub mod writer;

pub use self::cut::{NameKind, ZoneCuts};
pub use self::rrset::Rrset;

//------------ Type Aliases --------------------------------------------------

/// The owner names and names in record data of a zone.
pub type StoredName = Name<Bytes>;

/// The record data of a zone.
pub type StoredRecordData = ZoneRecordData<Bytes, StoredName>;

/// A record of a zone.
pub type StoredRecord = Record<StoredName, StoredRecordData>;

//------------ Zone ----------------------------------------------------------

/// A zone.
///
/// The SOA record is part of the records. Its data is also kept separately
/// so that it is available without searching, which is why it can only be
/// changed through [`Zone::set_serial`].
#[derive(Clone, Debug)]
pub struct Zone {
    apex: StoredName,
    class: Class,
    soa: Soa<StoredName>,
    soa_ttl: Ttl,
    records: Vec<StoredRecord>,
}

impl Zone {
    /// Creates a zone from its SOA record.
    ///
    /// Returns `None` if the record isn't an SOA record.
    pub fn new(soa: StoredRecord) -> Option<Self> {
        let ZoneRecordData::Soa(data) = soa.data() else {
            return None;
        };
        Some(Zone {
            apex: soa.owner().clone(),
            class: soa.class(),
            soa: data.clone(),
            soa_ttl: soa.ttl(),
            records: vec![soa],
        })
    }

    pub fn apex(&self) -> &StoredName {
        &self.apex
    }

    pub fn class(&self) -> Class {
        self.class
    }

    pub fn soa(&self) -> &Soa<StoredName> {
        &self.soa
    }

    pub fn soa_ttl(&self) -> Ttl {
        self.soa_ttl
    }

    /// Returns the SOA serial as a plain integer.
    pub fn serial(&self) -> u32 {
        self.soa.serial().into_int()
    }

    /// Returns the SOA record.
    pub fn soa_record(&self) -> StoredRecord {
        Record::new(
            self.apex.clone(),
            self.class,
            self.soa_ttl,
            ZoneRecordData::Soa(self.soa.clone()),
        )
    }

    /// Replaces the serial of the SOA.
    pub fn set_serial(&mut self, serial: u32) {
        let soa = &self.soa;
        self.soa = Soa::new(
            soa.mname().clone(),
            soa.rname().clone(),
            Serial(serial),
            soa.refresh(),
            soa.retry(),
            soa.expire(),
            soa.minimum(),
        );
        for record in &mut self.records {
            if is_apex_soa(&self.apex, record) {
                *record.data_mut() = ZoneRecordData::Soa(self.soa.clone());
            }
        }
    }

    /// Returns the TTL for NSEC and NSEC3 records.
    ///
    /// RFC 9077 updated RFC 4034 (NSEC) and RFC 5155 (NSEC3) to say that
    /// the "TTL of the NSEC(3) RR that is returned MUST be the lesser of
    /// the MINIMUM field of the SOA record and the TTL of the SOA itself".
    pub fn denial_ttl(&self) -> Ttl {
        self.soa.minimum().min(self.soa_ttl)
    }

    pub fn records(&self) -> &[StoredRecord] {
        &self.records
    }

    /// Gives mutable access to the records.
    ///
    /// The slice doesn't allow adding or removing records. The SOA record
    /// must not be changed.
    pub fn records_mut(&mut self) -> &mut [StoredRecord] {
        &mut self.records
    }

    /// Adds a record.
    ///
    /// Additional SOA records for the apex are dropped.
    pub fn push(&mut self, record: StoredRecord) {
        if !is_apex_soa(&self.apex, &record) {
            self.records.push(record)
        }
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = StoredRecord>) {
        for record in records {
            self.push(record)
        }
    }

    /// Keeps only the records for which the predicate holds.
    ///
    /// The SOA record is always kept.
    pub fn retain(&mut self, mut op: impl FnMut(&StoredRecord) -> bool) {
        let apex = &self.apex;
        self.records
            .retain(|record| is_apex_soa(apex, record) || op(record))
    }

    /// Sorts the records into canonical order.
    pub fn sort(&mut self) {
        canonical::sort(&mut self.records)
    }

    pub fn is_sorted(&self) -> bool {
        canonical::is_sorted(&self.records)
    }

    pub fn cuts(&self) -> ZoneCuts {
        ZoneCuts::new(&self.apex, &self.records)
    }

    /// Returns the ZONEMD records at the apex.
    pub fn zonemds(&self) -> impl Iterator<Item = &Zonemd<Bytes>> + '_ {
        self.records.iter().filter_map(move |record| match record.data() {
            ZoneRecordData::Zonemd(zonemd) if record.owner() == &self.apex => Some(zonemd),
            _ => None,
        })
    }
}

fn is_apex_soa(apex: &StoredName, record: &StoredRecord) -> bool {
    record.rtype() == Rtype::SOA && record.owner() == apex
}

//------------ Helpers -------------------------------------------------------

/// Returns the type covered if this is an RRSIG record.
pub fn covered_type(record: &StoredRecord) -> Option<Rtype> {
    match record.data() {
        ZoneRecordData::Rrsig(rrsig) => Some(rrsig.type_covered()),
        _ => None,
    }
}

/// Returns `name` with `label` added in front.
pub fn prepend_label(label: &[u8], name: &StoredName) -> Result<StoredName, PushError> {
    let mut builder = NameBuilder::new_bytes();
    builder.append_label(label)?;
    builder.append_origin(name).map_err(|err| match err {
        PushNameError::LongName => PushError::LongName,
        PushNameError::ShortBuf => PushError::ShortBuf,
    })
}

//============ Tests =========================================================
