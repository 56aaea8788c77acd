//! Writing zones in presentation format.

use std::fmt;
use std::io;

use domain::base::iana::Rtype;

use super::{StoredRecord, Zone};

/// Writes the zone, one record per line.
///
/// The SOA record comes first, all other records follow in canonical
/// order. The zone must be sorted.
pub fn write_zone(zone: &Zone, target: &mut (impl io::Write + ?Sized)) -> io::Result<()> {
    debug_assert!(zone.is_sorted());
    let (soa, rest): (Vec<_>, Vec<_>) = zone
        .records()
        .iter()
        .partition(|record| record.rtype() == Rtype::SOA && record.owner() == zone.apex());
    for record in soa.into_iter().chain(rest) {
        writeln!(target, "{}", RecordLine(record))?;
    }
    Ok(())
}

//------------ RecordLine ----------------------------------------------------

/// A record formatted as a single line of a zone file.
///
/// The fields are separated by tabs and the owner name is absolute.
pub struct RecordLine<'a>(pub &'a StoredRecord);

impl fmt::Display for RecordLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            record.owner().fmt_with_dot(),
            record.ttl().as_secs(),
            record.class(),
            record.rtype(),
            record.data()
        )
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use domain::base::Ttl;
    use domain::rdata::{Ns, A};

    use super::*;
    use crate::zone::tests::{name, record, zone};

    #[test]
    fn soa_first() {
        let mut zone = zone("example.", 2024010100);
        zone.push(record("b.example.", "192.0.2.2".parse::<A>().unwrap()));
        zone.push(record("A.example.", "192.0.2.1".parse::<A>().unwrap()));
        zone.push(record("example.", Ns::new(name("ns1.example."))));
        for record in zone.records_mut() {
            record.set_ttl(Ttl::from_secs(300));
        }
        zone.sort();

        let mut out = Vec::new();
        write_zone(&zone, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "example.\t300\tIN\tSOA\tns1.example. hostmaster.example. 2024010100 10800 15 604800 3600\n\
             example.\t300\tIN\tNS\tns1.example.\n\
             A.example.\t300\tIN\tA\t192.0.2.1\n\
             b.example.\t300\tIN\tA\t192.0.2.2\n"
        );
    }
}
