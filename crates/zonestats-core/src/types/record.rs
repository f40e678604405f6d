use hickory_proto::rr::{RData, Record, RecordType};
use hickory_proto::serialize::binary::BinEncodable;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::name::canonical_name;
use crate::error::{Result, ZoneStatsError};

/// A single resource record of the audited zone.
///
/// Produced once by a record source and shared read-only with every
/// aggregator afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    /// Canonical owner name
    pub owner: String,
    /// Record type as it appeared on the wire or in the file
    pub record_type: RecordType,
    /// The fields aggregators care about
    pub data: RecordData,
}

/// Type-specific record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    /// Delegation to a nameserver
    Ns {
        /// Canonical nameserver hostname
        target: String,
    },
    /// IPv4 address
    A(Ipv4Addr),
    /// IPv6 address
    Aaaa(Ipv6Addr),
    /// Delegation signer
    Ds {
        /// Key tag of the referenced DNSKEY
        key_tag: u16,
        /// DNSSEC algorithm number
        algorithm: u8,
        /// Digest type number
        digest_type: u8,
    },
    /// Any other record; only its type and owner matter
    Other,
}

impl ResourceRecord {
    /// Create a record, canonicalizing the owner name
    #[must_use]
    pub fn new(owner: &str, record_type: RecordType, data: RecordData) -> Self {
        Self {
            owner: canonical_name(owner),
            record_type,
            data,
        }
    }

    /// NS record pointing `owner` at `target`
    #[must_use]
    pub fn ns(owner: &str, target: &str) -> Self {
        Self::new(
            owner,
            RecordType::NS,
            RecordData::Ns {
                target: canonical_name(target),
            },
        )
    }

    /// A or AAAA record, depending on the address family
    #[must_use]
    pub fn address(owner: &str, address: IpAddr) -> Self {
        match address {
            IpAddr::V4(v4) => Self::new(owner, RecordType::A, RecordData::A(v4)),
            IpAddr::V6(v6) => Self::new(owner, RecordType::AAAA, RecordData::Aaaa(v6)),
        }
    }

    /// DS record
    #[must_use]
    pub fn ds(owner: &str, key_tag: u16, algorithm: u8, digest_type: u8) -> Self {
        Self::new(
            owner,
            RecordType::DS,
            RecordData::Ds {
                key_tag,
                algorithm,
                digest_type,
            },
        )
    }

    /// Record of any other type
    #[must_use]
    pub fn other(owner: &str, record_type: RecordType) -> Self {
        Self::new(owner, record_type, RecordData::Other)
    }

    /// Address carried by an A or AAAA record
    #[must_use]
    pub const fn ip(&self) -> Option<IpAddr> {
        match self.data {
            RecordData::A(v4) => Some(IpAddr::V4(v4)),
            RecordData::Aaaa(v6) => Some(IpAddr::V6(v6)),
            _ => None,
        }
    }

    /// Mnemonic of the record type, `None` when the type code is unassigned
    #[must_use]
    pub fn type_name(&self) -> Option<String> {
        match self.record_type {
            RecordType::Unknown(_) => None,
            rtype => Some(rtype.to_string()),
        }
    }

    /// Convert a parsed `hickory-proto` record.
    ///
    /// DS fields are read from the RDATA wire form, so the conversion does
    /// not depend on how the parser represented the DS payload.
    pub fn from_hickory(record: &Record) -> Result<Self> {
        let owner = canonical_name(&record.name().to_ascii());
        let record_type = record.record_type();

        let data = match record.data() {
            RData::NS(ns) => RecordData::Ns {
                target: canonical_name(&ns.0.to_ascii()),
            },
            RData::A(a) => RecordData::A(a.0),
            RData::AAAA(aaaa) => RecordData::Aaaa(aaaa.0),
            rdata if record_type == RecordType::DS => decode_ds(&owner, rdata)?,
            _ => RecordData::Other,
        };

        Ok(Self {
            owner,
            record_type,
            data,
        })
    }
}

fn decode_ds(owner: &str, rdata: &RData) -> Result<RecordData> {
    let malformed = |reason: String| ZoneStatsError::MalformedRecord {
        owner: owner.to_string(),
        rtype: RecordType::DS.to_string(),
        reason,
    };

    let wire = rdata.to_bytes().map_err(|e| malformed(e.to_string()))?;
    if wire.len() < 4 {
        return Err(malformed(format!("rdata is {} bytes", wire.len())));
    }

    Ok(RecordData::Ds {
        key_tag: u16::from_be_bytes([wire[0], wire[1]]),
        algorithm: wire[2],
        digest_type: wire[3],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::rdata::{A, NS, NULL};
    use hickory_proto::rr::Name;

    #[test]
    fn test_from_hickory_ns() {
        let record = Record::from_rdata(
            Name::from_ascii("Example.SE.").unwrap(),
            3600,
            RData::NS(NS(Name::from_ascii("NS1.Example.SE.").unwrap())),
        );
        let rr = ResourceRecord::from_hickory(&record).unwrap();
        assert_eq!(rr.owner, "example.se.");
        assert_eq!(rr.record_type, RecordType::NS);
        assert_eq!(
            rr.data,
            RecordData::Ns {
                target: "ns1.example.se.".into()
            }
        );
    }

    #[test]
    fn test_from_hickory_a() {
        let record = Record::from_rdata(
            Name::from_ascii("ns1.example.se.").unwrap(),
            3600,
            RData::A(A::new(192, 0, 2, 1)),
        );
        let rr = ResourceRecord::from_hickory(&record).unwrap();
        assert_eq!(rr.ip(), Some("192.0.2.1".parse().unwrap()));
    }

    #[test]
    fn test_from_hickory_ds_wire() {
        // key tag 12345, algorithm 13, digest type 2, then digest bytes
        let wire = vec![0x30, 0x39, 13, 2, 0xde, 0xad, 0xbe, 0xef];
        let record = Record::from_rdata(
            Name::from_ascii("signed.se.").unwrap(),
            3600,
            RData::Unknown {
                code: RecordType::DS,
                rdata: NULL::with(wire),
            },
        );
        let rr = ResourceRecord::from_hickory(&record).unwrap();
        assert_eq!(
            rr.data,
            RecordData::Ds {
                key_tag: 12345,
                algorithm: 13,
                digest_type: 2
            }
        );
    }

    #[test]
    fn test_type_name() {
        assert_eq!(
            ResourceRecord::other("se.", RecordType::SOA).type_name().as_deref(),
            Some("SOA")
        );
        assert_eq!(
            ResourceRecord::other("se.", RecordType::Unknown(65280)).type_name(),
            None
        );
    }

    #[test]
    fn test_address_constructor() {
        let rr = ResourceRecord::address("ns.se", "2001:db8::1".parse().unwrap());
        assert_eq!(rr.record_type, RecordType::AAAA);
        assert_eq!(rr.owner, "ns.se.");
    }
}
