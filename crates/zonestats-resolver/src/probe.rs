//! Nameserver capability probe.
//!
//! One query per address: `version.bind. CH TXT` with an EDNS0 OPT record
//! (4096 byte payload) carrying an empty NSID option and a client cookie.
//! The reply tells us whether the server speaks EDNS0, whether it returns an
//! NSID, whether it answers cookies and what it claims as its version.

use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::opt::{EdnsCode, EdnsOption};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use std::fmt;
use std::net::IpAddr;

use crate::error::ResolverResult;

/// Advertised EDNS0 UDP payload size
pub const EDNS_PAYLOAD: u16 = 4096;

/// Query name of the CHAOS version query
pub const VERSION_BIND: &str = "version.bind.";

/// What an address answered to the capability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityProbeResult {
    /// Probed address
    pub address: IpAddr,
    /// Reply carried an OPT record
    pub edns0: bool,
    /// Server identifier from the NSID option, printable-escaped
    pub nsid: Option<String>,
    /// Reply carried a cookie option
    pub cookies: bool,
    /// Content of the `version.bind` TXT answer
    pub version_bind: Option<String>,
}

impl CapabilityProbeResult {
    /// Result with every capability absent
    #[must_use]
    pub const fn unsupported(address: IpAddr) -> Self {
        Self {
            address,
            edns0: false,
            nsid: None,
            cookies: false,
            version_bind: None,
        }
    }
}

/// Eight byte client cookie (RFC 7873), rendered as 16 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientCookie(pub [u8; 8]);

impl ClientCookie {
    /// Fresh random cookie
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl fmt::Display for ClientCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Build the probe query.
pub fn probe_query(id: u16, cookie: ClientCookie) -> ResolverResult<Message> {
    let mut query = Query::query(Name::from_ascii(VERSION_BIND)?, RecordType::TXT);
    query.set_query_class(DNSClass::CH);

    let mut edns = Edns::new();
    edns.set_max_payload(EDNS_PAYLOAD);
    edns.options_mut()
        .insert(EdnsOption::Unknown(u16::from(EdnsCode::NSID), Vec::new()));
    edns.options_mut()
        .insert(EdnsOption::Unknown(u16::from(EdnsCode::Cookie), cookie.0.to_vec()));

    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(false)
        .set_authentic_data(true)
        .add_query(query)
        .set_edns(edns);

    Ok(message)
}

/// Interpret a probe reply.
///
/// NOTIMP means the server rejects the query outright: nothing is reported.
/// Other error codes are still inspected, a REFUSED reply with an OPT
/// record proves EDNS0 support just as well.
#[must_use]
pub fn parse_probe_response(address: IpAddr, response: &Message) -> CapabilityProbeResult {
    let mut result = CapabilityProbeResult::unsupported(address);

    if response.response_code() == ResponseCode::NotImp {
        return result;
    }

    result.version_bind = response
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            RData::TXT(txt) => Some(
                txt.txt_data()
                    .iter()
                    .map(|chunk| String::from_utf8_lossy(chunk))
                    .collect::<String>(),
            ),
            _ => None,
        })
        .last();

    let Some(edns) = response.extensions().as_ref() else {
        return result;
    };
    result.edns0 = true;

    let options = edns.options();
    result.nsid = options.get(EdnsCode::NSID).and_then(|option| match option {
        EdnsOption::Unknown(_, payload) => Some(render_nsid(payload)),
        _ => None,
    });
    result.cookies = options.get(EdnsCode::Cookie).is_some();

    result
}

/// Render NSID payload bytes as text, escaping anything non-printable.
#[must_use]
pub fn render_nsid(payload: &[u8]) -> String {
    payload
        .iter()
        .flat_map(|byte| std::ascii::escape_default(*byte))
        .map(char::from)
        .collect()
}
