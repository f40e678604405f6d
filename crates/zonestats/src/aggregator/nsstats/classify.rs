//! Delegation health classification.

use std::collections::HashSet;
use std::net::IpAddr;

use super::registry::HostEntry;

/// Counters over all nameserver hosts of a zone.
///
/// `in_tld_no_glue + in_tld_glue == in_tld` and `in_tld + ex_tld` is the
/// number of hosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelegationStats {
    /// Hosts inside the zone
    pub in_tld: u64,
    /// In-zone hosts without glue
    pub in_tld_no_glue: u64,
    /// ...of which nothing resolved
    pub in_tld_no_glue_no_ip: u64,
    /// In-zone hosts with glue
    pub in_tld_glue: u64,
    /// ...of which nothing resolved
    pub in_tld_glue_no_ip: u64,
    /// ...of which something resolved
    pub in_tld_glue_ip: u64,
    /// ...and glue and resolved addresses differ
    pub in_tld_glue_ip_mismatch: u64,
    /// Hosts outside the zone
    pub ex_tld: u64,
    /// ...of which nothing resolved
    pub ex_tld_no_ip: u64,
}

impl DelegationStats {
    /// Classify every host.
    pub fn classify<'a>(hosts: impl IntoIterator<Item = &'a HostEntry>) -> Self {
        let mut stats = Self::default();
        for host in hosts {
            let state = host.snapshot();
            stats.add(host.in_bailiwick(), &state.glue, &state.resolved);
        }
        stats
    }

    fn add(&mut self, in_bailiwick: bool, glue: &HashSet<IpAddr>, resolved: &HashSet<IpAddr>) {
        if !in_bailiwick {
            self.ex_tld += 1;
            if resolved.is_empty() {
                self.ex_tld_no_ip += 1;
            }
            return;
        }

        self.in_tld += 1;
        if glue.is_empty() {
            self.in_tld_no_glue += 1;
            if resolved.is_empty() {
                self.in_tld_no_glue_no_ip += 1;
            }
        } else {
            self.in_tld_glue += 1;
            if resolved.is_empty() {
                self.in_tld_glue_no_ip += 1;
            } else {
                self.in_tld_glue_ip += 1;
                if glue_mismatch(glue, resolved) {
                    self.in_tld_glue_ip_mismatch += 1;
                }
            }
        }
    }

    /// Field names and values in report order
    #[must_use]
    pub const fn fields(&self) -> [(&'static str, u64); 9] {
        [
            ("InTld", self.in_tld),
            ("InTldNoGlue", self.in_tld_no_glue),
            ("InTldNoGlueNoIp", self.in_tld_no_glue_no_ip),
            ("InTldGlue", self.in_tld_glue),
            ("InTldGlueNoIp", self.in_tld_glue_no_ip),
            ("InTldGlueIp", self.in_tld_glue_ip),
            ("InTldGlueIpMismatch", self.in_tld_glue_ip_mismatch),
            ("ExTld", self.ex_tld),
            ("ExTldNoIp", self.ex_tld_no_ip),
        ]
    }
}

/// True unless every glue address resolved and every resolved address is
/// glue.
#[must_use]
pub fn glue_mismatch(glue: &HashSet<IpAddr>, resolved: &HashSet<IpAddr>) -> bool {
    glue.symmetric_difference(resolved).next().is_some()
}
