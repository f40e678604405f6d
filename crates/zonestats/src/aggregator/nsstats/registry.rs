//! Nameserver host registry.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;
use zonestats_core::{canonical_name, is_in_bailiwick};

/// Everything known about one nameserver host.
///
/// Record tasks add domains and glue, the host's lookup task adds resolved
/// addresses. All of it sits behind one lock per host.
#[derive(Debug)]
pub struct HostEntry {
    name: String,
    in_bailiwick: bool,
    state: Mutex<HostState>,
}

/// Point-in-time copy of a host's sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostState {
    /// Domains delegated to this host
    pub domains: HashSet<String>,
    /// Addresses from A/AAAA records in the zone
    pub glue: HashSet<IpAddr>,
    /// Addresses returned by the resolvers
    pub resolved: HashSet<IpAddr>,
}

impl HostEntry {
    fn new(name: String, origin: &str) -> Self {
        let in_bailiwick = is_in_bailiwick(&name, origin);
        Self {
            name,
            in_bailiwick,
            state: Mutex::new(HostState::default()),
        }
    }

    /// Canonical hostname
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the host lies inside the audited zone
    #[must_use]
    pub const fn in_bailiwick(&self) -> bool {
        self.in_bailiwick
    }

    /// Record that `domain` is delegated to this host
    pub fn add_domain(&self, domain: &str) {
        self.state.lock().domains.insert(domain.to_string());
    }

    /// Record an in-zone address for this host
    pub fn add_glue(&self, address: IpAddr) {
        self.state.lock().glue.insert(address);
    }

    /// Record addresses found by resolution
    pub fn add_resolved(&self, addresses: impl IntoIterator<Item = IpAddr>) {
        self.state.lock().resolved.extend(addresses);
    }

    /// Copy of the current sets
    #[must_use]
    pub fn snapshot(&self) -> HostState {
        self.state.lock().clone()
    }
}

/// One [`HostEntry`] per hostname, created on first sight.
#[derive(Debug)]
pub struct HostRegistry {
    origin: String,
    hosts: Mutex<HashMap<String, Arc<HostEntry>>>,
}

impl HostRegistry {
    /// Create a registry for the zone `origin`
    #[must_use]
    pub fn new(origin: &str) -> Self {
        Self {
            origin: canonical_name(origin),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Zone origin, canonical
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Fetch the entry for `hostname`, creating it if needed.
    ///
    /// The flag is true for exactly one caller per hostname: the one whose
    /// call created the entry.
    pub fn get_or_insert(&self, hostname: &str) -> (Arc<HostEntry>, bool) {
        let name = canonical_name(hostname);
        let mut hosts = self.hosts.lock();
        if let Some(entry) = hosts.get(&name) {
            return (Arc::clone(entry), false);
        }

        let entry = Arc::new(HostEntry::new(name.clone(), &self.origin));
        hosts.insert(name, Arc::clone(&entry));
        (entry, true)
    }

    /// Entry for `hostname`, if seen
    #[must_use]
    pub fn get(&self, hostname: &str) -> Option<Arc<HostEntry>> {
        self.hosts.lock().get(&canonical_name(hostname)).cloned()
    }

    /// Number of distinct hosts
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.lock().len()
    }

    /// Whether no host was seen
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.lock().is_empty()
    }

    /// All entries, in no particular order
    #[must_use]
    pub fn hosts(&self) -> Vec<Arc<HostEntry>> {
        self.hosts.lock().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_bailiwick_fixed_at_creation() {
        let registry = HostRegistry::new("se");
        let (inside, _) = registry.get_or_insert("NS1.Example.SE");
        let (outside, _) = registry.get_or_insert("ns.provider.net.");
        let (apex, _) = registry.get_or_insert("se.");

        assert_eq!(inside.name(), "ns1.example.se.");
        assert!(inside.in_bailiwick());
        assert!(!outside.in_bailiwick());
        assert!(apex.in_bailiwick());
    }

    #[test]
    fn test_get_or_insert_canonicalizes() {
        let registry = HostRegistry::new("se.");
        let (first, created) = registry.get_or_insert("ns1.example.se");
        assert!(created);
        let (second, created) = registry.get_or_insert("NS1.EXAMPLE.SE.");
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_insert_is_idempotent() {
        let registry = Arc::new(HostRegistry::new("se"));
        let created = Arc::new(AtomicUsize::new(0));

        let tasks = (0..400).map(|i| {
            let registry = Arc::clone(&registry);
            let created = Arc::clone(&created);
            tokio::spawn(async move {
                let (entry, fresh) = registry.get_or_insert(&format!("ns{}.example.se.", i % 10));
                if fresh {
                    created.fetch_add(1, Ordering::SeqCst);
                }
                entry.add_domain(&format!("d{i}.se."));
            })
        });
        for task in futures_util::future::join_all(tasks).await {
            task.unwrap();
        }

        assert_eq!(registry.len(), 10);
        assert_eq!(created.load(Ordering::SeqCst), 10);
        let total: usize = registry
            .hosts()
            .iter()
            .map(|h| h.snapshot().domains.len())
            .sum();
        assert_eq!(total, 400);
    }
}
