//! Nameserver and glue analysis.
//!
//! Every NS target and every A/AAAA owner becomes a host in the
//! [`HostRegistry`]. The first sighting of a host spawns its lookup task,
//! which resolves the name through the shared [`Resolver`] and probes each
//! address not probed before. [`Aggregator::finalize`] waits for all lookup
//! tasks and then classifies the hosts into [`DelegationStats`].

mod capability;
mod classify;
mod registry;

use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};
use zonestats_core::{RecordData, ResourceRecord, Result, SourceKind, ZoneStatsError};
use zonestats_resolver::Resolver;

use super::Aggregator;
use crate::emit::LineBuilder;

pub use capability::ProbeLedger;
pub use classify::{glue_mismatch, DelegationStats};
pub use registry::{HostEntry, HostRegistry, HostState};

/// Nameserver/glue analyzer.
pub struct NsStats {
    registry: Arc<HostRegistry>,
    resolver: Resolver,
    ledger: Option<Arc<ProbeLedger>>,
    lookups: Mutex<JoinSet<()>>,
    stats: Mutex<DelegationStats>,
}

impl std::fmt::Debug for NsStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NsStats")
            .field("origin", &self.registry.origin())
            .field("hosts", &self.registry.len())
            .field("probe", &self.ledger.is_some())
            .finish_non_exhaustive()
    }
}

impl NsStats {
    /// Analyzer for zone `origin`; `probe` enables capability probing
    #[must_use]
    pub fn new(origin: &str, resolver: Resolver, probe: bool) -> Self {
        Self {
            registry: Arc::new(HostRegistry::new(origin)),
            resolver,
            ledger: probe.then(Arc::default),
            lookups: Mutex::new(JoinSet::new()),
            stats: Mutex::new(DelegationStats::default()),
        }
    }

    /// Hosts seen so far
    #[must_use]
    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    /// Classification computed by finalize
    #[must_use]
    pub fn stats(&self) -> DelegationStats {
        *self.stats.lock()
    }

    /// Entry for `hostname`, spawning its lookup on first sight
    fn host(&self, hostname: &str) -> Arc<HostEntry> {
        let (entry, created) = self.registry.get_or_insert(hostname);
        if created {
            let host = Arc::clone(&entry);
            let resolver = self.resolver.clone();
            let ledger = self.ledger.clone();
            self.lookups
                .lock()
                .spawn(lookup_host(host, resolver, ledger));
        }
        entry
    }
}

/// Resolve one host, then probe the addresses no other host brought up.
async fn lookup_host(host: Arc<HostEntry>, resolver: Resolver, ledger: Option<Arc<ProbeLedger>>) {
    let addresses = resolver.resolve(host.name()).await;
    debug!(host = host.name(), count = addresses.len(), "host resolved");
    host.add_resolved(addresses.iter().copied());

    let Some(ledger) = ledger else {
        return;
    };
    let fresh = ledger.claim(&addresses);
    if fresh.is_empty() {
        return;
    }

    let results = join_all(
        fresh
            .into_iter()
            .map(|address| resolver.probe_capabilities(address)),
    )
    .await;
    ledger.record(results);
}

#[async_trait]
impl Aggregator for NsStats {
    fn name(&self) -> &'static str {
        "nsstats"
    }

    fn receive(&self, record: &ResourceRecord) -> Result<()> {
        match &record.data {
            RecordData::Ns { target } => self.host(target).add_domain(&record.owner),
            RecordData::A(_) | RecordData::Aaaa(_) => {
                if let Some(address) = record.ip() {
                    self.host(&record.owner).add_glue(address);
                }
            }
            RecordData::Ds { .. } | RecordData::Other => {}
        }
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        let mut lookups = std::mem::take(&mut *self.lookups.lock());
        info!(
            hosts = self.registry.len(),
            pending = lookups.len(),
            "waiting for host lookups"
        );
        while let Some(done) = lookups.join_next().await {
            done.map_err(|e| ZoneStatsError::Task(format!("host lookup: {e}")))?;
        }

        let hosts = self.registry.hosts();
        let stats = DelegationStats::classify(hosts.iter().map(|host| &**host));
        info!(
            in_tld = stats.in_tld,
            ex_tld = stats.ex_tld,
            mismatch = stats.in_tld_glue_ip_mismatch,
            "delegations classified"
        );
        *self.stats.lock() = stats;
        Ok(())
    }

    fn report(&self, zone: &str, source: SourceKind) -> String {
        let mut out = self
            .stats()
            .fields()
            .iter()
            .fold(LineBuilder::zone("Hosts", zone, source), |line, (key, value)| {
                line.int(key, *value)
            })
            .build();
        if let Some(ledger) = &self.ledger {
            out.push_str(&ledger.report(zone, source));
        }
        out
    }
}
