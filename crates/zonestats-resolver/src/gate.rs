//! Admission gate: caps the number of queries in flight.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::trace;

use crate::error::{ResolverError, ResolverResult};

/// Shared query pacer, one per resolver.
pub(crate) type Pacer = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Build a pacer allowing `per_second` queries per second.
pub(crate) fn pacer(per_second: NonZeroU32) -> Arc<Pacer> {
    Arc::new(RateLimiter::direct(Quota::per_second(per_second)))
}

/// Bounded admission gate for outgoing queries.
///
/// At most `limit` futures run inside [`AdmissionGate::run`] at any time;
/// further callers wait for a free slot. The slot is released when the
/// future completes, whatever its outcome.
#[derive(Clone)]
pub struct AdmissionGate {
    name: &'static str,
    limit: usize,
    permits: Arc<Semaphore>,
    pacer: Option<Arc<Pacer>>,
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("name", &self.name)
            .field("limit", &self.limit)
            .field("in_flight", &self.in_flight())
            .field("paced", &self.pacer.is_some())
            .finish()
    }
}

impl AdmissionGate {
    /// Create a gate with `limit` slots
    pub fn new(name: &'static str, limit: usize) -> ResolverResult<Self> {
        if limit == 0 {
            return Err(ResolverError::Config(format!(
                "{name} limit must be at least 1"
            )));
        }

        Ok(Self {
            name,
            limit,
            permits: Arc::new(Semaphore::new(limit)),
            pacer: None,
        })
    }

    /// Pace admissions through a shared rate limiter
    #[must_use]
    pub(crate) fn with_pacer(mut self, pacer: Arc<Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Gate name, used in logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Maximum number of concurrent admissions
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Number of slots currently taken
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.limit - self.permits.available_permits()
    }

    /// Run `query` once a slot is free.
    pub async fn run<F>(&self, query: F) -> ResolverResult<F::Output>
    where
        F: Future,
    {
        if let Some(pacer) = &self.pacer {
            pacer.until_ready().await;
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ResolverError::GateClosed(self.name))?;
        trace!(gate = self.name, in_flight = self.in_flight(), "slot acquired");

        Ok(query.await)
    }
}
