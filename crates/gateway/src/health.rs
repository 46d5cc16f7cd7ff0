//! Downstream service health tracking — passive monitoring based on real
//! proxied request outcomes, no synthetic pings.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;

const WINDOW_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Ok,
    Degraded,
    Down,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthEntry {
    pub name: String,
    pub status: ServiceStatus,
    pub avg_latency_ms: u64,
    pub requests_ok: u32,
    pub requests_err: u32,
}

struct InternalEntry {
    window: VecDeque<(Instant, bool, u64)>,
}

impl InternalEntry {
    fn new() -> Self {
        Self { window: VecDeque::new() }
    }

    fn prune(&mut self) {
        let cutoff = Instant::now() - std::time::Duration::from_secs(WINDOW_SECS);
        while self.window.front().is_some_and(|(t, _, _)| *t < cutoff) {
            self.window.pop_front();
        }
    }

    fn status(&self) -> ServiceStatus {
        if self.window.is_empty() {
            return ServiceStatus::Unknown;
        }
        let total = self.window.len() as f64;
        let ok = self.window.iter().filter(|(_, ok, _)| *ok).count() as f64;
        let rate = ok / total;
        if rate > 0.8 {
            ServiceStatus::Ok
        } else if rate >= 0.5 {
            ServiceStatus::Degraded
        } else {
            ServiceStatus::Down
        }
    }

    fn avg_latency_ms(&self) -> u64 {
        if self.window.is_empty() {
            return 0;
        }
        self.window.iter().map(|(_, _, l)| l).sum::<u64>() / self.window.len() as u64
    }
}

/// Gates outbound proxy traffic: a service classified `Down` fails fast with
/// `upstream_unavailable` instead of waiting out a connect timeout.
pub struct HealthGate {
    entries: DashMap<String, InternalEntry>,
}

impl HealthGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { entries: DashMap::new() })
    }

    pub fn record_success(&self, service: &str, latency_ms: u64) {
        let mut e = self.entries.entry(service.to_string()).or_insert_with(InternalEntry::new);
        e.prune();
        e.window.push_back((Instant::now(), true, latency_ms));
    }

    pub fn record_error(&self, service: &str) {
        let mut e = self.entries.entry(service.to_string()).or_insert_with(InternalEntry::new);
        e.prune();
        e.window.push_back((Instant::now(), false, 0));
    }

    pub fn is_down(&self, service: &str) -> bool {
        self.entries
            .get(service)
            .map(|e| e.status() == ServiceStatus::Down)
            .unwrap_or(false)
    }

    pub fn all_entries(&self) -> Vec<ServiceHealthEntry> {
        self.entries
            .iter()
            .map(|e| ServiceHealthEntry {
                name: e.key().clone(),
                status: e.value().status(),
                avg_latency_ms: e.value().avg_latency_ms(),
                requests_ok: e.value().window.iter().filter(|(_, ok, _)| *ok).count() as u32,
                requests_err: e.value().window.iter().filter(|(_, ok, _)| !*ok).count() as u32,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mostly_failing_service_is_down() {
        let gate = HealthGate::new();
        for _ in 0..8 {
            gate.record_error("ingestion");
        }
        for _ in 0..2 {
            gate.record_success("ingestion", 10);
        }
        assert!(gate.is_down("ingestion"));
    }

    #[test]
    fn unseen_service_is_not_down() {
        let gate = HealthGate::new();
        assert!(!gate.is_down("lesson"));
    }

    #[test]
    fn mostly_ok_service_is_not_down() {
        let gate = HealthGate::new();
        for _ in 0..9 {
            gate.record_success("quiz", 20);
        }
        gate.record_error("quiz");
        assert!(!gate.is_down("quiz"));
    }
}
