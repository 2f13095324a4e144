//! ## minnespool-telemetry::metrics
//! **Prometheus exporter for allocator activity**
//!
//! ### Expectations:
//! - Counters for every placement outcome, gauge for open pools
//! - Request-size histogram coarse enough to stay cheap
//! - Text exposition rendered on demand, no background scrape server

use prometheus::{Counter, Gauge, Histogram, HistogramOpts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub allocations: Counter,
    pub releases: Counter,
    pub placement_failures: Counter,
    pub open_pools: Gauge,
    pub request_bytes: Histogram,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let registry = Registry::new();
        let allocations =
            Counter::new("minnespool_allocations_total", "Placed allocations").unwrap();
        let releases =
            Counter::new("minnespool_releases_total", "Released allocations").unwrap();
        let placement_failures = Counter::new(
            "minnespool_placement_failures_total",
            "Requests no gap could satisfy",
        )
        .unwrap();
        let open_pools = Gauge::new("minnespool_open_pools", "Pools currently open").unwrap();

        let request_bytes = Histogram::with_opts(
            HistogramOpts::new("minnespool_request_bytes", "Requested allocation sizes")
                .buckets(vec![64.0, 256.0, 1024.0, 4096.0, 16384.0]),
        )
        .unwrap();

        registry.register(Box::new(allocations.clone())).unwrap();
        registry.register(Box::new(releases.clone())).unwrap();
        registry
            .register(Box::new(placement_failures.clone()))
            .unwrap();
        registry.register(Box::new(open_pools.clone())).unwrap();
        registry.register(Box::new(request_bytes.clone())).unwrap();

        Self {
            registry,
            allocations,
            releases,
            placement_failures,
            open_pools,
            request_bytes,
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap())
    }

    pub fn inc_allocations(&self) {
        self.allocations.inc();
    }

    pub fn inc_releases(&self) {
        self.releases.inc();
    }

    pub fn inc_placement_failures(&self) {
        self.placement_failures.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_show_up_in_exposition() {
        let metrics = MetricsRecorder::new();
        metrics.inc_allocations();
        metrics.inc_allocations();
        metrics.inc_releases();
        metrics.request_bytes.observe(512.0);
        metrics.open_pools.set(1.0);

        let dump = metrics.gather_metrics().unwrap();
        assert!(dump.contains("minnespool_allocations_total 2"));
        assert!(dump.contains("minnespool_releases_total 1"));
        assert!(dump.contains("minnespool_open_pools 1"));
    }
}
