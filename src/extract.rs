use crate::capacity::{bytes_to_mb, Capacity};
use crate::metrics::{round_to, Metric, Unit};
use crate::snapshot::{GcCollector, NodeStats};
use crate::threshold::{CapacityField, Family, MetricKey, Scope};

pub const DEFAULT_STRIP_PREFIXES: [&str; 2] = ["elasticsearch-", "es-"];

const GC_PRECISION: i32 = 5;

/// Removes the first matching prefix, in configured order.
pub fn strip_prefix<'a>(name: &'a str, prefixes: &[String]) -> &'a str {
    prefixes
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix.as_str()))
        .unwrap_or(name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectorMetrics {
    pub name: String,
    pub count: u64,
    pub time_ms: u64,
    pub avg_secs: Option<f64>,
    pub uptime_percent: Option<f64>,
}

impl CollectorMetrics {
    pub fn new(name: &str, gc: &GcCollector, uptime_ms: u64) -> Self {
        let time = gc.collection_time_in_millis as f64;
        let avg_secs = (gc.collection_count > 0)
            .then(|| round_to(time / gc.collection_count as f64 / 1000.0, GC_PRECISION));
        let uptime_percent =
            (uptime_ms > 0).then(|| round_to(100.0 * time / uptime_ms as f64, GC_PRECISION));
        Self {
            name: name.to_string(),
            count: gc.collection_count,
            time_ms: gc.collection_time_in_millis,
            avg_secs,
            uptime_percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeMetrics {
    pub name: String,
    pub fs: Capacity,
    pub heap: Capacity,
    pub non_heap_used: f64,
    pub cpu_percent: f64,
    pub collectors: Vec<CollectorMetrics>,
}

impl NodeMetrics {
    pub fn from_stats(stats: &NodeStats, prefixes: &[String]) -> Self {
        let fs_total = &stats.fs.total;
        let fs_used = fs_total
            .total_in_bytes
            .saturating_sub(fs_total.available_in_bytes);
        let mem = &stats.jvm.mem;
        let collectors = stats
            .jvm
            .gc
            .collectors
            .iter()
            .map(|(name, gc)| CollectorMetrics::new(name, gc, stats.jvm.uptime_in_millis))
            .collect();

        Self {
            name: strip_prefix(&stats.name, prefixes).to_string(),
            fs: Capacity::from_bytes(fs_total.total_in_bytes, fs_used),
            heap: Capacity::from_bytes(mem.heap_max_in_bytes, mem.heap_used_in_bytes),
            non_heap_used: bytes_to_mb(mem.non_heap_used_in_bytes),
            cpu_percent: stats.process.cpu.percent,
            collectors,
        }
    }

    pub fn capacity(&self, family: Family) -> &Capacity {
        match family {
            Family::Filesystem => &self.fs,
            Family::Heap => &self.heap,
        }
    }

    pub fn metrics(&self) -> Vec<Metric> {
        let mut out = Vec::new();
        for family in Family::ALL {
            out.extend(node_capacity_metrics(
                &self.name,
                family,
                self.capacity(family),
            ));
        }
        out.push(Metric::new(
            format!("{}.non_heap.used", self.name),
            self.non_heap_used,
            Unit::Megabytes,
        ));
        out.push(
            Metric::percent(format!("{}.cpu", self.name), self.cpu_percent)
                .with_key(MetricKey::CpuUsage),
        );

        for gc in &self.collectors {
            let base = format!("{}.gc.{}", self.name, gc.name);
            out.push(Metric::new(
                format!("{base}.count"),
                gc.count as f64,
                Unit::Counter,
            ));
            out.push(Metric::new(
                format!("{base}.time"),
                gc.time_ms as f64,
                Unit::Milliseconds,
            ));
            if let Some(avg) = gc.avg_secs {
                out.push(
                    Metric::new(format!("{base}.time_avg"), avg, Unit::Seconds)
                        .with_key(MetricKey::JvmGcCollectionTimeAvg),
                );
            }
            if let Some(pct) = gc.uptime_percent {
                out.push(
                    Metric::percent(format!("{base}.time_percent"), pct)
                        .with_key(MetricKey::JvmGcCollectionTimePercent),
                );
            }
        }
        out
    }
}

fn node_capacity_metrics(node: &str, family: Family, capacity: &Capacity) -> Vec<Metric> {
    let base = format!("{node}.{}", family.as_str());
    let key = |field| MetricKey::capacity(Scope::Node, family, field);
    let size = capacity.size();
    vec![
        Metric::new(format!("{base}.size"), size, capacity.unit()),
        Metric::new(format!("{base}.used"), capacity.used(), capacity.unit())
            .with_bounds(0.0, size)
            .with_key(key(CapacityField::Used)),
        Metric::new(
            format!("{base}.available"),
            capacity.available(),
            capacity.unit(),
        )
        .with_bounds(0.0, size)
        .with_key(key(CapacityField::Available)),
        Metric::percent(format!("{base}.used_percent"), capacity.used_percent())
            .with_key(key(CapacityField::UsedPercent)),
        Metric::percent(
            format!("{base}.available_percent"),
            capacity.available_percent(),
        )
        .with_key(key(CapacityField::AvailablePercent)),
    ]
}
