use crate::metrics::Metric;
use crate::range::{Range, RangeError};
use crate::status::Status;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    Filesystem,
    Heap,
}

impl Family {
    pub const ALL: [Family; 2] = [Family::Filesystem, Family::Heap];

    pub fn as_str(self) -> &'static str {
        match self {
            Family::Filesystem => "fs",
            Family::Heap => "heap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Node,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CapacityField {
    Used,
    UsedPercent,
    Available,
    AvailablePercent,
}

impl CapacityField {
    pub const ALL: [CapacityField; 4] = [
        CapacityField::Used,
        CapacityField::UsedPercent,
        CapacityField::Available,
        CapacityField::AvailablePercent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CapacityField::Used => "used",
            CapacityField::UsedPercent => "used-percent",
            CapacityField::Available => "available",
            CapacityField::AvailablePercent => "available-percent",
        }
    }
}

/// Every metric an operator can put a threshold on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKey {
    Capacity {
        scope: Scope,
        family: Family,
        field: CapacityField,
    },
    CpuUsage,
    JvmGcCollectionTimeAvg,
    JvmGcCollectionTimePercent,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("неизвестная метрика '{0}'")]
pub struct UnknownMetricKey(pub String);

impl MetricKey {
    pub fn capacity(scope: Scope, family: Family, field: CapacityField) -> Self {
        MetricKey::Capacity {
            scope,
            family,
            field,
        }
    }

    pub fn all() -> Vec<MetricKey> {
        let mut keys = Vec::new();
        for scope in [Scope::Node, Scope::Total] {
            for family in Family::ALL {
                for field in CapacityField::ALL {
                    keys.push(MetricKey::capacity(scope, family, field));
                }
            }
        }
        keys.push(MetricKey::CpuUsage);
        keys.push(MetricKey::JvmGcCollectionTimeAvg);
        keys.push(MetricKey::JvmGcCollectionTimePercent);
        keys
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKey::Capacity {
                scope,
                family,
                field,
            } => {
                if *scope == Scope::Total {
                    f.write_str("total-")?;
                }
                write!(f, "{}-{}", family.as_str(), field.as_str())
            }
            MetricKey::CpuUsage => f.write_str("cpu-usage"),
            MetricKey::JvmGcCollectionTimeAvg => f.write_str("jvm-gc-collection-time-avg"),
            MetricKey::JvmGcCollectionTimePercent => {
                f.write_str("jvm-gc-collection-time-percent")
            }
        }
    }
}

impl FromStr for MetricKey {
    type Err = UnknownMetricKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MetricKey::all()
            .into_iter()
            .find(|key| key.to_string() == wanted)
            .ok_or_else(|| UnknownMetricKey(wanted.to_string()))
    }
}

impl Serialize for MetricKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MetricKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThresholdRange {
    pub warning: Option<Range>,
    pub critical: Option<Range>,
}

impl ThresholdRange {
    pub fn evaluate(&self, value: f64) -> Status {
        if self.critical.is_some_and(|r| r.alerts(value)) {
            Status::Critical
        } else if self.warning.is_some_and(|r| r.alerts(value)) {
            Status::Warning
        } else {
            Status::Ok
        }
    }
}

#[derive(Debug, Error)]
pub enum ThresholdError {
    #[error(transparent)]
    Key(#[from] UnknownMetricKey),
    #[error("порог '{key}': {source}")]
    Range { key: String, source: RangeError },
    #[error("ожидается KEY=RANGE, получено '{0}'")]
    Syntax(String),
}

/// Parses a `KEY=RANGE` command-line assignment.
pub fn parse_assignment(raw: &str) -> Result<(MetricKey, Range), ThresholdError> {
    let (key, range) = raw
        .split_once('=')
        .ok_or_else(|| ThresholdError::Syntax(raw.to_string()))?;
    let key: MetricKey = key.parse()?;
    let range = range.parse().map_err(|source| ThresholdError::Range {
        key: key.to_string(),
        source,
    })?;
    Ok((key, range))
}

#[derive(Debug, Clone, Default)]
pub struct Thresholds {
    ranges: BTreeMap<MetricKey, ThresholdRange>,
}

impl Thresholds {
    pub fn set_warning(&mut self, key: MetricKey, range: Range) {
        self.ranges.entry(key).or_default().warning = Some(range);
    }

    pub fn set_critical(&mut self, key: MetricKey, range: Range) {
        self.ranges.entry(key).or_default().critical = Some(range);
    }

    pub fn get(&self, key: MetricKey) -> ThresholdRange {
        self.ranges.get(&key).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn range_for(&self, metric: &Metric) -> ThresholdRange {
        metric.key.map(|key| self.get(key)).unwrap_or_default()
    }

    pub fn evaluate(&self, metric: &Metric) -> Status {
        self.range_for(metric).evaluate(metric.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Unit;

    fn range(s: &str) -> Range {
        s.parse().expect("диапазон должен разбираться")
    }

    fn both(warning: &str, critical: &str) -> ThresholdRange {
        ThresholdRange {
            warning: Some(range(warning)),
            critical: Some(range(critical)),
        }
    }

    #[test]
    fn key_names_round_trip() {
        for key in MetricKey::all() {
            let text = key.to_string();
            assert_eq!(text.parse::<MetricKey>(), Ok(key), "{text}");
        }
        assert_eq!(MetricKey::all().len(), 19);
        assert_eq!(
            "total-fs-used-percent".parse::<MetricKey>(),
            Ok(MetricKey::capacity(
                Scope::Total,
                Family::Filesystem,
                CapacityField::UsedPercent
            ))
        );
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert_eq!(
            "disk-used".parse::<MetricKey>(),
            Err(UnknownMetricKey("disk-used".to_string()))
        );
    }

    #[test]
    fn evaluation_levels() {
        let t = both("80", "90");
        assert_eq!(t.evaluate(50.0), Status::Ok);
        assert_eq!(t.evaluate(85.0), Status::Warning);
        assert_eq!(t.evaluate(95.0), Status::Critical);
    }

    #[test]
    fn critical_wins_even_when_warning_is_looser() {
        let t = both("0:100", "90");
        assert_eq!(t.evaluate(95.0), Status::Critical);
    }

    #[test]
    fn unset_range_is_always_ok() {
        let t = ThresholdRange::default();
        for v in [-1e12, 0.0, 1e12] {
            assert_eq!(t.evaluate(v), Status::Ok);
        }
        let only_critical = ThresholdRange {
            warning: None,
            critical: Some(range("90")),
        };
        assert_eq!(only_critical.evaluate(85.0), Status::Ok);
    }

    #[test]
    fn assignment_parsing() {
        let (key, r) = parse_assignment("cpu-usage=75").expect("корректное присваивание");
        assert_eq!(key, MetricKey::CpuUsage);
        assert_eq!(r, range("75"));
        assert!(matches!(
            parse_assignment("cpu-usage"),
            Err(ThresholdError::Syntax(_))
        ));
        assert!(matches!(
            parse_assignment("nope=1"),
            Err(ThresholdError::Key(_))
        ));
        assert!(matches!(
            parse_assignment("cpu-usage=x:y"),
            Err(ThresholdError::Range { .. })
        ));
    }

    #[test]
    fn metric_lookup_uses_key() {
        let mut thresholds = Thresholds::default();
        thresholds.set_critical(MetricKey::CpuUsage, range("90"));
        let cpu = Metric::new("node-1.cpu", 95.0, Unit::Percent).with_key(MetricKey::CpuUsage);
        let plain = Metric::new("node-1.heap.non_heap_used", 95.0, Unit::Megabytes);
        assert_eq!(thresholds.evaluate(&cpu), Status::Critical);
        assert_eq!(thresholds.evaluate(&plain), Status::Ok);
    }
}
