use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct NodesStats {
    pub nodes: BTreeMap<String, NodeStats>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeStats {
    pub name: String,
    pub fs: FsStats,
    pub jvm: JvmStats,
    pub process: ProcessStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FsStats {
    pub total: FsTotal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FsTotal {
    pub total_in_bytes: u64,
    pub available_in_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JvmStats {
    pub mem: JvmMem,
    pub gc: JvmGc,
    pub uptime_in_millis: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JvmMem {
    pub heap_max_in_bytes: u64,
    pub heap_used_in_bytes: u64,
    pub non_heap_used_in_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JvmGc {
    pub collectors: BTreeMap<String, GcCollector>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcCollector {
    pub collection_count: u64,
    pub collection_time_in_millis: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessStats {
    pub cpu: ProcessCpu,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessCpu {
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Summary {
    pub total: u64,
    pub expired: u64,
    pub warning: u64,
    pub ok: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CertReport {
    pub summary: Summary,
    #[serde(default)]
    pub data: BTreeMap<String, BTreeMap<String, ComponentEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ComponentEntry {
    Certificates(Vec<CertRecord>),
    Meta(MetaRecord),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CertRecord {
    pub path: String,
    #[serde(alias = "daysRemaining")]
    pub days_remaining: i64,
    pub expiry: String,
    #[serde(default)]
    pub health: Health,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Ok,
    Warning,
    #[default]
    #[serde(alias = "expired")]
    #[serde(other)]
    Critical,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaRecord {
    pub checked_at_time: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Unix(i64),
    Text(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("некорректная метка времени '{0}'")]
pub struct TimestampError(pub String);

impl Timestamp {
    pub fn parse(&self) -> Result<DateTime<Utc>, TimestampError> {
        match self {
            Timestamp::Unix(secs) => Utc
                .timestamp_opt(*secs, 0)
                .single()
                .ok_or_else(|| TimestampError(secs.to_string())),
            Timestamp::Text(raw) => parse_timestamp(raw),
        }
    }
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let text = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(secs) = text.parse::<i64>() {
        return Timestamp::Unix(secs).parse();
    }
    Err(TimestampError(raw.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HealthCounts {
    pub ok: u64,
    pub warning: u64,
    pub critical: u64,
}

impl CertReport {
    pub fn certificates(&self) -> impl Iterator<Item = (&str, &str, &CertRecord)> {
        self.data.iter().flat_map(|(machine, components)| {
            components
                .iter()
                .filter_map(|(component, entry)| match entry {
                    ComponentEntry::Certificates(certs) => Some((component, certs)),
                    ComponentEntry::Meta(_) => None,
                })
                .flat_map(move |(component, certs)| {
                    certs
                        .iter()
                        .map(move |cert| (machine.as_str(), component.as_str(), cert))
                })
        })
    }

    pub fn metas(&self) -> impl Iterator<Item = (&str, &str, &MetaRecord)> {
        self.data.iter().flat_map(|(machine, components)| {
            components
                .iter()
                .filter_map(move |(component, entry)| match entry {
                    ComponentEntry::Meta(meta) => {
                        Some((machine.as_str(), component.as_str(), meta))
                    }
                    ComponentEntry::Certificates(_) => None,
                })
        })
    }

    /// Latest `checked_at_time` across every meta entry.
    pub fn last_check(&self) -> Result<Option<DateTime<Utc>>, TimestampError> {
        let mut latest: Option<DateTime<Utc>> = None;
        for (_, _, meta) in self.metas() {
            let ts = meta.checked_at_time.parse()?;
            latest = Some(latest.map_or(ts, |current| current.max(ts)));
        }
        Ok(latest)
    }

    pub fn health_counts(&self) -> HealthCounts {
        let mut counts = HealthCounts::default();
        for (_, _, cert) in self.certificates() {
            match cert.health {
                Health::Ok => counts.ok += 1,
                Health::Warning => counts.warning += 1,
                Health::Critical => counts.critical += 1,
            }
        }
        counts
    }

    pub fn counts_match_summary(&self) -> bool {
        let counts = self.health_counts();
        counts.ok == self.summary.ok
            && counts.warning == self.summary.warning
            && counts.critical == self.summary.expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> CertReport {
        serde_json::from_value(json!({
            "summary": {"total": 3, "expired": 1, "warning": 1, "ok": 1},
            "data": {
                "node-b": {
                    "etcd": [
                        {"path": "/etc/etcd/peer.crt", "days_remaining": 200, "expiry": "2025-01-01 00:00:00", "health": "ok"}
                    ],
                    "meta": {"checked_at_time": "2024-03-10 08:00:00"}
                },
                "node-a": {
                    "kubelet": [
                        {"path": "/var/lib/kubelet/pki/kubelet.crt", "daysRemaining": 12, "expiry": "2024-03-22 00:00:00", "health": "warning"},
                        {"path": "/var/lib/kubelet/pki/old.crt", "days_remaining": -3, "expiry": "2024-03-07 00:00:00"}
                    ],
                    "meta": {"checked_at_time": "2024-03-10T11:00:00Z"}
                }
            }
        }))
        .expect("отчёт должен разбираться")
    }

    #[test]
    fn parses_nested_report() {
        let report = report();
        let certs: Vec<_> = report.certificates().collect();
        assert_eq!(certs.len(), 3);
        assert_eq!(certs[0].0, "node-a");
        assert_eq!(certs[0].2.days_remaining, 12);
        assert_eq!(certs[1].2.health, Health::Critical);
        assert_eq!(certs[2].0, "node-b");
        assert_eq!(report.metas().count(), 2);
    }

    #[test]
    fn last_check_is_maximum() {
        let last = report()
            .last_check()
            .expect("метки времени корректны")
            .expect("метка есть");
        assert_eq!(last, Utc.with_ymd_and_hms(2024, 3, 10, 11, 0, 0).unwrap());
    }

    #[test]
    fn last_check_absent_without_meta() {
        let report: CertReport = serde_json::from_value(json!({
            "summary": {"total": 0, "expired": 0, "warning": 0, "ok": 0},
            "data": {"node-a": {"kubelet": []}}
        }))
        .expect("отчёт должен разбираться");
        assert_eq!(report.last_check(), Ok(None));
    }

    #[test]
    fn detail_rows_agree_with_summary() {
        let report = report();
        assert_eq!(
            report.health_counts(),
            HealthCounts {
                ok: 1,
                warning: 1,
                critical: 1
            }
        );
        assert!(report.counts_match_summary());
    }

    #[test]
    fn expired_and_unknown_health_count_as_critical() {
        let report: CertReport = serde_json::from_value(json!({
            "summary": {"total": 2, "expired": 1, "warning": 0, "ok": 0},
            "data": {"node-a": {"apiserver": [
                {"path": "/etc/kubernetes/pki/apiserver.crt", "days_remaining": -1, "expiry": "2024-03-09 00:00:00", "health": "expired"},
                {"path": "/etc/kubernetes/pki/front-proxy.crt", "days_remaining": 5, "expiry": "2024-03-15 00:00:00", "health": "revoked"}
            ]}}
        }))
        .expect("отчёт должен разбираться");
        let health: Vec<_> = report.certificates().map(|(_, _, c)| c.health).collect();
        assert_eq!(health, vec![Health::Critical, Health::Critical]);
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-10T08:00:00Z"), Ok(expected));
        assert_eq!(parse_timestamp("2024-03-10T10:00:00+02:00"), Ok(expected));
        assert_eq!(parse_timestamp("2024-03-10 08:00:00"), Ok(expected));
        assert_eq!(parse_timestamp("2024-03-10 08:00:00.000"), Ok(expected));
        assert_eq!(parse_timestamp("1710057600"), Ok(expected));
        assert_eq!(Timestamp::Unix(1_710_057_600).parse(), Ok(expected));
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn missing_node_field_is_rejected() {
        let result: Result<NodesStats, _> = serde_json::from_value(json!({
            "nodes": {"abc": {"name": "es-data-1", "fs": {"total": {"total_in_bytes": 1}}}}
        }));
        assert!(result.is_err());
    }
}
