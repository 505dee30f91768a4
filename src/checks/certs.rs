use crate::checks::{CheckError, CheckOutcome};
use crate::metrics::{EvaluatedMetric, Metric, Unit};
use crate::snapshot::{CertReport, Health};
use crate::status::{format_age, freshness, summary_status, FreshnessPolicy};
use crate::threshold::Thresholds;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

pub const CHECK_NAME: &str = "CERTS";

pub fn evaluate(
    report: &CertReport,
    now: DateTime<Utc>,
    policy: &FreshnessPolicy,
) -> Result<CheckOutcome, CheckError> {
    let summary = report.summary;
    let primary = summary_status(&summary);
    let last_check = report.last_check()?;
    let fresh = freshness(now, last_check, policy);
    let status = primary.escalate(fresh.status);

    if !report.counts_match_summary() {
        let counts = report.health_counts();
        warn!(
            summary_ok = summary.ok,
            summary_warning = summary.warning,
            summary_expired = summary.expired,
            rows_ok = counts.ok,
            rows_warning = counts.warning,
            rows_critical = counts.critical,
            "строки отчёта расходятся со сводкой"
        );
    }

    let mut text = format!(
        "{} certificates: {} expired, {} warning, {} ok",
        summary.total, summary.expired, summary.warning, summary.ok
    );
    match (&fresh.message, fresh.age) {
        (Some(message), _) => {
            text.push_str("; ");
            text.push_str(message);
        }
        (None, Some(age)) => {
            text.push_str(&format!("; last check {} ago", format_age(age)));
        }
        (None, None) => {}
    }

    info!(
        primary = %primary,
        freshness = %fresh.status,
        status = %status,
        "отчёт о сертификатах оценён"
    );

    Ok(CheckOutcome {
        check: CHECK_NAME,
        status,
        summary: text,
        details: detail_rows(report)?,
        metrics: perf_metrics(report, fresh.age),
    })
}

fn detail_rows(report: &CertReport) -> Result<Vec<String>, CheckError> {
    let mut rows = Vec::new();
    for (machine, component, cert) in report.certificates() {
        rows.push(format!(
            "{:<8} {machine}/{component} {} expires {} ({} days)",
            health_label(cert.health),
            cert.path,
            cert.expiry,
            cert.days_remaining
        ));
    }
    for (machine, component, meta) in report.metas() {
        let checked_at = meta.checked_at_time.parse()?;
        rows.push(format!(
            "{machine}/{component} checked at {}",
            checked_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    Ok(rows)
}

fn health_label(health: Health) -> &'static str {
    match health {
        Health::Ok => "OK",
        Health::Warning => "WARNING",
        Health::Critical => "CRITICAL",
    }
}

fn perf_metrics(report: &CertReport, age: Option<std::time::Duration>) -> Vec<EvaluatedMetric> {
    let s = report.summary;
    let mut metrics = vec![
        Metric::new("total", s.total as f64, Unit::None),
        Metric::new("expired", s.expired as f64, Unit::None),
        Metric::new("warning", s.warning as f64, Unit::None),
        Metric::new("ok", s.ok as f64, Unit::None),
    ];
    if let Some(age) = age {
        metrics.push(Metric::new(
            "last_check_age",
            age.as_secs() as f64,
            Unit::Seconds,
        ));
    }
    let none = Thresholds::default();
    metrics
        .into_iter()
        .map(|m| EvaluatedMetric::new(m, &none))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{Status, MISSING_TIMESTAMP};
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn checked(hours_ago: i64) -> String {
        (now() - chrono::Duration::hours(hours_ago)).to_rfc3339()
    }

    fn report(summary: serde_json::Value, checked_at: Option<String>) -> CertReport {
        let mut machine = json!({
            "kubelet": [
                {"path": "/etc/kubernetes/pki/kubelet.crt", "days_remaining": 12, "expiry": "2024-03-22T00:00:00Z", "health": "warning"}
            ]
        });
        if let Some(ts) = checked_at {
            machine["meta"] = json!({"checked_at_time": ts});
        }
        serde_json::from_value(json!({"summary": summary, "data": {"master-1": machine}}))
            .expect("отчёт должен разбираться")
    }

    fn eval(report: &CertReport) -> CheckOutcome {
        evaluate(report, now(), &FreshnessPolicy::default()).expect("оценка должна проходить")
    }

    #[test]
    fn warning_counts_with_fresh_report() {
        let r = report(
            json!({"total": 10, "expired": 0, "warning": 2, "ok": 8}),
            Some(checked(1)),
        );
        let out = eval(&r);
        assert_eq!(out.status, Status::Warning);
        assert_eq!(out.status.exit_code(), 1);
        assert_eq!(
            out.summary,
            "10 certificates: 0 expired, 2 warning, 8 ok; last check 1h ago"
        );
    }

    #[test]
    fn expired_is_critical_regardless_of_freshness() {
        for hours in [1, 40, 60] {
            let r = report(
                json!({"total": 5, "expired": 1, "warning": 0, "ok": 4}),
                Some(checked(hours)),
            );
            let out = eval(&r);
            assert_eq!(out.status, Status::Critical, "age {hours}h");
            assert_eq!(out.status.exit_code(), 2);
        }
    }

    #[test]
    fn expired_row_keeps_summary_policy() {
        let r: CertReport = serde_json::from_value(json!({
            "summary": {"total": 1, "expired": 1, "warning": 0, "ok": 0},
            "data": {"master-1": {
                "apiserver": [
                    {"path": "/etc/kubernetes/pki/apiserver.crt", "days_remaining": -2, "expiry": "2024-03-08T00:00:00Z", "health": "expired"}
                ],
                "meta": {"checked_at_time": checked(1)}
            }}
        }))
        .expect("отчёт должен разбираться");
        let out = eval(&r);
        assert_eq!(out.status, Status::Critical);
        assert_eq!(out.status.exit_code(), 2);
        assert!(out.details[0].starts_with("CRITICAL master-1/apiserver"));
    }

    #[test]
    fn stale_report_escalates() {
        let ok = json!({"total": 1, "expired": 0, "warning": 0, "ok": 1});
        assert_eq!(eval(&report(ok.clone(), Some(checked(1)))).status, Status::Ok);

        let out = eval(&report(ok.clone(), Some(checked(40))));
        assert!(out.status >= Status::Warning);
        assert!(out.summary.contains("last check 1day 16h ago"));

        let out = eval(&report(ok, Some(checked(60))));
        assert!(out.status >= Status::Critical);
    }

    #[test]
    fn missing_timestamp_is_critical() {
        let r = report(json!({"total": 1, "expired": 0, "warning": 0, "ok": 1}), None);
        let out = eval(&r);
        assert_eq!(out.status, Status::Critical);
        assert!(out.summary.ends_with(MISSING_TIMESTAMP));
        assert_eq!(out.details.len(), 1);
    }

    #[test]
    fn details_cover_rows_and_meta() {
        let r = report(
            json!({"total": 1, "expired": 0, "warning": 1, "ok": 0}),
            Some(checked(2)),
        );
        let out = eval(&r);
        assert_eq!(
            out.details,
            vec![
                "WARNING  master-1/kubelet /etc/kubernetes/pki/kubelet.crt expires 2024-03-22T00:00:00Z (12 days)".to_string(),
                "master-1/meta checked at 2024-03-10T10:00:00Z".to_string(),
            ]
        );
        let names: Vec<_> = out.metrics.iter().map(|m| m.metric.name.as_str()).collect();
        assert_eq!(names, vec!["total", "expired", "warning", "ok", "last_check_age"]);
    }

    #[test]
    fn unparseable_timestamp_is_an_error() {
        let r = report(
            json!({"total": 0, "expired": 0, "warning": 0, "ok": 0}),
            Some("not a time".to_string()),
        );
        let err = evaluate(&r, now(), &FreshnessPolicy::default())
            .expect_err("метка времени некорректна");
        assert!(matches!(err, CheckError::Timestamp(_)));
    }
}
