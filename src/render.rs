use crate::checks::CheckOutcome;
use clap::ValueEnum;
use prometheus::core::Collector;
use prometheus::{opts, Encoder, GaugeVec, Registry, TextEncoder};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
    Prometheus,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("ошибка сериализации JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ошибка кодирования метрик: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("метрики не в UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub fn render(outcome: &CheckOutcome, format: Format) -> Result<String, RenderError> {
    match format {
        Format::Text => Ok(render_text(outcome)),
        Format::Json => Ok(serde_json::to_string_pretty(outcome)?),
        Format::Prometheus => render_prometheus(outcome),
    }
}

/// First line `<CHECK> <STATUS> - <summary> | <perfdata>`, then detail rows.
pub fn render_text(outcome: &CheckOutcome) -> String {
    let mut out = format!(
        "{} {} - {}",
        outcome.check,
        outcome.status.label(),
        outcome.summary
    );
    if !outcome.metrics.is_empty() {
        let perfdata: Vec<String> = outcome.metrics.iter().map(|m| m.perfdata()).collect();
        out.push_str(" | ");
        out.push_str(&perfdata.join(" "));
    }
    for row in &outcome.details {
        out.push('\n');
        out.push_str(row);
    }
    out
}

pub fn render_prometheus(outcome: &CheckOutcome) -> Result<String, RenderError> {
    let registry = Registry::new();

    let status = GaugeVec::new(
        opts!(
            "healthcheck_status",
            "Overall check status (0=OK, 1=WARNING, 2=CRITICAL, 3=UNKNOWN)"
        ),
        &["check"],
    )?;
    let metric_value = GaugeVec::new(
        opts!("healthcheck_metric", "Evaluated metric value"),
        &["check", "name", "unit"],
    )?;
    let metric_status = GaugeVec::new(
        opts!(
            "healthcheck_metric_status",
            "Per-metric status (0=OK, 1=WARNING, 2=CRITICAL)"
        ),
        &["check", "name"],
    )?;

    register(&registry, &status)?;
    register(&registry, &metric_value)?;
    register(&registry, &metric_status)?;

    status
        .with_label_values(&[outcome.check])
        .set(outcome.status.exit_code() as f64);
    for m in &outcome.metrics {
        metric_value
            .with_label_values(&[outcome.check, &m.metric.name, m.metric.unit.uom()])
            .set(m.metric.value);
        metric_status
            .with_label_values(&[outcome.check, &m.metric.name])
            .set(m.status.exit_code() as f64);
    }

    let mut buf = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

fn register<T: Collector + Clone + 'static>(
    registry: &Registry,
    collector: &T,
) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collector.clone()))
}
