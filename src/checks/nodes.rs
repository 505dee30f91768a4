use crate::aggregate::Aggregate;
use crate::checks::{CheckError, CheckOutcome};
use crate::extract::NodeMetrics;
use crate::metrics::{format_value, EvaluatedMetric, MetricSet, Unit};
use crate::snapshot::NodesStats;
use crate::status::Status;
use crate::threshold::{Family, Thresholds};
use tracing::{debug, info};

pub const CHECK_NAME: &str = "NODES";

pub fn evaluate(
    stats: &NodesStats,
    prefixes: &[String],
    thresholds: &Thresholds,
) -> Result<CheckOutcome, CheckError> {
    let mut nodes: Vec<NodeMetrics> = stats
        .nodes
        .values()
        .map(|node| NodeMetrics::from_stats(node, prefixes))
        .collect();
    nodes.sort_by(|a, b| a.name.cmp(&b.name));

    let mut set = MetricSet::default();
    for node in &nodes {
        set.extend(node.metrics())?;
    }

    let aggregates: Vec<Aggregate> = Family::ALL
        .into_iter()
        .map(|family| {
            let capacities: Vec<_> = nodes.iter().map(|n| *n.capacity(family)).collect();
            Aggregate::new(family, Unit::Megabytes, &capacities)
        })
        .collect();
    for aggregate in &aggregates {
        set.extend(aggregate.metrics())?;
    }
    debug!(nodes = nodes.len(), metrics = set.len(), "метрики узлов собраны");

    let metrics = set.evaluate(thresholds);
    let status = Status::worst(metrics.iter().map(|m| m.status));

    let mut alerting: Vec<&EvaluatedMetric> =
        metrics.iter().filter(|m| m.status != Status::Ok).collect();
    alerting.sort_by(|a, b| {
        b.status
            .cmp(&a.status)
            .then_with(|| a.metric.name.cmp(&b.metric.name))
    });

    let summary = if alerting.is_empty() {
        cluster_summary(nodes.len(), &aggregates)
    } else {
        alerting
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut details: Vec<String> = alerting
        .iter()
        .map(|m| format!("{:<8} {m}", m.status.label()))
        .collect();
    details.extend(nodes.iter().map(node_row));

    info!(
        nodes = nodes.len(),
        alerting = alerting.len(),
        status = %status,
        "статистика узлов оценена"
    );

    Ok(CheckOutcome {
        check: CHECK_NAME,
        status,
        summary,
        details,
        metrics,
    })
}

fn cluster_summary(node_count: usize, aggregates: &[Aggregate]) -> String {
    let mut parts = vec![format!("{node_count} nodes")];
    for agg in aggregates {
        let pct = agg
            .total_used_percent()
            .map(|p| format!(" ({}%)", format_value(p)))
            .unwrap_or_default();
        parts.push(format!(
            "{} {}MB of {}MB used{pct}",
            agg.family.as_str(),
            format_value(agg.total_used),
            format_value(agg.total_size)
        ));
    }
    parts.join(", ")
}

fn node_row(node: &NodeMetrics) -> String {
    let cap = |family: Family| {
        let c = node.capacity(family);
        format!(
            "{} {}/{}MB ({}%)",
            family.as_str(),
            format_value(c.used()),
            format_value(c.size()),
            format_value(c.used_percent())
        )
    };
    format!(
        "{}: {}, {}, cpu {}%",
        node.name,
        cap(Family::Filesystem),
        cap(Family::Heap),
        format_value(node.cpu_percent)
    )
}
