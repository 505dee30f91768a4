use crate::range::Range;
use crate::status::Status;
use crate::threshold::{MetricKey, ThresholdRange, Thresholds};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Megabytes,
    Percent,
    Milliseconds,
    Seconds,
    Counter,
    None,
}

impl Unit {
    pub fn uom(self) -> &'static str {
        match self {
            Unit::Megabytes => "MB",
            Unit::Percent => "%",
            Unit::Milliseconds => "ms",
            Unit::Seconds => "s",
            Unit::Counter => "c",
            Unit::None => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub unit: Unit,
    pub bounds: Option<(f64, f64)>,
    pub key: Option<MetricKey>,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64, unit: Unit) -> Self {
        Self {
            name: name.into(),
            value,
            unit,
            bounds: None,
            key: None,
        }
    }

    pub fn with_key(mut self, key: MetricKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = Some((min, max));
        self
    }

    pub fn percent(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, value, Unit::Percent).with_bounds(0.0, 100.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("метрика '{0}' встречается дважды")]
pub struct DuplicateMetric(pub String);

/// Ordered metric collection with unique names.
#[derive(Debug, Clone, Default)]
pub struct MetricSet {
    metrics: Vec<Metric>,
    names: HashSet<String>,
}

impl MetricSet {
    pub fn push(&mut self, metric: Metric) -> Result<(), DuplicateMetric> {
        if !self.names.insert(metric.name.clone()) {
            return Err(DuplicateMetric(metric.name));
        }
        self.metrics.push(metric);
        Ok(())
    }

    pub fn extend<I>(&mut self, metrics: I) -> Result<(), DuplicateMetric>
    where
        I: IntoIterator<Item = Metric>,
    {
        for metric in metrics {
            self.push(metric)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn evaluate(self, thresholds: &Thresholds) -> Vec<EvaluatedMetric> {
        self.metrics
            .into_iter()
            .map(|metric| EvaluatedMetric::new(metric, thresholds))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedMetric {
    #[serde(flatten)]
    pub metric: Metric,
    pub status: Status,
    #[serde(serialize_with = "serialize_range")]
    pub warning: Option<Range>,
    #[serde(serialize_with = "serialize_range")]
    pub critical: Option<Range>,
}

fn serialize_range<S: serde::Serializer>(
    range: &Option<Range>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match range {
        Some(range) => serializer.collect_str(range),
        None => serializer.serialize_none(),
    }
}

impl EvaluatedMetric {
    pub fn new(metric: Metric, thresholds: &Thresholds) -> Self {
        let ThresholdRange { warning, critical } = thresholds.range_for(&metric);
        let status = thresholds.evaluate(&metric);
        Self {
            metric,
            status,
            warning,
            critical,
        }
    }

    /// `'name'=value[UOM];[warn];[crit];[min];[max]`
    pub fn perfdata(&self) -> String {
        let opt_range = |r: &Option<Range>| r.map(|r| r.to_string()).unwrap_or_default();
        let (min, max) = match self.metric.bounds {
            Some((min, max)) => (format_value(min), format_value(max)),
            None => (String::new(), String::new()),
        };
        format!(
            "'{}'={}{};{};{};{};{}",
            self.metric.name,
            format_value(self.metric.value),
            self.metric.unit.uom(),
            opt_range(&self.warning),
            opt_range(&self.critical),
            min,
            max
        )
    }
}

impl fmt::Display for EvaluatedMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is {}{}",
            self.metric.name,
            format_value(self.metric.value),
            self.metric.unit.uom()
        )?;
        let violated = match self.status {
            Status::Critical => self.critical,
            Status::Warning => self.warning,
            _ => None,
        };
        if let Some(range) = violated {
            write!(f, " (outside {range})")?;
        }
        Ok(())
    }
}

pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
