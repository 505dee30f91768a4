use crate::capacity::Capacity;
use crate::metrics::{Metric, Unit};
use crate::threshold::{CapacityField, Family, MetricKey, Scope};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    fn of<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        values.into_iter().fold(None, |acc, v| {
            Some(match acc {
                None => MinMax { min: v, max: v },
                Some(m) => MinMax {
                    min: m.min.min(v),
                    max: m.max.max(v),
                },
            })
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremes {
    pub used: MinMax,
    pub available: MinMax,
    pub used_percent: MinMax,
    pub available_percent: MinMax,
}

/// Cluster-wide reduction of one capacity family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub family: Family,
    pub unit: Unit,
    pub total_size: f64,
    pub total_used: f64,
    pub extremes: Option<Extremes>,
}

impl Aggregate {
    pub fn new(family: Family, unit: Unit, capacities: &[Capacity]) -> Self {
        let total_size: f64 = capacities.iter().map(Capacity::size).sum();
        let total_used: f64 = capacities.iter().map(Capacity::used).sum();

        let extremes = if capacities.is_empty() {
            None
        } else {
            let pick = |f: fn(&Capacity) -> f64| MinMax::of(capacities.iter().map(f));
            match (
                pick(Capacity::used),
                pick(Capacity::available),
                pick(Capacity::used_percent),
                pick(Capacity::available_percent),
            ) {
                (Some(used), Some(available), Some(used_percent), Some(available_percent)) => {
                    Some(Extremes {
                        used,
                        available,
                        used_percent,
                        available_percent,
                    })
                }
                _ => None,
            }
        };

        Self {
            family,
            unit,
            total_size,
            total_used,
            extremes,
        }
    }

    pub fn total_available(&self) -> f64 {
        (self.total_size - self.total_used).max(0.0)
    }

    pub fn total_used_percent(&self) -> Option<f64> {
        self.total_capacity().map(|c| c.used_percent())
    }

    pub fn total_available_percent(&self) -> Option<f64> {
        self.total_capacity().map(|c| c.available_percent())
    }

    fn total_capacity(&self) -> Option<Capacity> {
        if self.total_size <= 0.0 {
            return None;
        }
        Capacity::new(self.total_size, self.total_used, self.unit).ok()
    }

    pub fn metrics(&self) -> Vec<Metric> {
        let family = self.family.as_str();
        let key = |field| MetricKey::capacity(Scope::Total, self.family, field);
        let mut out = vec![
            Metric::new(format!("total.{family}.size"), self.total_size, self.unit),
            Metric::new(format!("total.{family}.used"), self.total_used, self.unit)
                .with_bounds(0.0, self.total_size)
                .with_key(key(CapacityField::Used)),
            Metric::new(
                format!("total.{family}.available"),
                self.total_available(),
                self.unit,
            )
            .with_bounds(0.0, self.total_size)
            .with_key(key(CapacityField::Available)),
        ];
        if let Some(pct) = self.total_used_percent() {
            out.push(
                Metric::percent(format!("total.{family}.used_percent"), pct)
                    .with_key(key(CapacityField::UsedPercent)),
            );
        }
        if let Some(pct) = self.total_available_percent() {
            out.push(
                Metric::percent(format!("total.{family}.available_percent"), pct)
                    .with_key(key(CapacityField::AvailablePercent)),
            );
        }

        if let Some(ex) = &self.extremes {
            let fields = [
                ("used", ex.used, self.unit),
                ("available", ex.available, self.unit),
                ("used_percent", ex.used_percent, Unit::Percent),
                ("available_percent", ex.available_percent, Unit::Percent),
            ];
            for (name, mm, unit) in fields {
                out.push(Metric::new(format!("min.{family}.{name}"), mm.min, unit));
                out.push(Metric::new(format!("max.{family}.{name}"), mm.max, unit));
            }
        }
        out
    }
}
