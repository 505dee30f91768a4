use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Monitoring-plugin threshold range (`[@]low:high`, `~` for an open low end).
///
/// A value outside `[low, high]` alerts; with `@` a value inside alerts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub inverted: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("пустой диапазон")]
    Empty,
    #[error("некорректная граница '{bound}' в диапазоне '{range}'")]
    Bound { range: String, bound: String },
    #[error("нижняя граница больше верхней в диапазоне '{0}'")]
    Inverted(String),
}

impl Range {
    pub fn alerts(&self, value: f64) -> bool {
        let inside = self.low.map_or(true, |low| value >= low)
            && self.high.map_or(true, |high| value <= high);
        if self.inverted {
            inside
        } else {
            !inside
        }
    }
}

impl FromStr for Range {
    type Err = RangeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let raw = input.trim();
        let (inverted, body) = match raw.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        if body.is_empty() {
            return Err(RangeError::Empty);
        }

        let parse_bound = |bound: &str| -> Result<f64, RangeError> {
            bound
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| RangeError::Bound {
                    range: raw.to_string(),
                    bound: bound.to_string(),
                })
        };

        let (low, high) = match body.split_once(':') {
            None => (Some(0.0), Some(parse_bound(body)?)),
            Some((low, high)) => {
                let low = match low {
                    "~" => None,
                    "" => Some(0.0),
                    other => Some(parse_bound(other)?),
                };
                let high = match high {
                    "" => None,
                    other => Some(parse_bound(other)?),
                };
                (low, high)
            }
        };

        if let (Some(l), Some(h)) = (low, high) {
            if l > h {
                return Err(RangeError::Inverted(raw.to_string()));
            }
        }

        Ok(Self {
            low,
            high,
            inverted,
        })
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            f.write_str("@")?;
        }
        match (self.low, self.high) {
            (Some(low), Some(high)) if low == 0.0 => write!(f, "{high}"),
            (Some(low), Some(high)) => write!(f, "{low}:{high}"),
            (Some(low), None) => write!(f, "{low}:"),
            (None, Some(high)) => write!(f, "~:{high}"),
            (None, None) => f.write_str("~:"),
        }
    }
}
