use crate::metrics::Unit;
use thiserror::Error;

const BYTES_PER_MB: f64 = 1_048_576.0;

#[derive(Debug, Error, PartialEq)]
pub enum CapacityError {
    #[error("отрицательный размер: {0}")]
    NegativeSize(f64),
    #[error("отрицательный объём использования: {0}")]
    NegativeUsed(f64),
}

/// A size/used pair. `used` may exceed `size`; derived values clamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capacity {
    size: f64,
    used: f64,
    unit: Unit,
}

impl Capacity {
    pub fn new(size: f64, used: f64, unit: Unit) -> Result<Self, CapacityError> {
        if size.is_nan() || size < 0.0 {
            return Err(CapacityError::NegativeSize(size));
        }
        if used.is_nan() || used < 0.0 {
            return Err(CapacityError::NegativeUsed(used));
        }
        Ok(Self { size, used, unit })
    }

    /// Builds a megabyte capacity from raw byte counts.
    pub fn from_bytes(size_bytes: u64, used_bytes: u64) -> Self {
        Self {
            size: bytes_to_mb(size_bytes),
            used: bytes_to_mb(used_bytes),
            unit: Unit::Megabytes,
        }
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn used(&self) -> f64 {
        self.used
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn available(&self) -> f64 {
        (self.size - self.used).max(0.0)
    }

    pub fn used_percent(&self) -> f64 {
        if self.size == 0.0 {
            return 0.0;
        }
        (self.used / self.size * 100.0).floor()
    }

    pub fn available_percent(&self) -> f64 {
        (100.0 - self.used_percent()).clamp(0.0, 100.0)
    }
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB).round()
}
