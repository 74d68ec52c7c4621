pub mod aggregator;
pub mod quantiles;

pub use aggregator::QuantileAggregator;
pub use quantiles::QuantileSummary;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::InstrumentationError;

/// Builds the shared tag-name tuple for one operation kind. The names are
/// fixed at registration and shared between every sample of that kind.
pub fn label_names(names: &[&str]) -> Arc<[String]> {
    names.iter().map(|n| (*n).to_string()).collect()
}

/// An ordered, fixed-arity tuple of (name, value) string tags.
///
/// Two samples aggregate into the same bucket iff their label sets compare
/// equal under both names and values. The name tuple for a given operation
/// kind never changes at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelSet {
    names: Arc<[String]>,
    values: Vec<String>,
}

impl LabelSet {
    /// Pairs `values` with a registered name tuple. Arity must match.
    pub fn new<I, S>(names: Arc<[String]>, values: I) -> Result<Self, InstrumentationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.len() != names.len() {
            return Err(InstrumentationError::LabelArity {
                expected: names.len(),
                got: values.len(),
            });
        }
        Ok(Self { names, values })
    }

    /// Builds a label set from literal (name, value) pairs. The arity is
    /// correct by construction, so this cannot fail.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            names: pairs.iter().map(|(n, _)| (*n).to_string()).collect(),
            values: pairs.iter().map(|(_, v)| (*v).to_string()).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.names.iter().zip(&self.values).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

/// A single completed-operation observation.
/// This is the "write" side — hooks create these and push them in.
#[derive(Debug, Clone)]
pub struct Sample {
    pub labels: LabelSet,
    /// Elapsed wall time, already quantized to the hook's granularity.
    pub duration_micros: u64,
    pub observed_at: DateTime<Utc>,
}

impl Sample {
    pub fn new(labels: LabelSet, duration_micros: u64) -> Self {
        Self {
            labels,
            duration_micros,
            observed_at: Utc::now(),
        }
    }
}
