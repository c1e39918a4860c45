//! Channel quality labels and diagnostics

use serde::{Deserialize, Serialize};

/// Two disjoint, ascending index lists partitioning `0..N`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLabelSets {
    pub good: Vec<usize>,
    pub bad: Vec<usize>,
}

impl ChannelLabelSets {
    /// Total number of labelled channels.
    pub fn len(&self) -> usize {
        self.good.len() + self.bad.len()
    }

    pub fn is_empty(&self) -> bool {
        self.good.is_empty() && self.bad.is_empty()
    }

    /// True when `good` and `bad` together cover `0..n` exactly once.
    pub fn is_partition_of(&self, n: usize) -> bool {
        let mut seen = vec![false; n];
        for &i in self.good.iter().chain(self.bad.iter()) {
            match seen.get_mut(i) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        seen.into_iter().all(|s| s)
    }

    /// Fraction of channels labelled bad.
    pub fn bad_fraction(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.bad.len() as f64 / self.len() as f64
        }
    }
}

/// Per-channel curves behind a bad-channel decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityDiagnostics {
    /// log10 energy of each channel
    pub energy: Vec<f64>,
    /// Robust polynomial trend through `energy`
    pub fitted: Vec<f64>,
    /// `fitted - thresh * MAD`; channels below it are bad before reconciliation
    pub threshold_curve: Vec<f64>,
    /// MAD of the inlier deviations
    pub mad: f64,
}

/// Output of the channel quality classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelQualityReport {
    pub labels: ChannelLabelSets,
    /// Present when the classifier ran in verbose mode
    pub diagnostics: Option<QualityDiagnostics>,
}

impl ChannelQualityReport {
    pub fn good(&self) -> &[usize] {
        &self.labels.good
    }

    pub fn bad(&self) -> &[usize] {
        &self.labels.bad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_check() {
        let sets = ChannelLabelSets {
            good: vec![0, 1, 3],
            bad: vec![2],
        };
        assert!(sets.is_partition_of(4));
        assert!(!sets.is_partition_of(5));

        let overlapping = ChannelLabelSets {
            good: vec![0, 1],
            bad: vec![1],
        };
        assert!(!overlapping.is_partition_of(2));
    }

    #[test]
    fn test_bad_fraction() {
        let sets = ChannelLabelSets {
            good: vec![0, 1, 2],
            bad: vec![3],
        };
        assert!((sets.bad_fraction() - 0.25).abs() < 1e-12);
        assert_eq!(ChannelLabelSets::default().bad_fraction(), 0.0);
    }
}
