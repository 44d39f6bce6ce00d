//! Descriptive statistics over named measurement collections
//!
//! Missing measurements are `None`. Legacy inputs mark them with `-1`,
//! which [`from_sentinel`] converts; [`StatisticsReport`] serializes
//! empty collections back to the sentinel form.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

/// Value marking a missing measurement in legacy inputs and outputs
pub const MISSING_SENTINEL: f64 = -1.0;

/// Map sentinel entries to `None`
pub fn from_sentinel(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|&v| if v == MISSING_SENTINEL { None } else { Some(v) })
        .collect()
}

/// Six-field summary of one collection
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// 75th minus 25th percentile
    pub iqr: f64,
    /// Population standard deviation
    pub std: f64,
}

impl DescriptiveStats {
    /// The stats themselves, or every field set to the sentinel
    pub fn fields_or_sentinel(stats: Option<DescriptiveStats>) -> DescriptiveStats {
        stats.unwrap_or(DescriptiveStats {
            mean: MISSING_SENTINEL,
            median: MISSING_SENTINEL,
            min: MISSING_SENTINEL,
            max: MISSING_SENTINEL,
            iqr: MISSING_SENTINEL,
            std: MISSING_SENTINEL,
        })
    }
}

/// Linear-interpolated quantile of sorted data (R-7)
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * p;
    let lower = h.floor() as usize;
    if lower >= n - 1 {
        return sorted[n - 1];
    }
    let frac = h - lower as f64;
    sorted[lower] + frac * (sorted[lower + 1] - sorted[lower])
}

/// Summarize the present values; `None` if nothing is present
pub fn describe(values: &[Option<f64>]) -> Option<DescriptiveStats> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.total_cmp(b));

    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some(DescriptiveStats {
        mean,
        median: quantile(&present, 0.5),
        min: present[0],
        max: present[present.len() - 1],
        iqr: quantile(&present, 0.75) - quantile(&present, 0.25),
        std: variance.sqrt(),
    })
}

/// Per-name summaries in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsReport {
    entries: Vec<(String, Option<DescriptiveStats>)>,
}

impl StatisticsReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summary for `name`; outer `None` if the name is unknown
    pub fn get(&self, name: &str) -> Option<Option<&DescriptiveStats>> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, stats)| stats.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&DescriptiveStats>)> {
        self.entries
            .iter()
            .map(|(key, stats)| (key.as_str(), stats.as_ref()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }
}

impl Serialize for StatisticsReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, stats) in &self.entries {
            map.serialize_entry(name, &DescriptiveStats::fields_or_sentinel(*stats))?;
        }
        map.end()
    }
}

/// Describe every named collection, preserving input order
pub fn summarize<K: AsRef<str>>(collections: &[(K, Vec<Option<f64>>)]) -> StatisticsReport {
    let entries = collections
        .iter()
        .map(|(name, values)| {
            let stats = describe(values);
            if stats.is_none() {
                tracing::debug!(name = name.as_ref(), "no measurements present");
            }
            (name.as_ref().to_string(), stats)
        })
        .collect();
    StatisticsReport { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_sentinel_entries_excluded() {
        let values = from_sentinel(&[1.0, 2.0, 3.0, -1.0, -1.0]);
        assert_eq!(values.iter().filter(|v| v.is_none()).count(), 2);

        let stats = describe(&values).unwrap();
        assert!(approx(stats.mean, 2.0));
        assert!(approx(stats.median, 2.0));
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert!(approx(stats.iqr, 1.0));
        assert!(approx(stats.std, (2.0f64 / 3.0).sqrt()));
    }

    #[test]
    fn test_all_missing() {
        let values = from_sentinel(&[-1.0, -1.0]);
        assert!(describe(&values).is_none());

        let fields = DescriptiveStats::fields_or_sentinel(None);
        for field in [fields.mean, fields.median, fields.min, fields.max, fields.iqr, fields.std] {
            assert_eq!(field, MISSING_SENTINEL);
        }
    }

    #[test]
    fn test_even_count_quantiles() {
        let values: Vec<Option<f64>> = [4.0, 1.0, 3.0, 2.0].into_iter().map(Some).collect();
        let stats = describe(&values).unwrap();
        assert!(approx(stats.median, 2.5));
        // R-7: q25 = 1.75, q75 = 3.25
        assert!(approx(stats.iqr, 1.5));
    }

    #[test]
    fn test_single_value() {
        let stats = describe(&[Some(0.8)]).unwrap();
        assert_eq!(stats.median, 0.8);
        assert_eq!(stats.iqr, 0.0);
        assert_eq!(stats.std, 0.0);
    }

    #[test]
    fn test_summarize_preserves_order() {
        let input = vec![
            ("zeta", from_sentinel(&[1.0, 2.0, 3.0, -1.0, -1.0])),
            ("alpha", from_sentinel(&[-1.0, -1.0])),
            ("mid", vec![Some(5.0)]),
        ];
        let report = summarize(&input);

        assert_eq!(report.len(), 3);
        assert_eq!(report.names().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
        assert!(report.get("alpha").unwrap().is_none());
        assert!(report.get("zeta").unwrap().is_some());
        assert!(report.get("missing").is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["alpha"]["mean"], -1.0);
        assert_eq!(json["alpha"]["std"], -1.0);
        assert_eq!(json["zeta"]["max"], 3.0);
    }
}
