//! Config validation: unknown-key detection with Levenshtein suggestions
//! and parameter range checks.
//!
//! Two-pass parse: the raw TOML is first walked as a `toml::Value` and every
//! key compared against the known field names, emitting warnings with
//! "did you mean?" suggestions. Normal serde deserialization follows.
//! Warnings never break an existing config.

use std::collections::HashSet;

use super::DasConfig;

/// A non-fatal config warning (typo, unknown section).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `DasConfig`.
///
/// Any new field added to `DasConfig` must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [survey]
        "survey",
        "survey.name",
        "survey.channel_interval_m",
        "survey.sampling_rate_hz",
        "survey.gauge_length_m",
        // [quality]
        "quality",
        "quality.degree",
        "quality.thresh",
        "quality.continuity",
        "quality.adjacent",
        "quality.toleration",
        // [fitting]
        "fitting",
        "fitting.convergence_tolerance",
        "fitting.max_iterations",
        // [geometry]
        "geometry",
        "geometry.max_anchor_distance_m",
        "geometry.snap_tolerance",
        // [turning]
        "turning",
        "turning.thresh",
        "turning.channel_gap",
    ];
    keys.iter().copied().collect()
}

/// Recursively collect dotted key paths from a TOML value.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let toml::Value::Table(table) = value {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smallest key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde later
    };

    let known = known_config_keys();
    let mut warnings = Vec::new();
    for key in walk_toml_keys(&value, "") {
        if known.contains(key.as_str()) {
            continue;
        }
        // Only report the outermost unknown key of a subtree
        if let Some((parent, _)) = key.rsplit_once('.') {
            if !known.contains(parent) {
                continue;
            }
        }
        warnings.push(ValidationWarning {
            message: format!("Unknown config key '{key}'"),
            suggestion: suggest_correction(&key, &known),
            field: key,
        });
    }
    warnings
}

// ============================================================================
// Range Validation
// ============================================================================

/// Return one message per out-of-range parameter.
pub fn validate_ranges(config: &DasConfig) -> Vec<String> {
    let mut errors = Vec::new();

    let s = &config.survey;
    if s.channel_interval_m <= 0.0 {
        errors.push(format!(
            "survey.channel_interval_m = {} must be positive",
            s.channel_interval_m
        ));
    }
    if s.sampling_rate_hz <= 0.0 {
        errors.push(format!(
            "survey.sampling_rate_hz = {} must be positive",
            s.sampling_rate_hz
        ));
    }
    if s.gauge_length_m <= 0.0 {
        errors.push(format!(
            "survey.gauge_length_m = {} must be positive",
            s.gauge_length_m
        ));
    }

    let q = &config.quality;
    if q.thresh <= 0.0 {
        errors.push(format!("quality.thresh = {} must be positive", q.thresh));
    }

    let f = &config.fitting;
    if f.convergence_tolerance <= 0.0 {
        errors.push(format!(
            "fitting.convergence_tolerance = {} must be positive",
            f.convergence_tolerance
        ));
    }
    if f.max_iterations == 0 {
        errors.push("fitting.max_iterations must be at least 1".to_string());
    }

    let g = &config.geometry;
    if let Some(dx) = g.max_anchor_distance_m {
        if dx <= 0.0 {
            errors.push(format!(
                "geometry.max_anchor_distance_m = {dx} must be positive"
            ));
        }
    }
    if !(0.0..0.5).contains(&g.snap_tolerance) {
        errors.push(format!(
            "geometry.snap_tolerance = {} is outside [0, 0.5)",
            g.snap_tolerance
        ));
    }

    let t = &config.turning;
    if t.thresh <= 0.0 {
        errors.push(format!("turning.thresh = {} must be positive", t.thresh));
    }
    if t.channel_gap == 0 {
        errors.push("turning.channel_gap must be at least 1".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_basic() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_unknown_section_reported_once() {
        let warnings = validate_unknown_keys("[bogus]\na = 1\nb = 2\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "bogus");
    }

    #[test]
    fn test_known_keys_cover_default_serialization() {
        let toml_str = DasConfig::default().to_toml().expect("serialize");
        assert!(validate_unknown_keys(&toml_str).is_empty());
    }
}
