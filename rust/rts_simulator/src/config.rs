//! Simulation configuration and the parsers behind the CLI flags.

use tracing::warn;

use crate::policy::PolicyKind;
use crate::types::Tick;
use crate::variation::{SeededVariation, VariationConfig};

/// Ticks per millisecond (one tick is 100us).
pub const TICKS_PER_MS: Tick = 10;

/// Seed used when neither `--seed` nor `RTSIM_SEED` is given.
pub const DEFAULT_SEED: u32 = 42;

/// Everything needed to turn a task set into a running simulator.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub policy: PolicyKind,
    /// Draw execution times and sporadic inter-arrival gaps at random.
    /// When false, jobs take their WCET and sporadic tasks arrive at their
    /// minimum inter-arrival time.
    pub variation: bool,
    /// PRNG seed for the variation source. Default: [`DEFAULT_SEED`].
    pub seed: u32,
    pub variation_config: VariationConfig,
}

impl SimConfig {
    pub fn new(policy: PolicyKind) -> Self {
        SimConfig {
            policy,
            variation: false,
            seed: DEFAULT_SEED,
            variation_config: VariationConfig::default(),
        }
    }

    /// Enable or disable random variation.
    pub fn variation(mut self, enabled: bool) -> Self {
        self.variation = enabled;
        self
    }

    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn variation_config(mut self, config: VariationConfig) -> Self {
        self.variation_config = config;
        self
    }

    /// A fresh variation source seeded from this configuration.
    pub fn seeded_variation(&self) -> SeededVariation {
        SeededVariation::new(self.seed, self.variation_config.clone())
    }
}

/// Seed for the variation source. Accepts a decimal `u32` or `entropy`,
/// which draws a fresh seed from the OS. Unset or empty means
/// [`DEFAULT_SEED`].
pub fn parse_seed(s: Option<&str>) -> Result<u32, String> {
    let Some(text) = s.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(DEFAULT_SEED);
    };
    if text.eq_ignore_ascii_case("entropy") {
        let seed: u32 = rand::random();
        warn!(seed, "variation seeded from OS entropy, pass --seed {seed} to replay");
        return Ok(seed);
    }
    text.parse()
        .map_err(|_| format!("bad seed {text:?}, want a u32 or \"entropy\""))
}

/// Duration units, longest suffix first so `ms` is not read as `s`.
const UNITS: [(&str, Tick); 3] = [("ms", TICKS_PER_MS), ("s", TICKS_PER_MS * 1_000), ("", 1)];

/// Simulation length in ticks: `1000` (ticks), `500ms` or `0.5s`.
pub fn parse_ticks(s: &str) -> Result<Tick, String> {
    let text = s.trim();
    let (value, scale) = UNITS
        .iter()
        .find_map(|&(unit, scale)| text.strip_suffix(unit).map(|v| (v.trim(), scale)))
        .unwrap_or((text, 1));
    if value.is_empty() {
        return Err(format!("missing duration value in {s:?}"));
    }

    // Integers take the exact path; fractions go through f64.
    if let Ok(n) = value.parse::<Tick>() {
        return n
            .checked_mul(scale)
            .ok_or_else(|| format!("duration {s:?} does not fit in a tick count"));
    }
    let n: f64 = value
        .parse()
        .map_err(|_| format!("cannot parse duration {s:?}"))?;
    if !n.is_finite() || n < 0.0 {
        return Err(format!("duration {s:?} must be a non-negative number"));
    }
    let ticks = n * scale as f64;
    if ticks >= Tick::MAX as f64 {
        return Err(format!("duration {s:?} does not fit in a tick count"));
    }
    Ok(ticks as Tick)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ticks() {
        assert_eq!(parse_ticks("1000"), Ok(1000));
        assert_eq!(parse_ticks("5ms"), Ok(50));
        assert_eq!(parse_ticks("0.5s"), Ok(5_000));
        assert_eq!(parse_ticks(" 2s "), Ok(20_000));
        assert!(parse_ticks("-1").is_err());
        assert!(parse_ticks("").is_err());
        assert!(parse_ticks("abc").is_err());
        assert!(parse_ticks("ms").is_err());
        assert!(parse_ticks("99999999999999999999s").is_err());
    }

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed(None), Ok(DEFAULT_SEED));
        assert_eq!(parse_seed(Some("")), Ok(DEFAULT_SEED));
        assert_eq!(parse_seed(Some("7")), Ok(7));
        assert!(parse_seed(Some("seven")).is_err());
        assert!(parse_seed(Some("ENTROPY")).is_ok());
    }

    #[test]
    fn test_config_builder() {
        let cfg = SimConfig::new(PolicyKind::Edf).variation(true).seed(9);
        assert!(cfg.variation);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.policy, PolicyKind::Edf);
        // RTSIM_SEED is read by the CLI only.
        assert_eq!(SimConfig::new(PolicyKind::RateMonotonic).seed, DEFAULT_SEED);
    }
}
