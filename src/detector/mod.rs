// =============================================================================
// Detector trait and registry
// =============================================================================
//
// A Detector is a pure function of a candle window (plus its own configured
// parameters) to a Signal. It MUST NOT mutate the window, consult wall-clock
// time, or perform I/O, and MUST handle short windows by returning a HOLD
// signal rather than failing — mirrors the teacher's `signals` trait-object
// registry (`Arc<dyn Trait>` fields keyed by name), generalized from a fixed
// enum of signal kinds to an open, named registry.
//
// Two families of concrete detectors implement this trait: `classical`
// (indicator-threshold/crossover detectors) and `smc` (Smart Money Concept
// structural detectors, which may derive state from the window but never
// hold it across calls).

pub mod classical;
pub mod smc;

use std::collections::BTreeMap;

use crate::candle::CandleWindow;
use crate::error::ConfigError;
use crate::signal::Signal;

/// Read-only context passed alongside the window. Detectors use it only for
/// labeling (tags, reasons) — it must never change which action a detector
/// picks for a given window, or determinism breaks.
#[derive(Debug, Clone, Copy)]
pub struct DetectorContext<'a> {
    pub symbol: &'a str,
    pub timeframe: &'a str,
}

impl<'a> DetectorContext<'a> {
    pub fn new(symbol: &'a str, timeframe: &'a str) -> Self {
        Self { symbol, timeframe }
    }
}

/// A pure capability: window + context in, Signal out.
pub trait Detector: Send + Sync {
    /// Stable identifier used as the registry key and in `Signal::tags`.
    fn name(&self) -> &str;

    fn evaluate(&self, window: &CandleWindow, ctx: &DetectorContext) -> Signal;
}

/// A detector paired with the weight it contributes to `ConfluenceEngine`
/// aggregation.
struct Entry {
    detector: Box<dyn Detector>,
    weight: f64,
}

/// `name → (Detector, weight)`, iterated in stable insertion order so engine
/// aggregation is deterministic per spec.
pub struct DetectorRegistry {
    order: Vec<String>,
    entries: BTreeMap<String, Entry>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            entries: BTreeMap::new(),
        }
    }

    /// Register a detector under its own `name()`. Rejects a negative weight,
    /// a name that isn't lowercase ASCII snake_case, or a name already taken.
    pub fn register(&mut self, detector: Box<dyn Detector>, weight: f64) -> Result<(), ConfigError> {
        let name = detector.name().to_string();

        if weight < 0.0 {
            return Err(ConfigError::NegativeWeight { name, weight });
        }
        if !is_snake_case(&name) {
            return Err(ConfigError::InvalidDetectorName { name });
        }
        if self.entries.contains_key(&name) {
            return Err(ConfigError::DuplicateDetector { name });
        }

        self.order.push(name.clone());
        self.entries.insert(name, Entry { detector, weight });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<(&dyn Detector, f64)> {
        self.entries
            .get(name)
            .map(|e| (e.detector.as_ref(), e.weight))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn weight(&self, name: &str) -> Option<f64> {
        self.entries.get(name).map(|e| e.weight)
    }

    pub fn set_weight(&mut self, name: &str, weight: f64) -> Result<(), ConfigError> {
        if weight < 0.0 {
            return Err(ConfigError::NegativeWeight {
                name: name.to_string(),
                weight,
            });
        }
        if let Some(entry) = self.entries.get_mut(name) {
            entry.weight = weight;
        }
        Ok(())
    }

    /// Registry order — the iteration order used for deterministic
    /// aggregation and for validating `enabled_detectors` names.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Evaluate every detector in `names`, in registry order, sequentially.
    pub fn evaluate_all(
        &self,
        names: &[String],
        window: &CandleWindow,
        ctx: &DetectorContext,
    ) -> Vec<(String, f64, Signal)> {
        self.order
            .iter()
            .filter(|n| names.contains(n))
            .filter_map(|name| {
                let entry = self.entries.get(name)?;
                let signal = entry.detector.evaluate(window, ctx);
                Some((name.clone(), entry.weight, signal))
            })
            .collect()
    }

    /// Same as `evaluate_all` but fans detector evaluation out across a
    /// scoped thread pool. Results are joined back in registry order before
    /// return, so aggregation sees the same sequence as the sequential path —
    /// parallelism here is for throughput only, never for ordering.
    pub fn evaluate_all_parallel(
        &self,
        names: &[String],
        window: &CandleWindow,
        ctx: &DetectorContext,
    ) -> Vec<(String, f64, Signal)> {
        let enabled: Vec<&String> = self.order.iter().filter(|n| names.contains(n)).collect();

        let mut results: Vec<Option<(String, f64, Signal)>> = vec![None; enabled.len()];

        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(enabled.len());
            for name in &enabled {
                let entry = self.entries.get(*name).expect("name came from self.order");
                handles.push(scope.spawn(move || entry.detector.evaluate(window, ctx)));
            }
            for (slot, (name, handle)) in results.iter_mut().zip(enabled.iter().zip(handles)) {
                let signal = handle.join().expect("detector evaluation panicked");
                let weight = self.entries.get(*name).expect("name came from self.order").weight;
                *slot = Some(((*name).clone(), weight, signal));
            }
        });

        results.into_iter().flatten().collect()
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn is_snake_case(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with('_')
        && !name.ends_with('_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    struct AlwaysHold(&'static str);

    impl Detector for AlwaysHold {
        fn name(&self) -> &str {
            self.0
        }

        fn evaluate(&self, _window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
            Signal::hold("always hold", 0)
        }
    }

    #[test]
    fn register_rejects_negative_weight() {
        let mut reg = DetectorRegistry::new();
        let err = reg.register(Box::new(AlwaysHold("a")), -1.0).unwrap_err();
        assert!(matches!(err, ConfigError::NegativeWeight { .. }));
    }

    #[test]
    fn register_rejects_non_snake_case_name() {
        let mut reg = DetectorRegistry::new();
        let err = reg
            .register(Box::new(AlwaysHold("NotSnakeCase")), 1.0)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDetectorName { .. }));
    }

    #[test]
    fn register_rejects_duplicate_name() {
        let mut reg = DetectorRegistry::new();
        reg.register(Box::new(AlwaysHold("dup")), 1.0).unwrap();
        let err = reg.register(Box::new(AlwaysHold("dup")), 1.0).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateDetector { .. }));
    }

    #[test]
    fn evaluate_all_preserves_registry_order() {
        let mut reg = DetectorRegistry::new();
        reg.register(Box::new(AlwaysHold("zeta")), 1.0).unwrap();
        reg.register(Box::new(AlwaysHold("alpha")), 1.0).unwrap();

        let window = CandleWindow::new(10);
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        let names: Vec<String> = vec!["zeta".into(), "alpha".into()];
        let results = reg.evaluate_all(&names, &window, &ctx);
        assert_eq!(results[0].0, "zeta");
        assert_eq!(results[1].0, "alpha");
    }

    #[test]
    fn evaluate_all_parallel_matches_sequential_order() {
        let mut reg = DetectorRegistry::new();
        reg.register(Box::new(AlwaysHold("b")), 1.0).unwrap();
        reg.register(Box::new(AlwaysHold("a")), 1.0).unwrap();

        let window = CandleWindow::new(10);
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        let names: Vec<String> = vec!["b".into(), "a".into()];
        let sequential = reg.evaluate_all(&names, &window, &ctx);
        let parallel = reg.evaluate_all_parallel(&names, &window, &ctx);
        let seq_names: Vec<_> = sequential.iter().map(|r| r.0.clone()).collect();
        let par_names: Vec<_> = parallel.iter().map(|r| r.0.clone()).collect();
        assert_eq!(seq_names, par_names);
    }

    #[test]
    fn empty_tags_still_pass_through_in_hold_signal() {
        let d = AlwaysHold("x");
        let window = CandleWindow::new(10);
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        let signal = d.evaluate(&window, &ctx);
        assert!(signal.is_hold());
        assert_eq!(signal.tags, BTreeSet::new());
    }
}
