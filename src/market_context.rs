// =============================================================================
// MarketContextAnalyzer — coarse regime classification + detector weight bias
// =============================================================================
//
// Grounded verbatim on market_manus/analysis/market_context_analyzer.py:
// classify a longer window as BULLISH / BEARISH / CORRECTION from MA slope,
// ADX and price-change-over-period, then derive multiplicative weight
// adjustments per named detector, blended with the regime confidence.
//
// This is a coarser, session-start analysis distinct from the per-evaluation
// regime *gate* inside ConfluenceEngine (see confluence::engine) — the gate
// rejects individual evaluations on weak ADX/ATR/BB-width; this module
// reweights detectors for an entire session.

use std::collections::BTreeMap;

use crate::candle::Bar;
use crate::indicators::adx::calculate_adx;
use crate::indicators::atr::calculate_atr_pct;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Bullish,
    Bearish,
    Correction,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Bullish => "BULLISH",
            Regime::Bearish => "BEARISH",
            Regime::Correction => "CORRECTION",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarketContext {
    pub regime: Regime,
    pub confidence: f64,
    pub trend_strength: f64,
    pub volatility: f64,
    pub price_change_pct: f64,
    pub recommendations: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct MarketContextConfig {
    pub adx_strong_threshold: f64,
    pub ma_slope_threshold: f64,
    pub ma_period: usize,
    pub slope_lookback: usize,
    pub adx_period: usize,
    pub atr_period: usize,
}

impl Default for MarketContextConfig {
    fn default() -> Self {
        Self {
            adx_strong_threshold: 25.0,
            ma_slope_threshold: 0.001,
            ma_period: 50,
            slope_lookback: 20,
            adx_period: 14,
            atr_period: 14,
        }
    }
}

pub struct MarketContextAnalyzer {
    pub config: MarketContextConfig,
}

impl Default for MarketContextAnalyzer {
    fn default() -> Self {
        Self {
            config: MarketContextConfig::default(),
        }
    }
}

fn linear_regression_slope(ys: &[f64]) -> f64 {
    let n = ys.len() as f64;
    if ys.len() < 2 {
        return 0.0;
    }
    let xs: Vec<f64> = (0..ys.len()).map(|i| i as f64).collect();
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
    let sum_xx: f64 = xs.iter().map(|x| x * x).sum();
    let denom = n * sum_xx - sum_x * sum_x;
    if denom == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}

impl MarketContextAnalyzer {
    /// `bars` should span the full analysis window (default 60 days of
    /// whatever timeframe the session trades). Returns `None` when there
    /// are fewer than 50 bars, mirroring the Python original's minimum.
    pub fn analyze(&self, bars: &[Bar]) -> Option<MarketContext> {
        if bars.len() < 50 {
            return None;
        }

        let ma_slope = self.calculate_ma_slope(bars);
        let adx = calculate_adx(bars, self.config.adx_period).unwrap_or(0.0);
        let volatility = calculate_atr_pct(bars, self.config.atr_period).unwrap_or(0.0);

        let first_close = bars.first()?.close;
        let last_close = bars.last()?.close;
        let price_change_pct = if first_close != 0.0 {
            ((last_close / first_close) - 1.0) * 100.0
        } else {
            0.0
        };

        let (regime, confidence) = self.determine_regime(ma_slope, adx, price_change_pct);
        let recommendations = self.generate_strategy_adjustments(regime, confidence);

        Some(MarketContext {
            regime,
            confidence,
            trend_strength: adx,
            volatility,
            price_change_pct,
            recommendations,
        })
    }

    fn calculate_ma_slope(&self, bars: &[Bar]) -> f64 {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let period = self.config.ma_period;
        if closes.len() < period {
            return 0.0;
        }

        let mut ma_series = Vec::with_capacity(closes.len() - period + 1);
        for i in (period - 1)..closes.len() {
            let window = &closes[i + 1 - period..=i];
            ma_series.push(window.iter().sum::<f64>() / period as f64);
        }

        let recent: Vec<f64> = ma_series
            .iter()
            .rev()
            .take(self.config.slope_lookback)
            .rev()
            .copied()
            .collect();
        if recent.len() < 2 {
            return 0.0;
        }

        let slope = linear_regression_slope(&recent);
        let avg_price = closes.iter().sum::<f64>() / closes.len() as f64;
        if avg_price > 0.0 {
            slope / avg_price
        } else {
            0.0
        }
    }

    fn determine_regime(&self, ma_slope: f64, adx: f64, price_change_pct: f64) -> (Regime, f64) {
        if adx > self.config.adx_strong_threshold {
            if ma_slope > self.config.ma_slope_threshold && price_change_pct > 5.0 {
                let confidence = ((adx / 50.0) * (ma_slope.abs() / 0.01)).min(1.0);
                return (Regime::Bullish, confidence);
            } else if ma_slope < -self.config.ma_slope_threshold && price_change_pct < -5.0 {
                let confidence = ((adx / 50.0) * (ma_slope.abs() / 0.01)).min(1.0);
                return (Regime::Bearish, confidence);
            }
        }

        if price_change_pct.abs() < 3.0 || adx < 20.0 {
            let confidence = 1.0 - (adx / 30.0);
            return (Regime::Correction, confidence.max(0.0));
        }

        if ma_slope > 0.0 && price_change_pct > 0.0 {
            let confidence = 0.5 + (adx / 50.0) * 0.3;
            return (Regime::Bullish, confidence);
        }
        if ma_slope < 0.0 && price_change_pct < 0.0 {
            let confidence = 0.5 + (adx / 50.0) * 0.3;
            return (Regime::Bearish, confidence);
        }

        (Regime::Correction, 0.3)
    }

    fn generate_strategy_adjustments(
        &self,
        regime: Regime,
        confidence: f64,
    ) -> BTreeMap<String, f64> {
        let base: &[(&str, f64)] = match regime {
            Regime::Bullish => &[
                ("ema_crossover", 1.3),
                ("macd", 1.2),
                ("adx", 1.3),
                ("smc_bos", 1.2),
                ("rsi_mean_reversion", 0.8),
                ("bollinger_breakout", 1.1),
                ("stochastic", 0.9),
                ("smc_choch", 0.7),
            ],
            Regime::Bearish => &[
                ("rsi_mean_reversion", 1.2),
                ("smc_choch", 1.3),
                ("macd", 1.1),
                ("ema_crossover", 0.8),
                ("smc_bos", 0.7),
                ("bollinger_breakout", 1.0),
                ("stochastic", 1.1),
            ],
            Regime::Correction => &[
                ("rsi_mean_reversion", 1.4),
                ("bollinger_breakout", 1.3),
                ("stochastic", 1.2),
                ("smc_order_blocks", 1.2),
                ("smc_fvg", 1.1),
                ("ema_crossover", 0.7),
                ("adx", 0.6),
                ("smc_bos", 0.5),
            ],
        };

        base.iter()
            .map(|&(name, multiplier)| {
                let blended = if multiplier > 1.0 {
                    1.0 + (multiplier - 1.0) * confidence
                } else {
                    1.0 - (1.0 - multiplier) * confidence
                };
                (name.to_string(), blended)
            })
            .collect()
    }
}

/// Applies `ctx.recommendations` (already confidence-blended) to a base
/// weight, per spec: `effective = base_weight * multiplier`, defaulting the
/// multiplier to 1.0 for detectors the regime has no opinion on.
pub fn effective_weight(ctx: &MarketContext, detector_name: &str, base_weight: f64) -> f64 {
    let multiplier = ctx
        .recommendations
        .get(detector_name)
        .copied()
        .unwrap_or(1.0);
    base_weight * multiplier
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_bars(n: usize, start: f64, step: f64) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = start + step * i as f64;
                Bar::new(i as i64, c, c + 1.0, c - 1.0, c, 100.0)
            })
            .collect()
    }

    #[test]
    fn insufficient_bars_returns_none() {
        let analyzer = MarketContextAnalyzer::default();
        let bars = trending_bars(10, 100.0, 1.0);
        assert!(analyzer.analyze(&bars).is_none());
    }

    #[test]
    fn strong_uptrend_classified_bullish() {
        let analyzer = MarketContextAnalyzer::default();
        let bars = trending_bars(100, 100.0, 2.0);
        let ctx = analyzer.analyze(&bars).unwrap();
        assert_eq!(ctx.regime, Regime::Bullish);
        assert!(ctx.confidence > 0.0);
    }

    #[test]
    fn flat_market_classified_correction() {
        let analyzer = MarketContextAnalyzer::default();
        let bars = trending_bars(100, 100.0, 0.0);
        let ctx = analyzer.analyze(&bars).unwrap();
        assert_eq!(ctx.regime, Regime::Correction);
    }

    #[test]
    fn bullish_recommendations_upweight_trend_detectors() {
        let analyzer = MarketContextAnalyzer::default();
        let bars = trending_bars(100, 100.0, 2.0);
        let ctx = analyzer.analyze(&bars).unwrap();
        let ema_weight = ctx.recommendations.get("ema_crossover").copied().unwrap();
        assert!(ema_weight >= 1.0);
    }

    #[test]
    fn effective_weight_applies_multiplier() {
        let mut recommendations = BTreeMap::new();
        recommendations.insert("ema_crossover".to_string(), 1.3);
        let ctx = MarketContext {
            regime: Regime::Bullish,
            confidence: 1.0,
            trend_strength: 30.0,
            volatility: 1.0,
            price_change_pct: 10.0,
            recommendations,
        };
        assert!((effective_weight(&ctx, "ema_crossover", 1.0) - 1.3).abs() < 1e-9);
        assert!((effective_weight(&ctx, "unknown", 1.0) - 1.0).abs() < 1e-9);
    }
}
