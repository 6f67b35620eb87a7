// =============================================================================
// RealTimeDriver — bounded-queue streaming evaluation with state-change gating
// =============================================================================
//
// Grounded on spec.md §4.4's gating/evaluate/emit algorithm and §5's
// concurrency model: a populate task reads `DataProvider::stream_klines` and
// forwards bar events through a bounded `tokio::mpsc` channel (default
// capacity 256); the driver task owns the candle window and counters and
// drains that channel; an optional UI-refresh task reads a snapshot of the
// counters behind a `parking_lot::RwLock`, mirroring the teacher's
// `market_data/trade_stream.rs` reader-task/`Arc<RwLock<_>>` shape. Reconnect
// backoff (1s doubling to 30s, up to 30% jitter, reset on first message) is
// grounded on spec.md §5's "Cancellation & timeouts" clause.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::candle::{BarEvent, CandleWindow};
use crate::confluence::ConfluenceEngine;
use crate::data_provider::DataProvider;
use crate::detector::{DetectorContext, DetectorRegistry};
use crate::signal::{Action, Signal};
use crate::volume_filter::{calculate_volume_zscore, VolumeFilter};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const JITTER_FRACTION: f64 = 0.30;

#[derive(Debug, Clone, Copy, Default)]
pub struct DriverCounters {
    pub bars_processed: u64,
    pub bars_dropped_duplicate: u64,
    pub decisions_emitted: u64,
    pub buy_decisions: u64,
    pub sell_decisions: u64,
    pub state_changes: u64,
}

/// Read-only snapshot handle the UI-refresh task polls. Never mutates —
/// spec.md §5: "it reads a snapshot of the driver state ... and MUST NOT
/// mutate it."
#[derive(Clone)]
pub struct CounterSnapshot(Arc<RwLock<DriverCounters>>);

impl CounterSnapshot {
    pub fn get(&self) -> DriverCounters {
        *self.0.read()
    }
}

/// Invoked only on a state change (spec.md §4.4 step 4). Implementations
/// MUST be non-blocking; slow consumers buffer on their own side.
pub trait OnDecision: Send + Sync {
    fn decide(&self, signal: &Signal);
}

impl<F: Fn(&Signal) + Send + Sync> OnDecision for F {
    fn decide(&self, signal: &Signal) {
        self(signal)
    }
}

pub struct RealTimeDriver {
    registry: Arc<DetectorRegistry>,
    enabled: Vec<String>,
    engine: ConfluenceEngine,
    volume_filter: VolumeFilter,
    window: CandleWindow,
    last_processed_timestamp: Option<i64>,
    last_emitted_action: Option<Action>,
    counters: Arc<RwLock<DriverCounters>>,
    symbol: String,
    timeframe: String,
}

impl RealTimeDriver {
    pub fn new(
        registry: Arc<DetectorRegistry>,
        enabled: Vec<String>,
        engine: ConfluenceEngine,
        volume_filter: VolumeFilter,
        window_capacity: usize,
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            enabled,
            engine,
            volume_filter,
            window: CandleWindow::new(window_capacity),
            last_processed_timestamp: None,
            last_emitted_action: None,
            counters: Arc::new(RwLock::new(DriverCounters::default())),
            symbol: symbol.into(),
            timeframe: timeframe.into(),
        }
    }

    pub fn counter_snapshot(&self) -> CounterSnapshot {
        CounterSnapshot(self.counters.clone())
    }

    /// Spawns the populate task (stream reader with reconnect backoff) and
    /// drives the bounded queue until `stop` is set, invoking `on_decision`
    /// on every state change. Returns when the stream ends or `stop` fires.
    pub async fn run(
        &mut self,
        provider: Arc<dyn DataProvider>,
        queue_capacity: usize,
        on_decision: Arc<dyn OnDecision>,
        stop: Arc<AtomicBool>,
    ) {
        let (tx, mut rx) = mpsc::channel::<BarEvent>(queue_capacity.max(1));

        let symbol = self.symbol.clone();
        let timeframe = self.timeframe.clone();
        let stop_for_populate = stop.clone();
        let populate_provider = provider.clone();
        let populate = tokio::spawn(async move {
            populate_task(populate_provider, symbol, timeframe, tx, stop_for_populate).await;
        });

        while !stop.load(Ordering::Relaxed) {
            match rx.recv().await {
                Some(event) => self.on_bar_event(event, on_decision.as_ref()),
                None => break,
            }
        }

        populate.abort();
    }

    /// The per-event gating/evaluate/emit logic from spec.md §4.4, exposed
    /// directly so tests can drive it without an async runtime.
    pub fn on_bar_event(&mut self, event: BarEvent, on_decision: &dyn OnDecision) {
        if Some(event.bar.timestamp) == self.last_processed_timestamp {
            self.counters.write().bars_dropped_duplicate += 1;
            return;
        }
        self.last_processed_timestamp = Some(event.bar.timestamp);

        if event.is_closed {
            self.window.push_closed(event.bar);
        } else {
            self.window.update_forming(event.bar);
        }

        let ctx = DetectorContext::new(&self.symbol, &self.timeframe);
        let raw_signal = self
            .engine
            .evaluate(&self.registry, &self.enabled, &self.window, &ctx);

        let volumes = self.window.volumes();
        let zscores = calculate_volume_zscore(&volumes, self.volume_filter.config.lookback_period);
        let zscore = zscores.last().copied().unwrap_or(0.0);
        let signal = self.volume_filter.filter_signal(&raw_signal, zscore);

        self.counters.write().bars_processed += 1;

        let is_state_change = match self.last_emitted_action {
            None => signal.action != Action::Hold,
            Some(last) => signal.action != last,
        };

        if is_state_change {
            {
                let mut counters = self.counters.write();
                counters.state_changes += 1;
                counters.decisions_emitted += 1;
                match signal.action {
                    Action::Buy => counters.buy_decisions += 1,
                    Action::Sell => counters.sell_decisions += 1,
                    Action::Hold => {}
                }
            }
            self.last_emitted_action = Some(signal.action);
            on_decision.decide(&signal);
        }
    }
}

async fn populate_task(
    provider: Arc<dyn DataProvider>,
    symbol: String,
    timeframe: String,
    tx: mpsc::Sender<BarEvent>,
    stop: Arc<AtomicBool>,
) {
    let mut backoff = INITIAL_BACKOFF;

    while !stop.load(Ordering::Relaxed) {
        let mut stream = provider.stream_klines(&symbol, &timeframe);
        let mut received_any = false;

        loop {
            use futures_util::StreamExt;
            tokio::select! {
                biased;
                _ = wait_for_stop(&stop) => return,
                next = stream.next() => {
                    match next {
                        Some(event) => {
                            if !received_any {
                                backoff = INITIAL_BACKOFF;
                                received_any = true;
                            }
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        if stop.load(Ordering::Relaxed) {
            return;
        }

        warn!(?backoff, "stream ended, reconnecting with backoff");
        let jitter = rand::thread_rng().gen_range(0.0..JITTER_FRACTION);
        let sleep_for = backoff.mul_f64(1.0 + jitter);
        tokio::time::sleep(sleep_for).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn wait_for_stop(stop: &Arc<AtomicBool>) {
    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
