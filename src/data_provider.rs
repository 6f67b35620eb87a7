// =============================================================================
// DataProvider — the engine's sole external-data boundary
// =============================================================================
//
// An abstract interface; the host binary supplies a concrete implementation
// (an exchange REST/WS client, a CSV replay reader, …). Grounded on spec.md
// §6 and the teacher's `market_data/trade_stream.rs` for the async/Arc<RwLock>
// idiom this crate's own streaming code no longer needs directly, since the
// transport itself (Binance WS/REST) is out of scope here.

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;

use crate::candle::{Bar, BarEvent};

/// The historical-batch + live-stream interface every data source must
/// implement. `fetch_klines` is finite and paginated internally by the
/// implementor; `stream_klines` yields forever until dropped or the stream
/// ends upstream.
pub trait DataProvider: Send + Sync {
    /// Ordered, chronological bars in `[start_ts_ms, end_ts_ms)`, capped at
    /// `limit` per underlying request (the implementor pages internally if
    /// the range needs more).
    fn fetch_klines(
        &self,
        symbol: &str,
        timeframe: &str,
        start_ts_ms: i64,
        end_ts_ms: i64,
        limit: usize,
    ) -> BoxFuture<'_, anyhow::Result<Vec<Bar>>>;

    /// A live stream of bar events. A forming bar may be emitted more than
    /// once with the same timestamp; consumers dedupe per §4.4's gating
    /// rule rather than relying on the provider to do it.
    fn stream_klines(&self, symbol: &str, timeframe: &str) -> BoxStream<'_, BarEvent>;

    /// Cheap connectivity check; MUST NOT perform a full data fetch.
    fn test_connection(&self) -> BoxFuture<'_, bool>;
}
