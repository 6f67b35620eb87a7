// =============================================================================
// Smart Money Concept (SMC) detectors
// =============================================================================
//
// Grounded verbatim on `market_manus/strategies/smc/market_structure.py`
// (BOS, CHoCH, Order Blocks, Liquidity Sweep) and
// `market_manus/strategies/smc/context.py`'s `detect_fvg_context` (FVG).
//
// The Python originals carry a `MarketStructureState` object mutated across
// calls (`last_bos`, `order_blocks`, ...). Per spec.md §4.1, a Detector here
// may derive state but must recompute it deterministically from the window
// alone — no accumulator survives between `evaluate` calls. Where the
// original reads `state.last_bos`, these detectors instead replay the same
// rule across the window's history to reconstruct it.

pub mod bos;
pub mod choch;
pub mod fvg;
pub mod liquidity_sweep;
pub mod order_blocks;

pub use bos::SmcBosDetector;
pub use choch::SmcChochDetector;
pub use fvg::SmcFvgDetector;
pub use liquidity_sweep::SmcLiquiditySweepDetector;
pub use order_blocks::SmcOrderBlocksDetector;
