pub mod engine;
pub mod vote;

pub use engine::{ConfluenceEngine, RegimeConfig, RegimeSnapshot};
pub use vote::{
    aggregate_votes, votes_from_contributions, AgreementStats, ShadowComparisonResult,
    ShadowModeValidator, Vote, VoteMode,
};
