//! Weighted consensus domain
//!
//! Turns several independent, sometimes failing opinions into one auditable
//! verdict. Used two ways:
//!
//! - **Trade validation**: validator roles vote approve / reject / abstain on
//!   a proposed decision; [`ConsensusResult::tally`] applies a
//!   [`ConsensusPolicy`].
//! - **Sentiment aggregation**: unweighted evaluations of one news item are
//!   combined field by field ([`sentiment::aggregate`]).
//!
//! Both are pure: querying the voters is the application layer's job.

pub mod parsing;
pub mod policy;
pub mod role;
pub mod sentiment;
pub mod tally;
pub mod vote;

pub use parsing::parse_vote_response;
pub use policy::ConsensusPolicy;
pub use role::{ValidationRequest, ValidatorRole};
pub use sentiment::{SentimentAggregate, SentimentEvaluation, Urgency};
pub use tally::ConsensusResult;
pub use vote::{Verdict, Vote};
