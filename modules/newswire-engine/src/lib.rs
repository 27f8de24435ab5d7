pub mod adjudicator;
mod claude;
pub mod dedup;
pub mod grouper;
pub mod merger;
pub mod pipeline;
pub mod similarity;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod urlnorm;
pub mod vendor;

pub use adjudicator::{adjudicate, ClaudeJudge, PairContext, StoryJudge};
pub use dedup::{resolve, DedupOutcome};
pub use grouper::run_grouper;
pub use merger::deep_merge;
pub use pipeline::{run_pass, PassStats};
pub use traits::StoryStore;
pub use urlnorm::normalize_url;
