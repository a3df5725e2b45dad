//! Orchestration over the lower-level crates.
//! Each stage takes resolved settings and an open store, and returns a summary.

use std::time::Duration;

pub use sheetloc_core::Result;

pub mod chat;
pub mod check;
pub mod extract;
pub mod reinject;
pub mod review;
pub mod translate;

pub use chat::ChatClient;
pub use check::{run_check, CheckOptions};
pub use extract::extract_and_push;
pub use reinject::reinject;
pub use review::{ChatReviewer, PassthroughReviewer, Reviewer};
pub use translate::{
    group_blocks, matches_filter, run_translate, Block, BlockLine, BlockRequest, ChatTranslator,
    PassthroughTranslator, TranslateOptions, Translator,
};

/// Fixed pause between table-level writes, independent of the retry policy.
#[derive(Debug)]
pub struct Throttle {
    cooldown: Duration,
    primed: bool,
}

impl Throttle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            primed: false,
        }
    }

    /// Sleep unless this is the first write of the run.
    pub fn before_write(&mut self, what: &str) {
        if self.primed && !self.cooldown.is_zero() {
            tracing::debug!(event = "store_cooldown", next = what, ms = self.cooldown.as_millis() as u64);
            std::thread::sleep(self.cooldown);
        }
        self.primed = true;
    }
}
