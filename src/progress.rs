//! Progress reporting for visibility replacement
//!
//! Replacing a repository's visibility rows walks every commit in its
//! graph, which on large repositories takes long enough that interactive
//! callers want feedback while the stream drains. Library and test callers
//! pass `Silent`.

use indicatif::{ProgressBar, ProgressStyle};

/// How store writes report their progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// No output
    Silent,
    /// A terminal bar counting emitted envelopes against the graph's
    /// commit count, labelled with the repository being replaced
    Bar,
}

impl Progress {
    /// Begin tracking one repository's visibility replacement over a graph
    /// of `commits` commits.
    pub fn start_replace(self, repository_id: i64, commits: u64) -> ReplaceProgress {
        match self {
            Progress::Silent => ReplaceProgress { bar: None },
            Progress::Bar => {
                let bar = ProgressBar::new(commits);
                if let Ok(style) =
                    ProgressStyle::with_template("repo {msg} [{bar:32}] {pos}/{len} commits")
                {
                    bar.set_style(style.progress_chars("#>-"));
                }
                bar.set_message(repository_id.to_string());
                ReplaceProgress { bar: Some(bar) }
            }
        }
    }
}

/// An in-flight replacement being tracked.
pub struct ReplaceProgress {
    bar: Option<ProgressBar>,
}

impl ReplaceProgress {
    /// Record one envelope handed to the store.
    pub fn envelope_written(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    /// Tear the bar down once the replacement lands. Not every commit
    /// produces an envelope, so the bar need not be full here.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
