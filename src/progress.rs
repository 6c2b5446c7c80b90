//! Progress reporting using indicatif.
//!
//! The engine reports through the [`ProgressCallback`] trait so library users
//! can plug in their own sink; [`Progress`] draws terminal bars for the CLI.
//! Phases reported by the engine: `walking`, `indexing`, `similarity`,
//! `applying`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress callback for engine stages.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts; `total` is 0 when unknown.
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed in the current phase.
    ///
    /// `current` is a running count; with parallel workers it is not
    /// guaranteed to arrive in order.
    fn on_progress(&self, current: usize, item: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called with a free-form status message.
    fn on_message(&self, _message: &str) {}
}

/// Terminal progress reporter.
pub struct Progress {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
    active: Mutex<Option<String>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter; `quiet` hides all bars.
    ///
    /// # Examples
    ///
    /// ```
    /// use treetidy::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
            active: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn label(phase: &str) -> &str {
        match phase {
            "walking" => "Walking directory",
            "indexing" => "Hashing",
            "similarity" => "Comparing",
            "applying" => "Applying",
            other => other,
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = if total == 0 {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::bar_style());
            pb
        };
        pb.set_message(Self::label(phase).to_string());

        self.bars.lock().unwrap().insert(phase.to_string(), pb);
        *self.active.lock().unwrap() = Some(phase.to_string());
    }

    fn on_progress(&self, current: usize, item: &str) {
        if self.quiet {
            return;
        }

        let active = self.active.lock().unwrap();
        if let Some(phase) = active.as_deref() {
            if let Some(pb) = self.bars.lock().unwrap().get(phase) {
                pb.set_position(current as u64);
                pb.set_message(format!("{}: {}", Self::label(phase), truncate_path(item, 30)));
            }
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        if let Some(pb) = self.bars.lock().unwrap().remove(phase) {
            pb.finish_with_message(format!("{} complete", Self::label(phase)));
        }
        let mut active = self.active.lock().unwrap();
        if active.as_deref() == Some(phase) {
            *active = None;
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        let active = self.active.lock().unwrap();
        if let Some(phase) = active.as_deref() {
            if let Some(pb) = self.bars.lock().unwrap().get(phase) {
                pb.set_message(message.to_string());
            }
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
