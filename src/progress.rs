use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::layout::IterationStats;

const BAR_CHARS: &str = "█▓░";

/// Progress bar over the layout's iteration budget. The message shows the
/// current temperature and mean displacement.
pub fn layout_progress_bar(iterations: usize) -> ProgressBar {
    let pb = ProgressBar::new(iterations as u64);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    let style = ProgressStyle::with_template(
        "{prefix:.bold.dim} {spinner:.green} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} iterations {msg}",
    )
    .map(|s| s.progress_chars(BAR_CHARS))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix("layout");
    pb.enable_steady_tick(Duration::from_millis(75));
    pb
}

/// Advances `pb` for one finished iteration.
pub fn record_iteration(pb: &ProgressBar, stats: &IterationStats) {
    pb.set_position(stats.iteration as u64 + 1);
    pb.set_message(format!(
        "t={:.4} step={:.2e}",
        stats.temperature, stats.mean_displacement
    ));
}

/// Spinner for stages without a known length (rendering, encoding).
pub fn spinner_progress(label: impl Into<String>, message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{prefix:.bold.dim} {spinner:.green} {msg} [{elapsed_precise}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_prefix(label.into());
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(75));
    pb
}
