use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use staging_monitor::ProgressSink;

const TEMPLATE: &str = "{spinner:.blue} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Terminal progress bar advanced once per finished photo.
#[derive(Debug, Clone)]
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    /// Bar of `total` photos attached to `multi`, or a hidden one when quiet.
    pub fn new(multi: &MultiProgress, total: usize, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::hidden())
        } else {
            multi.add(ProgressBar::new(total as u64))
        };
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_message("photos");
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressSink for BarProgress {
    fn advance(&self, n: u64) {
        self.bar.inc(n);
    }

    fn finish(&self) {
        if self.bar.position() >= self.bar.length().unwrap_or(0) {
            self.bar.finish_with_message("done");
        } else {
            self.bar.abandon();
        }
    }
}
