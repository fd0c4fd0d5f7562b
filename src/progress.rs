use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Cosmetic waiting spinner shown while a provider call is in flight. It
/// carries no data; the ticker thread only animates the line. Dropping the
/// guard (any exit path, including Ctrl-C teardown) clears the line before
/// the result is printed.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("static spinner template"),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}
