use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::stabilize::ReadingSnapshot;

#[derive(Clone, Copy, Debug)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

/// Terminal meter for recognition progress.
///
/// Pretty mode renders an indicatif bar tracking `progress_pct` with the
/// current reading and confirmed labels in the message. Plain mode (non-TTY,
/// or selected explicitly) prints a line whenever the reading changes or a
/// label is confirmed, which keeps piped output readable.
pub struct ProgressMeter {
    bar: Option<ProgressBar>,
    last_reading: String,
    last_confirmed: String,
}

impl ProgressMeter {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        let use_pretty = match mode {
            UiMode::Pretty => true,
            UiMode::Auto => is_tty,
            UiMode::Plain => false,
        };

        let bar = if use_pretty {
            let bar = ProgressBar::new(100);
            bar.set_draw_target(ProgressDrawTarget::stderr());
            let style = ProgressStyle::with_template("{bar:30} {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            Some(bar)
        } else {
            None
        };

        Self {
            bar,
            last_reading: String::new(),
            last_confirmed: String::new(),
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty)
    }

    /// Reflect one published snapshot on the terminal.
    pub fn update(&mut self, snapshot: &ReadingSnapshot) {
        if let Some(bar) = &self.bar {
            bar.set_position(snapshot.progress_pct.round() as u64);
            bar.set_message(format!(
                "reading '{}' confirmed '{}'",
                snapshot.reading_label, snapshot.confirmed_label
            ));
        } else if snapshot.reading_label != self.last_reading
            || snapshot.confirmed_label != self.last_confirmed
        {
            eprintln!(
                "reading '{}' ({:.0}%) confirmed '{}'",
                snapshot.reading_label, snapshot.progress_pct, snapshot.confirmed_label
            );
        }
        self.last_reading = snapshot.reading_label.clone();
        self.last_confirmed = snapshot.confirmed_label.clone();
    }

    pub fn finish(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.to_string());
        } else {
            eprintln!("{message}");
        }
    }
}
