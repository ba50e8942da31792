//! Load spinner that becomes a no-op when the `progress` feature is disabled

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "progress")]
use std::time::Duration;

/// Spinner shown on stderr while the dictionary is being indexed
pub struct LoadSpinner {
    #[cfg(feature = "progress")]
    bar: Option<ProgressBar>,
}

impl LoadSpinner {
    /// Start a spinner, or a silent stand-in when `quiet`
    #[cfg_attr(not(feature = "progress"), allow(unused_variables))]
    pub fn start(message: &str, quiet: bool) -> Self {
        #[cfg(feature = "progress")]
        {
            let bar = (!quiet).then(|| {
                let spinner = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                    spinner.set_style(style);
                }
                spinner.set_message(message.to_string());
                spinner.enable_steady_tick(Duration::from_millis(80));
                spinner
            });
            Self { bar }
        }

        #[cfg(not(feature = "progress"))]
        {
            Self {}
        }
    }

    #[cfg_attr(not(feature = "progress"), allow(unused_variables))]
    pub fn finish(self, message: String) {
        #[cfg(feature = "progress")]
        if let Some(bar) = self.bar {
            bar.finish_with_message(message);
        }
    }

    pub fn abandon(self) {
        #[cfg(feature = "progress")]
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
