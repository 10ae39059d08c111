//! Terminal output for operation messages

use std::cell::RefCell;

use indicatif::{ProgressBar, ProgressStyle};
use pcmflash_core::Logger;

/// Prints user messages and draws a progress bar during transfers
///
/// Debug messages go to the `log` facade and show up with `-v`.
#[derive(Default)]
pub struct ConsoleLogger {
    bar: RefCell<Option<ProgressBar>>,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn create_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) Writing",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }

    /// Finish any bar still on screen
    pub fn finish(&self) {
        if let Some(pb) = self.bar.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }
}

impl Logger for ConsoleLogger {
    fn user_message(&self, message: &str) {
        match self.bar.borrow().as_ref() {
            Some(pb) => pb.println(message),
            None => println!("{}", message),
        }
    }

    fn debug_message(&self, message: &str) {
        log::debug!("{}", message);
    }

    fn progress(&self, done: usize, total: usize) {
        let mut bar = self.bar.borrow_mut();
        let pb = bar.get_or_insert_with(|| Self::create_bar(total as u64));
        pb.set_position(done as u64);
        if done >= total {
            pb.finish_with_message("Write complete");
            *bar = None;
        }
    }
}

impl Drop for ConsoleLogger {
    fn drop(&mut self) {
        self.finish();
    }
}
