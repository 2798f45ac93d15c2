// Application state module
// Holds the captured bitmap and threshold and reacts to user commands

use crate::binarize;
use crate::image_loader::{self, ImageData};
use crate::recognizer::Recognizer;
use anyhow::Result;
use image::RgbImage;
use log::{debug, error, info};
use std::path::PathBuf;

pub const MIN_THRESHOLD: i32 = 0;
pub const MAX_THRESHOLD: i32 = 255;
pub const DEFAULT_THRESHOLD: u8 = 150;

/// Result of one binarize + recognize pass
#[derive(Debug)]
pub struct Outcome {
    /// The binarized image that was handed to the recognizer
    pub binarized: RgbImage,
    /// Recognized text, or a message describing what went wrong
    pub text: Result<String, String>,
}

/// A single user command in interactive mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetThreshold(i32),
    Nudge(i32),
    Capture,
    Rerun,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        match line {
            "" => return Ok(Command::Rerun),
            "c" | "capture" => return Ok(Command::Capture),
            "q" | "quit" | "exit" => return Ok(Command::Quit),
            "h" | "help" | "?" => return Ok(Command::Help),
            _ => {}
        }

        if let Some(rest) = line.strip_prefix('+') {
            return parse_step(rest).map(Command::Nudge);
        }
        if let Some(rest) = line.strip_prefix('-') {
            return parse_step(rest).and_then(|step| {
                step.checked_neg()
                    .map(Command::Nudge)
                    .ok_or_else(|| format!("Invalid step: {rest}"))
            });
        }

        line.parse::<i32>()
            .map(Command::SetThreshold)
            .map_err(|_| format!("Unknown command: {line}"))
    }
}

fn parse_step(s: &str) -> Result<i32, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(1);
    }
    s.parse::<i32>()
        .map_err(|_| format!("Invalid step: {s}"))
}

pub const HELP: &str = "\
Commands:
  <0-255>     set the threshold
  + [N] / - [N]  raise or lower the threshold by N (default 1)
  c, capture  take a new photo
  <enter>     run recognition again
  h, help     show this help
  q, quit     exit";

/// What the caller should do after handling a command
#[derive(Debug)]
pub enum Step {
    /// Processing produced an outcome to show
    Show(Outcome),
    /// Nothing to show, only a message
    Message(String),
    Quit,
}

/// Main application state
pub struct App<R: Recognizer> {
    /// The current captured bitmap
    image: Option<ImageData>,
    /// Binarization threshold, kept within slider bounds
    threshold: u8,
    /// Where the binarized image is written after each pass
    preview_path: Option<PathBuf>,
    recognizer: R,
}

impl<R: Recognizer> App<R> {
    /// Create a new application state
    pub fn new(recognizer: R, threshold: u8, preview_path: Option<PathBuf>) -> Self {
        Self {
            image: None,
            threshold,
            preview_path,
            recognizer,
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Set the threshold, clamped to 0..=255
    pub fn set_threshold(&mut self, value: i32) {
        self.threshold = value.clamp(MIN_THRESHOLD, MAX_THRESHOLD) as u8;
        info!("Threshold set to {}", self.threshold);
    }

    /// Move the threshold by `delta`, clamped to 0..=255
    pub fn nudge_threshold(&mut self, delta: i32) {
        self.set_threshold((self.threshold as i32).saturating_add(delta));
    }

    /// Replace the captured bitmap
    pub fn set_image(&mut self, image: ImageData) {
        debug!("New image: {}x{}", image.width, image.height);
        self.image = Some(image);
    }

    /// Binarize the current bitmap and run recognition on it.
    ///
    /// Returns `None` when nothing has been captured yet.
    pub fn binarize_and_recognize(&self) -> Option<Outcome> {
        let image = self.image.as_ref()?;

        let binarized = match binarize::binarize_raw(
            image.width,
            image.height,
            &image.rgba_data,
            self.threshold as u16,
        ) {
            Ok(img) => img,
            Err(e) => {
                error!("Binarization failed: {}", e);
                return Some(Outcome {
                    binarized: RgbImage::new(0, 0),
                    text: Err(e.to_string()),
                });
            }
        };

        if let Some(ref path) = self.preview_path {
            if let Err(e) = image_loader::save_preview(&binarized, path) {
                error!("{:#}", e);
            }
        }

        let text = self.recognizer.recognize(&binarized).map_err(|e| {
            error!("Recognition failed: {}", e);
            e.to_string()
        });

        Some(Outcome { binarized, text })
    }

    /// Handle one command. `capture` is called for `Command::Capture`.
    pub fn handle<F>(&mut self, command: Command, capture: F) -> Step
    where
        F: FnOnce() -> Result<ImageData>,
    {
        match command {
            Command::Quit => return Step::Quit,
            Command::Help => return Step::Message(HELP.to_string()),
            Command::SetThreshold(value) => self.set_threshold(value),
            Command::Nudge(delta) => self.nudge_threshold(delta),
            Command::Capture => match capture() {
                Ok(image) => self.set_image(image),
                Err(e) => return Step::Message(format!("Capture failed: {e:#}")),
            },
            Command::Rerun => {}
        }

        match self.binarize_and_recognize() {
            Some(outcome) => Step::Show(outcome),
            None => Step::Message(format!(
                "Threshold {}. No image yet, use `c` to capture one.",
                self.threshold
            )),
        }
    }
}
