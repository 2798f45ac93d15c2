// Camera capture module
// Runs an external capture tool that writes a photo to a fixed path, then loads it

use crate::image_loader::{self, ImageData};
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Placeholder replaced by the output path in capture commands
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Default capture file name inside the temp directory
pub const DEFAULT_CAPTURE_FILE: &str = "tmp_ocr.jpg";

/// Camera tools tried in order when no command is configured
const FALLBACK_TOOLS: &[&str] = &[
    "fswebcam --no-banner -r 1280x720 {output}",
    "libcamera-still -n -o {output}",
];

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Where the capture tool writes the photo
    pub output: PathBuf,
    /// User supplied command line, `{output}` is substituted
    pub command: Option<String>,
    /// Scale applied when loading the photo
    pub scale: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output: std::env::temp_dir().join(DEFAULT_CAPTURE_FILE),
            command: None,
            scale: 1.0,
        }
    }
}

/// Split a command template into program and arguments
fn build_command(template: &str, output: &Path) -> Result<Command> {
    let output = output.to_string_lossy();
    let mut parts: Vec<String> = template.split_whitespace().map(str::to_string).collect();
    if parts.is_empty() {
        bail!("Capture command is empty");
    }

    if parts.iter().any(|p| p.contains(OUTPUT_PLACEHOLDER)) {
        for part in parts.iter_mut() {
            *part = part.replace(OUTPUT_PLACEHOLDER, &output);
        }
    } else {
        parts.push(output.into_owned());
    }

    let mut command = Command::new(&parts[0]);
    command.args(&parts[1..]);
    Ok(command)
}

/// Run one command to completion; `Ok(false)` means the program does not exist
fn run(template: &str, output: &Path) -> Result<bool> {
    let mut command = build_command(template, output)?;
    debug!("Running capture command: {:?}", command);

    let status = match command.status() {
        Ok(status) => status,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e).with_context(|| format!("Failed to start `{template}`")),
    };

    if !status.success() {
        bail!("Capture command `{}` exited with {}", template, status);
    }
    Ok(true)
}

/// Try each tool in turn until one exits successfully
fn run_fallbacks(tools: &[&str], output: &Path) -> Result<()> {
    let mut last_error = None;
    for tool in tools {
        match run(tool, output) {
            Ok(true) => return Ok(()),
            Ok(false) => warn!("Capture tool not available: {}", tool),
            Err(e) => {
                warn!("Capture tool failed: {:#}", e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => Err(e.context("All capture tools failed")),
        None => bail!(
            "No capture tool found. Install fswebcam or libcamera-apps, or pass --capture-cmd."
        ),
    }
}

/// Take a photo and decode it
pub fn capture(config: &CaptureConfig) -> Result<ImageData> {
    // A stale photo from an earlier run must not be mistaken for a new one
    if config.output.exists() {
        std::fs::remove_file(&config.output)
            .with_context(|| format!("Failed to remove {}", config.output.display()))?;
    }

    match config.command {
        Some(ref template) => {
            if !run(template, &config.output)? {
                bail!("Capture program not found: {}", template);
            }
        }
        None => run_fallbacks(FALLBACK_TOOLS, &config.output)?,
    }

    if !config.output.exists() {
        bail!(
            "Capture finished but no image was written to {}",
            config.output.display()
        );
    }

    let image = image_loader::load_from_path(&config.output, config.scale)?;
    info!("Captured {}x{} image", image.width, image.height);
    Ok(image)
}
