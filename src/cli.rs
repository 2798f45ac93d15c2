// Command line interface module
// Handles parsing of command line arguments and stdin input

use crate::app::DEFAULT_THRESHOLD;
use crate::capture::{CaptureConfig, DEFAULT_CAPTURE_FILE};
use crate::recognizer::DIGITS;
use anyhow::{bail, Result};
use clap::Parser;
use log::debug;
use std::io::{self, Read};
use std::path::PathBuf;

/// digitsnap - Read digits from a photo with Tesseract
#[derive(Parser, Debug)]
#[command(name = "digitsnap")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the image file (can also be provided via stdin pipe)
    #[arg(value_name = "IMAGE")]
    pub image_path: Option<PathBuf>,

    /// Binarization threshold (0 - 255)
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
    pub threshold: u8,

    /// Take a photo with the camera when no IMAGE is given
    #[arg(long, default_value = "false")]
    pub capture: bool,

    /// Camera command; `{output}` is replaced by the capture path
    #[arg(long, env = "DIGITSNAP_CAPTURE_CMD")]
    pub capture_cmd: Option<String>,

    /// File the camera command writes to
    #[arg(long, env = "DIGITSNAP_CAPTURE_PATH")]
    pub capture_path: Option<PathBuf>,

    /// Directory holding tessdata/ (default: <data dir>/digitsnap/learn)
    #[arg(long, env = "DIGITSNAP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory the trained data is copied from on first run
    #[arg(long, env = "DIGITSNAP_ASSETS", default_value = "assets")]
    pub assets: PathBuf,

    /// Tesseract language (name of the .traineddata file)
    #[arg(short, long, env = "DIGITSNAP_LANG", default_value = "jpn")]
    pub lang: String,

    /// Characters tesseract may emit (empty disables the whitelist)
    #[arg(long, env = "DIGITSNAP_WHITELIST", default_value = DIGITS)]
    pub whitelist: String,

    /// Tesseract page segmentation mode
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..=13))]
    pub psm: Option<i32>,

    /// Write the binarized image here after every run
    #[arg(short, long)]
    pub preview: Option<PathBuf>,

    /// Scale factor applied before binarization (e.g. 2.0 for small digits)
    #[arg(short, long, default_value = "1.0", value_parser = parse_scale)]
    pub scale: f32,

    /// Read commands from stdin to adjust the threshold and recapture
    #[arg(short, long, default_value = "false")]
    pub interactive: bool,
}

/// Where the first image comes from
#[derive(Debug, PartialEq, Eq)]
pub enum ImageSource {
    /// Bytes piped on stdin
    Stdin(Vec<u8>),
    /// An image file
    Path(PathBuf),
    /// The camera
    Capture,
    /// Nothing yet (interactive mode only)
    None,
}

/// Parsed arguments with resolved image source
#[derive(Debug)]
pub struct ParsedArgs {
    pub source: ImageSource,
    pub threshold: u8,
    pub capture: CaptureConfig,
    pub data_dir: PathBuf,
    pub assets: PathBuf,
    pub lang: String,
    pub whitelist: String,
    pub psm: Option<i32>,
    pub preview: Option<PathBuf>,
    pub scale: f32,
    pub interactive: bool,
}

/// Parse threshold value and ensure it's within slider range
fn parse_threshold(s: &str) -> Result<u8, String> {
    let threshold: i64 = s.parse().map_err(|_| "Invalid threshold value")?;
    if !(0..=255).contains(&threshold) {
        return Err("Threshold must be between 0 and 255".to_string());
    }
    Ok(threshold as u8)
}

/// Parse scale value and ensure it's positive
fn parse_scale(s: &str) -> Result<f32, String> {
    let scale: f32 = s.parse().map_err(|_| "Invalid scale value")?;
    if !(scale > 0.0 && scale.is_finite()) {
        return Err("Scale must be a positive number".to_string());
    }
    Ok(scale)
}

/// Default location of the writable learn directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("digitsnap")
        .join("learn")
}

/// Check if stdin has data available (is a pipe)
fn stdin_has_data() -> bool {
    !atty::is(atty::Stream::Stdin)
}

/// Read image data from stdin
fn read_stdin() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io::stdin().read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Pick the image source. Stdin is reserved for commands in interactive mode.
fn resolve_source(args: &Args, stdin: Option<Vec<u8>>) -> Result<ImageSource> {
    // An empty non-tty stdin (cron, systemd, `< /dev/null`) is not an image
    match stdin {
        Some(data) if !data.is_empty() => return Ok(ImageSource::Stdin(data)),
        Some(_) => debug!("stdin is not a terminal but carried no data, ignoring it"),
        None => {}
    }

    if let Some(ref path) = args.image_path {
        return Ok(ImageSource::Path(path.clone()));
    }

    if args.capture {
        return Ok(ImageSource::Capture);
    }

    if args.interactive {
        return Ok(ImageSource::None);
    }

    bail!(
        "No image provided. Please provide an image path, pipe image data to stdin or use --capture.\n\
         Usage: digitsnap <IMAGE> [OPTIONS]\n\
         Or:    cat photo.jpg | digitsnap [OPTIONS]\n\
         Or:    digitsnap --capture [OPTIONS]"
    );
}

fn into_parsed(args: Args, source: ImageSource) -> ParsedArgs {
    let capture = CaptureConfig {
        output: args
            .capture_path
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_CAPTURE_FILE)),
        command: args.capture_cmd,
        scale: args.scale,
    };

    ParsedArgs {
        source,
        threshold: args.threshold,
        capture,
        data_dir: args.data_dir.unwrap_or_else(default_data_dir),
        assets: args.assets,
        lang: args.lang,
        whitelist: args.whitelist,
        psm: args.psm,
        preview: args.preview,
        scale: args.scale,
        interactive: args.interactive,
    }
}

/// Parse command line arguments and handle stdin input
pub fn parse_args() -> Result<ParsedArgs> {
    let args = Args::parse();

    // Check if we have image data from stdin
    let stdin = if !args.interactive && stdin_has_data() {
        Some(read_stdin()?)
    } else {
        None
    };

    let source = resolve_source(&args, stdin)?;
    Ok(into_parsed(args, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let argv = std::iter::once("digitsnap").chain(extra.iter().copied());
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let a = args(&["photo.jpg"]);
        assert_eq!(a.threshold, 150);
        assert_eq!(a.whitelist, "0123456789");
        assert_eq!(a.image_path, Some(PathBuf::from("photo.jpg")));
        assert!(!a.capture);
        assert!(!a.interactive);
        assert_eq!(a.scale, 1.0);
    }

    #[test]
    fn test_threshold_range() {
        assert_eq!(args(&["-t", "0", "x.png"]).threshold, 0);
        assert_eq!(args(&["--threshold", "255", "x.png"]).threshold, 255);
        assert!(Args::try_parse_from(["digitsnap", "-t", "256", "x.png"]).is_err());
        assert!(Args::try_parse_from(["digitsnap", "-t", "-1", "x.png"]).is_err());
        assert!(Args::try_parse_from(["digitsnap", "-t", "abc", "x.png"]).is_err());
    }

    #[test]
    fn test_scale_must_be_positive() {
        assert_eq!(args(&["-s", "2.5", "x.png"]).scale, 2.5);
        assert!(Args::try_parse_from(["digitsnap", "-s", "0", "x.png"]).is_err());
    }

    #[test]
    fn test_psm_range() {
        assert_eq!(args(&["--psm", "7", "x.png"]).psm, Some(7));
        assert!(Args::try_parse_from(["digitsnap", "--psm", "14", "x.png"]).is_err());
    }

    #[test]
    fn test_stdin_wins() {
        let a = args(&["x.png"]);
        let source = resolve_source(&a, Some(vec![1, 2, 3])).unwrap();
        assert_eq!(source, ImageSource::Stdin(vec![1, 2, 3]));
    }

    #[test]
    fn test_empty_stdin_falls_through() {
        assert_eq!(
            resolve_source(&args(&["x.png"]), Some(Vec::new())).unwrap(),
            ImageSource::Path(PathBuf::from("x.png"))
        );
        assert_eq!(
            resolve_source(&args(&["--capture"]), Some(Vec::new())).unwrap(),
            ImageSource::Capture
        );
        assert!(resolve_source(&args(&[]), Some(Vec::new())).is_err());
    }

    #[test]
    fn test_source_order() {
        assert_eq!(
            resolve_source(&args(&["--capture", "x.png"]), None).unwrap(),
            ImageSource::Path(PathBuf::from("x.png"))
        );
        assert_eq!(
            resolve_source(&args(&["--capture"]), None).unwrap(),
            ImageSource::Capture
        );
        assert_eq!(
            resolve_source(&args(&["x.png"]), None).unwrap(),
            ImageSource::Path(PathBuf::from("x.png"))
        );
        assert_eq!(
            resolve_source(&args(&["-i"]), None).unwrap(),
            ImageSource::None
        );
        assert!(resolve_source(&args(&[]), None).is_err());
    }

    #[test]
    fn test_capture_config() {
        let a = args(&[
            "--capture",
            "--capture-cmd",
            "cam {output}",
            "--capture-path",
            "/tmp/shot.jpg",
            "-s",
            "2",
        ]);
        let parsed = into_parsed(a, ImageSource::Capture);
        assert_eq!(parsed.capture.output, PathBuf::from("/tmp/shot.jpg"));
        assert_eq!(parsed.capture.command.as_deref(), Some("cam {output}"));
        assert_eq!(parsed.capture.scale, 2.0);
    }

    #[test]
    fn test_explicit_data_dir() {
        let a = args(&["--data-dir", "/opt/learn", "x.png"]);
        let parsed = into_parsed(a, ImageSource::Path("x.png".into()));
        assert_eq!(parsed.data_dir, PathBuf::from("/opt/learn"));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
