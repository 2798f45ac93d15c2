// digitsnap - Read digits from a photo with Tesseract
// Captures or loads an image, binarizes it and runs digit-only OCR on the result

mod app;
mod binarize;
mod bootstrap;
mod capture;
mod cli;
mod image_loader;
mod recognizer;

use anyhow::{bail, Result};
use app::{App, Command, Step};
use cli::{ImageSource, ParsedArgs};
use log::{debug, info, warn};
use recognizer::TesseractRecognizer;
use std::io::{self, BufRead, Write};

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args = cli::parse_args()?;

    info!(
        "Starting digitsnap with source: {}, threshold: {}",
        describe(&args.source),
        args.threshold
    );

    // Make sure the trained data is in place; recognition reports it otherwise
    let tessdata = match bootstrap::ensure_trained_data(&args.data_dir, &args.lang, &args.assets)
    {
        Ok(dir) => dir,
        Err(e) => {
            warn!("{:#}", e);
            args.data_dir.join(bootstrap::TESSDATA_DIR)
        }
    };

    recognizer::export_tessdata_dir(&tessdata);
    let recognizer = TesseractRecognizer::new(tessdata, args.lang.clone())
        .with_whitelist(args.whitelist.clone())
        .with_psm(args.psm);
    let mut app = App::new(recognizer, args.threshold, args.preview.clone());

    // Load the first image
    if let Some(image) = load_initial(&args)? {
        info!("Image loaded: {}x{} pixels", image.width, image.height);
        app.set_image(image);
    }

    if args.interactive {
        run_interactive(&mut app, &args)
    } else {
        run_once(&app)
    }
}

fn describe(source: &ImageSource) -> String {
    match source {
        ImageSource::Stdin(data) => format!("stdin ({} bytes)", data.len()),
        ImageSource::Path(path) => path.display().to_string(),
        ImageSource::Capture => "camera".to_string(),
        ImageSource::None => "none".to_string(),
    }
}

fn load_initial(args: &ParsedArgs) -> Result<Option<image_loader::ImageData>> {
    let image = match args.source {
        ImageSource::Stdin(ref data) => image_loader::load_bytes(data, args.scale)?,
        ImageSource::Path(ref path) => image_loader::load_from_path(path, args.scale)?,
        ImageSource::Capture => capture::capture(&args.capture)?,
        ImageSource::None => return Ok(None),
    };
    Ok(Some(image))
}

/// Process the loaded image once and print the result
fn run_once(app: &App<TesseractRecognizer>) -> Result<()> {
    let Some(outcome) = app.binarize_and_recognize() else {
        bail!("No image to process");
    };
    debug!(
        "Binarized image: {}x{}",
        outcome.binarized.width(),
        outcome.binarized.height()
    );

    match outcome.text {
        Ok(text) => {
            println!("{}", text);
            Ok(())
        }
        Err(message) => bail!(message),
    }
}

/// Read commands from stdin until `quit` or end of input
fn run_interactive(app: &mut App<TesseractRecognizer>, args: &ParsedArgs) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("{}", app::HELP);
    if !app.has_image() {
        println!("No image loaded yet, use `c` to capture one.");
    }
    if let Some(outcome) = app.binarize_and_recognize() {
        show(Step::Show(outcome), app.threshold());
    }

    loop {
        print!("[{}]> ", app.threshold());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message);
                continue;
            }
        };

        let step = app.handle(command, || capture::capture(&args.capture));
        if matches!(step, Step::Quit) {
            break;
        }
        show(step, app.threshold());
    }

    Ok(())
}

fn show(step: Step, threshold: u8) {
    match step {
        Step::Show(outcome) => {
            debug!(
                "Binarized image: {}x{}",
                outcome.binarized.width(),
                outcome.binarized.height()
            );
            match outcome.text {
                Ok(text) => println!("threshold {}: {}", threshold, text),
                Err(message) => eprintln!("threshold {}: error: {}", threshold, message),
            }
        }
        Step::Message(message) => println!("{}", message),
        Step::Quit => {}
    }
}
