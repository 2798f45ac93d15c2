// Trained data bootstrap
// Copies the bundled Tesseract model into a writable tessdata directory on first run

use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Name of the directory Tesseract expects its models in
pub const TESSDATA_DIR: &str = "tessdata";

/// File name of the model for `lang`
pub fn trained_data_file(lang: &str) -> String {
    format!("{lang}.traineddata")
}

/// Make sure `<data_dir>/tessdata/<lang>.traineddata` exists.
///
/// The model is copied from `asset_dir` only when it is missing; an existing
/// model is never touched. Returns the tessdata directory.
pub fn ensure_trained_data(data_dir: &Path, lang: &str, asset_dir: &Path) -> Result<PathBuf> {
    let tessdata = data_dir.join(TESSDATA_DIR);
    if !tessdata.exists() {
        fs::create_dir_all(&tessdata)
            .with_context(|| format!("Failed to create {}", tessdata.display()))?;
        debug!("Created tessdata directory {}", tessdata.display());
    }

    let file_name = trained_data_file(lang);
    let target = tessdata.join(&file_name);
    if target.exists() {
        debug!("Trained data already present: {}", target.display());
        return Ok(tessdata);
    }

    let source = asset_dir.join(&file_name);
    let mut input = File::open(&source)
        .with_context(|| format!("Missing trained data asset: {}", source.display()))?;

    // Copy next to the target and rename so a partial copy never looks complete
    let partial = tessdata.join(format!("{file_name}.part"));
    let copied = {
        let mut output = File::create(&partial)
            .with_context(|| format!("Failed to create {}", partial.display()))?;
        io::copy(&mut input, &mut output)
            .with_context(|| format!("Failed to copy {}", source.display()))?
    };
    fs::rename(&partial, &target)
        .with_context(|| format!("Failed to move trained data to {}", target.display()))?;

    info!(
        "Copied {} ({} bytes) to {}",
        source.display(),
        copied,
        target.display()
    );

    Ok(tessdata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copies_missing_model() {
        let assets = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(assets.path().join("jpn.traineddata"), b"model-bytes").unwrap();

        let learn = data.path().join("learn");
        let tessdata = ensure_trained_data(&learn, "jpn", assets.path()).unwrap();

        assert_eq!(tessdata, learn.join("tessdata"));
        assert_eq!(
            fs::read(tessdata.join("jpn.traineddata")).unwrap(),
            b"model-bytes"
        );
        assert!(!tessdata.join("jpn.traineddata.part").exists());
    }

    #[test]
    fn test_existing_model_is_kept() {
        let assets = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(assets.path().join("jpn.traineddata"), b"new").unwrap();

        let tessdata = data.path().join("tessdata");
        fs::create_dir_all(&tessdata).unwrap();
        fs::write(tessdata.join("jpn.traineddata"), b"old").unwrap();

        ensure_trained_data(data.path(), "jpn", assets.path()).unwrap();
        assert_eq!(fs::read(tessdata.join("jpn.traineddata")).unwrap(), b"old");
    }

    #[test]
    fn test_existing_model_needs_no_asset() {
        let data = tempfile::tempdir().unwrap();
        let tessdata = data.path().join("tessdata");
        fs::create_dir_all(&tessdata).unwrap();
        fs::write(tessdata.join("eng.traineddata"), b"x").unwrap();

        let missing_assets = data.path().join("no-assets");
        assert!(ensure_trained_data(data.path(), "eng", &missing_assets).is_ok());
    }

    #[test]
    fn test_missing_asset_is_an_error() {
        let assets = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();

        let err = ensure_trained_data(data.path(), "jpn", assets.path()).unwrap_err();
        assert!(err.to_string().contains("jpn.traineddata"));
        // the directory is still prepared
        assert!(data.path().join("tessdata").is_dir());
        assert!(!data.path().join("tessdata/jpn.traineddata").exists());
    }

    #[test]
    fn test_trained_data_file_name() {
        assert_eq!(trained_data_file("jpn"), "jpn.traineddata");
    }
}
