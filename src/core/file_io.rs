use std::path::{Path, PathBuf};

use serde::Serialize;

/// Image extensions picked up from the input directory when none are configured.
pub const DEFAULT_IMAGE_EXTENSIONS: [&str; 3] = ["jpeg", "jpg", "png"];

/**
 * Output directory for one batch: `<output_root>/<variant>[/<date_time>]`.
 * The directory is created if it does not exist yet.
 */
pub fn build_output_path_with_date_time(
    output_root: &Path,
    variant: &str,
    datetime: &Option<String>,
) -> std::io::Result<PathBuf> {
    let mut directory_path = output_root.join(variant);
    if let Some(inner_datetime_str) = datetime {
        directory_path.push(inner_datetime_str);
    }
    std::fs::create_dir_all(&directory_path)?;
    Ok(directory_path)
}

pub fn date_time_string() -> String {
    use chrono::{Datelike, Local, Timelike};
    let local_time = Local::now();
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        local_time.year(),
        local_time.month(),
        local_time.day(),
        local_time.hour(),
        local_time.minute(),
        local_time.second()
    )
}

pub fn maybe_date_time_string(enable: bool) -> Option<String> {
    if enable {
        Option::Some(date_time_string())
    } else {
        Option::None
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/**
 * Regular files directly inside `directory` whose extension matches one of
 * `extensions` (case-insensitive, without the leading dot). Sorted by path so that
 * a batch is always processed in the same order.
 */
pub fn list_candidate_images(
    directory: &Path,
    extensions: &[String],
) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extensions) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Record the parameters of a batch next to its outputs.
pub fn serialize_to_json<T: Serialize>(
    value: &T,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
