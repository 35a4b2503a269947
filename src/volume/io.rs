//! I/O helpers for slice stacks and JSON.
//!
//! - `load_grayscale_volume`: read PNG/JPEG/etc. slices into an intensity volume.
//! - `load_mask_volume`: read slices as a boolean mask (non-zero = active).
//! - `load_seed_volume`: read slices whose gray values are seed labels.
//! - `save_label_slices`: write a label volume as one grayscale PNG per slice.
//! - `write_json_file`: dump a report or curve set as JSON.
use super::{LabelVolume, Shape, Volume};
use image::{GrayImage, Luma};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Load a stack of images (one per slice) as 8-bit gray intensities.
pub fn load_grayscale_volume(paths: &[PathBuf]) -> Result<Volume<f64>, String> {
    load_stack(paths, |v| v as f64)
}

/// Load a stack of images as a mask; any non-zero pixel is active.
pub fn load_mask_volume(paths: &[PathBuf]) -> Result<Volume<bool>, String> {
    load_stack(paths, |v| v > 0)
}

/// Load a stack of images whose gray values are seed labels (`0` = unlabeled).
pub fn load_seed_volume(paths: &[PathBuf]) -> Result<Volume<u32>, String> {
    load_stack(paths, |v| v as u32)
}

fn load_stack<T>(paths: &[PathBuf], convert: impl Fn(u8) -> T) -> Result<Volume<T>, String> {
    if paths.is_empty() {
        return Err("No slices given".to_string());
    }
    let mut data = Vec::new();
    let mut plane: Option<(usize, usize)> = None;
    for path in paths {
        let img = image::open(path)
            .map_err(|e| format!("Failed to open {}: {e}", path.display()))?
            .into_luma8();
        let dims = (img.height() as usize, img.width() as usize);
        match plane {
            None => plane = Some(dims),
            Some(expected) if expected != dims => {
                return Err(format!(
                    "Slice {} is {}x{}, expected {}x{}",
                    path.display(),
                    dims.1,
                    dims.0,
                    expected.1,
                    expected.0
                ));
            }
            Some(_) => {}
        }
        data.extend(img.into_raw().into_iter().map(&convert));
    }
    let (rows, cols) = plane.unwrap_or((0, 0));
    Volume::new(Shape::new(paths.len(), rows, cols), data).map_err(|e| e.to_string())
}

/// Save each slice of `labels` as `<dir>/<prefix>_<slice>.png`, spreading
/// labels `0..=max` over the gray range.
pub fn save_label_slices(
    labels: &LabelVolume,
    dir: &Path,
    prefix: &str,
) -> Result<Vec<PathBuf>, String> {
    fs::create_dir_all(dir).map_err(|e| format!("Failed to create {}: {e}", dir.display()))?;
    let shape = labels.shape();
    let max_label = labels.iter().copied().max().unwrap_or(0).max(1);
    let mut written = Vec::with_capacity(shape.slices);
    for s in 0..shape.slices {
        let mut out = GrayImage::new(shape.cols as u32, shape.rows as u32);
        for (idx, &label) in labels.slice(s).iter().enumerate() {
            let (row, col) = (idx / shape.cols, idx % shape.cols);
            let gray = (label.min(max_label) * 255 / max_label) as u8;
            out.put_pixel(col as u32, row as u32, Luma([gray]));
        }
        let path = dir.join(format!("{prefix}_{s:03}.png"));
        out.save(&path)
            .map_err(|e| format!("Failed to save {}: {e}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Write `value` as pretty JSON to `path` (report, model curves), creating
/// the output directory when needed.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    let dir = path.parent().filter(|d| !d.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir)
            .map_err(|e| format!("Cannot create output directory {}: {e}", dir.display()))?;
    }
    let mut json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Cannot encode {} as JSON: {e}", path.display()))?;
    json.push('\n');
    fs::write(path, json).map_err(|e| format!("Cannot write {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mrf_io_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn label_slices_round_trip_through_png() {
        let dir = scratch_dir("labels");
        let labels = Volume::new(Shape::new(2, 2, 3), vec![1, 2, 1, 2, 1, 2, 2, 2, 2, 1, 1, 1])
            .expect("valid");
        let paths = save_label_slices(&labels, &dir, "labels").expect("saved");
        assert_eq!(paths.len(), 2);

        let reloaded = load_seed_volume(&paths).expect("loaded");
        assert_eq!(reloaded.shape(), labels.shape());
        // label 2 of max 2 maps to 255, label 1 to 127
        assert_eq!(reloaded.get(0, 0, 1), 255);
        assert_eq!(reloaded.get(0, 0, 0), 127);

        let mask = load_mask_volume(&paths).expect("loaded");
        assert_eq!(mask.count_true(), 12);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_stack_is_an_error() {
        assert!(load_grayscale_volume(&[]).is_err());
    }

    #[test]
    fn json_output_creates_missing_directories() {
        let dir = scratch_dir("json");
        let path = dir.join("nested").join("report.json");
        write_json_file(&path, &vec![1, 2, 3]).expect("written");
        let text = fs::read_to_string(&path).expect("readable");
        let back: Vec<u32> = serde_json::from_str(&text).expect("valid JSON");
        assert_eq!(back, vec![1, 2, 3]);
        let _ = fs::remove_dir_all(&dir);
    }
}
