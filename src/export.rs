//! Cropping kept points out of the source image and writing them as PNGs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, RgbaImage};

use crate::derive::{PointOfInterest, Review};

/// One square crop to write, centered on a kept point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CropEntry {
    pub name: String,
    pub center_x: i32,
    pub center_y: i32,
    pub side: i32,
}

impl CropEntry {
    /// `{name}.png`, with path separators replaced so every crop lands in
    /// the export folder. Duplicate names are not disambiguated.
    pub fn file_name(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        format!("{name}.png")
    }
}

/// Crops for every kept point, in review order.
pub fn crop_entries(points: &[PointOfInterest], default_size: i32) -> Vec<CropEntry> {
    points
        .iter()
        .filter(|p| p.review == Review::Keep)
        .map(|p| CropEntry {
            name: p.name.clone(),
            center_x: p.location.x,
            center_y: p.location.y,
            side: p.size.unwrap_or(default_size),
        })
        .collect()
}

/// A `side x side` cut of `source` centered on the entry. Parts that fall
/// outside the source stay transparent. `None` for non-positive sides.
pub fn render_crop(source: &RgbaImage, entry: &CropEntry) -> Option<RgbaImage> {
    let side = u32::try_from(entry.side).ok().filter(|s| *s > 0)?;
    let left = entry.center_x as i64 - (side / 2) as i64;
    let top = entry.center_y as i64 - (side / 2) as i64;

    let mut crop = RgbaImage::new(side, side);
    image::imageops::replace(&mut crop, source, -left, -top);
    Some(crop)
}

/// Write every entry into `<dir>/<folder>/`, returning that folder.
pub fn write_crops(
    source: &DynamicImage,
    entries: &[CropEntry],
    dir: &Path,
    folder: &str,
) -> Result<PathBuf> {
    let out_dir = dir.join(folder);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let rgba = source.to_rgba8();
    let mut written = 0;
    for entry in entries {
        let Some(crop) = render_crop(&rgba, entry) else {
            log::warn!("skipping {:?}: crop size {} is not positive", entry.name, entry.side);
            continue;
        };
        let path = out_dir.join(entry.file_name());
        crop.save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        written += 1;
    }
    log::info!("exported {written} crop(s) to {}", out_dir.display());
    Ok(out_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::Origin;
    use crate::geometry::Point;
    use crate::store::AnnotationId;

    fn point(name: &str, x: i32, y: i32, review: Review, size: Option<i32>) -> PointOfInterest {
        PointOfInterest {
            location: Point::new(x, y),
            origin: Origin::Lines(AnnotationId(1), AnnotationId(2)),
            name: name.to_string(),
            review,
            size,
            extent: None,
        }
    }

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| image::Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn only_kept_points_are_exported_in_order() {
        let points = [
            point("A1", 10, 10, Review::Keep, Some(50)),
            point("A2", 20, 10, Review::Discard, Some(50)),
            point("B1", 30, 10, Review::Undecided, None),
            point("A1", 40, 10, Review::Keep, None),
        ];
        let entries = crop_entries(&points, 200);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].side, 50);
        assert_eq!(entries[1].name, "A1");
        assert_eq!(entries[1].center_x, 40);
        assert_eq!(entries[1].side, 200);
    }

    #[test]
    fn crop_is_centered_on_the_point() {
        let source = gradient(100, 100);
        let entry = CropEntry {
            name: "A1".into(),
            center_x: 50,
            center_y: 40,
            side: 10,
        };
        let crop = render_crop(&source, &entry).unwrap();
        assert_eq!(crop.dimensions(), (10, 10));
        assert_eq!(crop.get_pixel(0, 0), &image::Rgba([45, 35, 0, 255]));
        assert_eq!(crop.get_pixel(5, 5), &image::Rgba([50, 40, 0, 255]));
    }

    #[test]
    fn crop_past_the_edge_is_transparent() {
        let source = gradient(20, 20);
        let entry = CropEntry {
            name: "corner".into(),
            center_x: 2,
            center_y: 2,
            side: 10,
        };
        let crop = render_crop(&source, &entry).unwrap();
        assert_eq!(crop.get_pixel(0, 0)[3], 0);
        assert_eq!(crop.get_pixel(3, 3), &image::Rgba([0, 0, 0, 255]));
        assert_eq!(crop.get_pixel(9, 9), &image::Rgba([6, 6, 0, 255]));
    }

    #[test]
    fn non_positive_sizes_produce_nothing() {
        let source = gradient(4, 4);
        for side in [0, -3] {
            let entry = CropEntry {
                name: "x".into(),
                center_x: 1,
                center_y: 1,
                side,
            };
            assert!(render_crop(&source, &entry).is_none());
        }
    }

    #[test]
    fn files_are_written_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let source = DynamicImage::ImageRgba8(gradient(50, 50));
        let entries = vec![
            CropEntry {
                name: "A1".into(),
                center_x: 25,
                center_y: 25,
                side: 8,
            },
            CropEntry {
                name: "a/b".into(),
                center_x: 10,
                center_y: 10,
                side: 4,
            },
            CropEntry {
                name: "skipped".into(),
                center_x: 10,
                center_y: 10,
                side: 0,
            },
        ];
        let out = write_crops(&source, &entries, dir.path(), "cropper-export").unwrap();
        assert_eq!(out, dir.path().join("cropper-export"));
        let written = image::open(out.join("A1.png")).unwrap();
        assert_eq!((written.width(), written.height()), (8, 8));
        assert!(out.join("a_b.png").exists());
        assert!(!out.join("skipped.png").exists());
    }
}
