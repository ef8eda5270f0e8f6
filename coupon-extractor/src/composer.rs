//! Layout of accepted images onto fixed-size output pages.
//!
//! Images are grouped in order, `k` per page, and each group stacks
//! vertically in equal horizontal bands. See [`placement`] for the geometry.

pub mod placement;
pub mod render;

use std::path::Path;

use tracing::info;

use crate::error::ProcessingError;
use crate::ingestion::AcceptedImage;

pub use placement::Rect;

/// One image and where it is drawn
#[derive(Debug, Clone, Copy)]
pub struct PlacedImage<'a> {
    pub image: &'a AcceptedImage,
    pub rect: Rect,
}

/// One output page, slots in top-to-bottom order
#[derive(Debug, Clone, Default)]
pub struct OutputPage<'a> {
    pub slots: Vec<PlacedImage<'a>>,
}

/// Lay `images` out in order, `images_per_page` per page (clamped to 1..=5).
pub fn compose(images: &[AcceptedImage], images_per_page: usize) -> Vec<OutputPage<'_>> {
    let per_page = placement::clamp_per_page(images_per_page);

    images
        .chunks(per_page)
        .map(|group| OutputPage {
            slots: group
                .iter()
                .enumerate()
                .map(|(slot, image)| PlacedImage {
                    image,
                    rect: placement::fit(
                        image.width,
                        image.height,
                        placement::placement_area(slot, per_page),
                    ),
                })
                .collect(),
        })
        .collect()
}

/// Compose `images` and write them to `path` as a compacted PDF.
///
/// Returns the number of pages written.
pub fn write_layout(
    images: &[AcceptedImage],
    images_per_page: usize,
    path: &Path,
) -> Result<usize, ProcessingError> {
    let pages = compose(images, images_per_page);
    let mut document = render::render(&pages)?;
    render::save_compacted(&mut document, path)?;

    info!(
        output = %path.display(),
        images = images.len(),
        pages = pages.len(),
        "Wrote coupon layout"
    );
    Ok(pages.len())
}
