//! Band geometry for output pages.
//!
//! Rectangles use a top-left origin with y growing downward; conversion to
//! PDF user space happens at render time.

use crate::config::{MAX_COUPONS_PER_PAGE, MIN_COUPONS_PER_PAGE};

/// A4 portrait in PDF user-space units
pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;

/// Vertical gap between bands
pub const BAND_GAP: f32 = 14.0;
/// Left and right inset of every placement rectangle
pub const SIDE_MARGIN: f32 = 20.0;
/// Top and bottom inset, as a fraction of the band height
pub const BAND_PADDING: f32 = 0.05;

/// Axis-aligned rectangle in top-left page coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[cfg(test)]
impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// True if `other` lies entirely within this rectangle, allowing for
    /// floating point slack
    pub fn contains(&self, other: &Rect) -> bool {
        const EPS: f32 = 1e-3;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.bottom() <= self.bottom() + EPS
    }
}

/// Clamp a requested page capacity to the supported range
pub fn clamp_per_page(images_per_page: usize) -> usize {
    images_per_page.clamp(MIN_COUPONS_PER_PAGE as usize, MAX_COUPONS_PER_PAGE as usize)
}

/// Height of one band when a page holds `per_page` bands
pub fn band_height(per_page: usize) -> f32 {
    let k = clamp_per_page(per_page) as f32;
    (PAGE_HEIGHT - (k - 1.0) * BAND_GAP) / k
}

/// Full band `slot` (0-based) of a page holding `per_page` bands
pub fn band(slot: usize, per_page: usize) -> Rect {
    let height = band_height(per_page);
    Rect {
        x: 0.0,
        y: slot as f32 * (height + BAND_GAP),
        width: PAGE_WIDTH,
        height,
    }
}

/// Area of band `slot` an image may occupy
pub fn placement_area(slot: usize, per_page: usize) -> Rect {
    let band = band(slot, per_page);
    let padding = band.height * BAND_PADDING;
    Rect {
        x: SIDE_MARGIN,
        y: band.y + padding,
        width: PAGE_WIDTH - 2.0 * SIDE_MARGIN,
        height: band.height - 2.0 * padding,
    }
}

/// Scale an image of `width` x `height` pixels into `area` without
/// distortion, centered along the axis with slack.
pub fn fit(width: u32, height: u32, area: Rect) -> Rect {
    let image_aspect = width.max(1) as f32 / height.max(1) as f32;
    let area_aspect = area.width / area.height;

    if image_aspect > area_aspect {
        let fitted_height = area.width / image_aspect;
        Rect {
            x: area.x,
            y: area.y + (area.height - fitted_height) / 2.0,
            width: area.width,
            height: fitted_height,
        }
    } else {
        let fitted_width = area.height * image_aspect;
        Rect {
            x: area.x + (area.width - fitted_width) / 2.0,
            y: area.y,
            width: fitted_width,
            height: area.height,
        }
    }
}
