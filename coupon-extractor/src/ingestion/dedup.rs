//! Size filtering and exact-duplicate removal.
//!
//! Applied in extraction order:
//! 1. Payloads shorter than the byte threshold are decoration (borders, logos, glyphs)
//! 2. Payloads whose fingerprint was already accepted in this pass are repeats
//! 3. Survivors are storage-optimized before being handed on

use tracing::debug;

use super::hash::{Fingerprint, SeenSet};
use super::optimize::optimize_image_storage;
use super::pdf::{ImageFormat, SourceImage};

/// Image that passed the size filter and was not a duplicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedImage {
    /// Storage-optimized payload
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub document: String,
    pub page_number: u32,
    pub image_index: u32,
    /// Fingerprint of the payload as extracted, before optimization
    pub fingerprint: Fingerprint,
}

/// Lazy filter over an extracted image sequence.
///
/// Inserts every accepted fingerprint into the borrowed [`SeenSet`].
pub struct DedupFilter<'s, I> {
    images: I,
    seen: &'s mut SeenSet,
    min_bytes: usize,
}

impl<'s, I> DedupFilter<'s, I>
where
    I: Iterator<Item = SourceImage>,
{
    pub fn new(images: I, seen: &'s mut SeenSet, min_bytes: usize) -> Self {
        Self {
            images,
            seen,
            min_bytes,
        }
    }
}

impl<I> Iterator for DedupFilter<'_, I>
where
    I: Iterator<Item = SourceImage>,
{
    type Item = AcceptedImage;

    fn next(&mut self) -> Option<AcceptedImage> {
        for image in self.images.by_ref() {
            if image.byte_len() < self.min_bytes {
                debug!(
                    document = %image.document,
                    page = image.page_number,
                    image_index = image.image_index,
                    bytes = image.byte_len(),
                    "Skipping image below size threshold"
                );
                continue;
            }

            let fingerprint = Fingerprint::of(&image.data);
            if !self.seen.insert(fingerprint) {
                debug!(
                    document = %image.document,
                    page = image.page_number,
                    image_index = image.image_index,
                    fingerprint = %fingerprint,
                    "Skipping duplicate image"
                );
                continue;
            }

            let SourceImage {
                data,
                format,
                width,
                height,
                document,
                page_number,
                image_index,
            } = image;

            return Some(AcceptedImage {
                data: optimize_image_storage(data, format),
                format,
                width,
                height,
                document,
                page_number,
                image_index,
                fingerprint,
            });
        }
        None
    }
}

/// Filter a sequence of extracted images against `seen`.
pub fn filter_images<I>(
    images: I,
    seen: &mut SeenSet,
    min_bytes: usize,
) -> DedupFilter<'_, I::IntoIter>
where
    I: IntoIterator<Item = SourceImage>,
{
    DedupFilter::new(images.into_iter(), seen, min_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(data: Vec<u8>, format: ImageFormat, page: u32, index: u32) -> SourceImage {
        SourceImage {
            data,
            format,
            width: 100,
            height: 50,
            document: "doc".to_string(),
            page_number: page,
            image_index: index,
        }
    }

    fn payload(len: usize, fill: u8) -> Vec<u8> {
        vec![fill; len]
    }

    #[test]
    fn test_threshold_boundary() {
        let mut seen = SeenSet::new();
        let images = vec![
            image(payload(20479, 1), ImageFormat::Jpeg, 1, 1),
            image(payload(20480, 2), ImageFormat::Jpeg, 1, 2),
        ];

        let accepted: Vec<_> = filter_images(images, &mut seen, 20480).collect();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].image_index, 2);
    }

    #[test]
    fn test_second_occurrence_rejected_regardless_of_format_and_size() {
        let mut seen = SeenSet::new();
        let bytes = payload(30_000, 9);
        let mut twin = image(bytes.clone(), ImageFormat::Png, 2, 1);
        twin.width = 1;
        twin.height = 1;

        let accepted: Vec<_> = filter_images(
            vec![image(bytes, ImageFormat::Jpeg, 1, 1), twin],
            &mut seen,
            20480,
        )
        .collect();

        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].page_number, 1);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_seen_set_carries_across_calls() {
        let mut seen = SeenSet::new();
        let bytes = payload(25_000, 3);

        let first: Vec<_> =
            filter_images(vec![image(bytes.clone(), ImageFormat::Jpeg, 1, 1)], &mut seen, 0)
                .collect();
        let second: Vec<_> =
            filter_images(vec![image(bytes, ImageFormat::Jpeg, 1, 1)], &mut seen, 0).collect();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_order_preserved_and_small_images_not_recorded() {
        let mut seen = SeenSet::new();
        let images = vec![
            image(payload(512, 1), ImageFormat::Jpeg, 1, 1),
            image(payload(25_600, 2), ImageFormat::Jpeg, 1, 2),
            image(payload(25_600, 2), ImageFormat::Jpeg, 1, 3),
            image(payload(25_600, 4), ImageFormat::Jpeg, 2, 1),
        ];

        let accepted: Vec<_> = filter_images(images, &mut seen, 20480)
            .map(|img| (img.page_number, img.image_index))
            .collect();

        assert_eq!(accepted, vec![(1, 2), (2, 1)]);
        assert_eq!(seen.len(), 2);
        assert!(!seen.contains(&Fingerprint::of(&payload(512, 1))));
    }

    #[test]
    fn test_fingerprint_taken_before_optimization() {
        let mut seen = SeenSet::new();
        let bytes = payload(21_000, 5);
        let accepted: Vec<_> =
            filter_images(vec![image(bytes.clone(), ImageFormat::Png, 1, 1)], &mut seen, 0)
                .collect();

        // Not a decodable PNG, so the payload falls back unchanged
        assert_eq!(accepted[0].data, bytes);
        assert_eq!(accepted[0].fingerprint, Fingerprint::of(&bytes));
    }
}
