//! Splitting a run's images into send units.

use pixelpost_media::EncodedImage;

use crate::config::{Grouping, MEDIA_GROUP_LIMIT};

/// One Bot API request worth of images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendUnit<'a> {
    Single(&'a EncodedImage),
    /// Two to [`MEDIA_GROUP_LIMIT`] images sent as one media group.
    Group(&'a [EncodedImage]),
}

impl<'a> SendUnit<'a> {
    pub fn images(&self) -> &'a [EncodedImage] {
        match *self {
            Self::Single(image) => std::slice::from_ref(image),
            Self::Group(images) => images,
        }
    }

    pub fn len(&self) -> usize {
        self.images().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images().is_empty()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.images()
            .iter()
            .map(|image| image.filename().to_string())
            .collect()
    }
}

/// Plan the requests for `images`, preserving order.
///
/// Grouped runs are cut into consecutive chunks of [`MEDIA_GROUP_LIMIT`].
/// Media groups need at least two items, so a run of one image, or a
/// trailing chunk of one, goes out as a single upload.
pub fn plan_units(images: &[EncodedImage], grouping: Grouping) -> Vec<SendUnit<'_>> {
    match grouping {
        Grouping::Grouped if images.len() > 1 => images
            .chunks(MEDIA_GROUP_LIMIT)
            .map(|chunk| match chunk {
                [image] => SendUnit::Single(image),
                group => SendUnit::Group(group),
            })
            .collect(),
        Grouping::Grouped | Grouping::Individual => images.iter().map(SendUnit::Single).collect(),
    }
}
