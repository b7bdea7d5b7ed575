//! PNG encoding of float pixel buffers.
//!
//! Buffers arrive from the image pipeline as channel-last `f32` samples in
//! nominal `[0, 1]`. Samples are scaled to 8 bits with clamping, so
//! out-of-range values never fail an encode. Workflow metadata is carried in
//! PNG text chunks.

use {
    image::DynamicImage,
    png::{BitDepth, ColorType},
    serde_json::{Map, Value},
    tracing::debug,
};

use crate::error::{Context, Error, Result};

pub const PNG_MIME_TYPE: &str = "image/png";

/// Channel-last float image, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<f32>,
}

impl PixelBuffer {
    /// Wrap raw samples, checking that they describe a whole image.
    ///
    /// Supported layouts are grayscale (1), RGB (3) and RGBA (4).
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_shape(format!(
                "image has no pixels ({width}x{height})"
            )));
        }
        if !matches!(channels, 1 | 3 | 4) {
            return Err(Error::invalid_shape(format!(
                "unsupported channel count {channels}, expected 1, 3 or 4"
            )));
        }
        let expected = width as usize * height as usize * usize::from(channels);
        if data.len() != expected {
            return Err(Error::invalid_shape(format!(
                "{} samples do not fill {width}x{height}x{channels} ({expected} expected)",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Convert a decoded image file into a float buffer, keeping gray and
    /// alpha layouts where the source has them.
    #[must_use]
    pub fn from_image(image: &DynamicImage) -> Self {
        let color = image.color();
        let ((width, height), channels, data) = if color.has_alpha() {
            let converted = image.to_rgba32f();
            (converted.dimensions(), 4, converted.into_raw())
        } else if color.has_color() {
            let converted = image.to_rgb32f();
            (converted.dimensions(), 3, converted.into_raw())
        } else {
            let converted = image.to_luma32f();
            (converted.dimensions(), 1, converted.into_raw())
        };
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.data
    }
}

/// Ordered key/value text pairs embedded into a PNG.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PngMetadata {
    entries: Vec<(String, String)>,
}

impl PngMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata in the layout the pipeline host writes: the prompt graph
    /// under `prompt`, plus one entry per key of the extra info object.
    /// Values are stored as JSON text.
    #[must_use]
    pub fn from_workflow(prompt: Option<&Value>, extra: Option<&Map<String, Value>>) -> Self {
        let mut metadata = Self::new();
        if let Some(prompt) = prompt {
            metadata.insert("prompt", prompt.to_string());
        }
        if let Some(extra) = extra {
            for (key, value) in extra {
                metadata.insert(key.clone(), value.to_string());
            }
        }
        metadata
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A named, compressed image ready to be written to disk or uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    filename: String,
    mime_type: String,
    payload: Vec<u8>,
}

impl EncodedImage {
    #[must_use]
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            payload,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Encode `buffer` as an 8-bit PNG named `filename`.
pub fn encode_png(
    buffer: &PixelBuffer,
    metadata: Option<&PngMetadata>,
    filename: impl Into<String>,
) -> Result<EncodedImage> {
    let filename = filename.into();
    let samples: Vec<u8> = buffer.data.iter().copied().map(quantize).collect();

    let mut payload = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut payload, buffer.width, buffer.height);
        encoder.set_color(color_type(buffer.channels));
        encoder.set_depth(BitDepth::Eight);
        if let Some(metadata) = metadata {
            for (key, value) in metadata.entries() {
                let added = if is_latin1(value) {
                    encoder.add_text_chunk(key.clone(), value.clone())
                } else {
                    encoder.add_itxt_chunk(key.clone(), value.clone())
                };
                added.with_context(|| format!("invalid PNG text entry {key:?}"))?;
            }
        }
        let mut writer = encoder
            .write_header()
            .context("failed to write PNG header")?;
        writer
            .write_image_data(&samples)
            .context("failed to write PNG image data")?;
        writer.finish().context("failed to finish PNG stream")?;
    }

    debug!(
        filename = %filename,
        width = buffer.width,
        height = buffer.height,
        channels = buffer.channels,
        bytes = payload.len(),
        text_entries = metadata.map_or(0, |m| m.entries().len()),
        "encoded png"
    );

    Ok(EncodedImage::new(filename, PNG_MIME_TYPE, payload))
}

/// Scale a nominal `[0, 1]` sample to a byte. NaN becomes 0.
fn quantize(sample: f32) -> u8 {
    (sample * 255.0).clamp(0.0, 255.0) as u8
}

fn color_type(channels: u8) -> ColorType {
    match channels {
        1 => ColorType::Grayscale,
        4 => ColorType::Rgba,
        _ => ColorType::Rgb,
    }
}

fn is_latin1(text: &str) -> bool {
    text.chars().all(|c| u32::from(c) <= 0xFF)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json, std::io::Cursor};

    fn decode_text(payload: &[u8]) -> Vec<(String, String)> {
        let mut decoder = png::Decoder::new(Cursor::new(payload));
        decoder.set_ignore_text_chunk(false);
        let reader = decoder.read_info().unwrap();
        let info = reader.info();
        let mut entries: Vec<(String, String)> = info
            .uncompressed_latin1_text
            .iter()
            .map(|chunk| (chunk.keyword.clone(), chunk.text.clone()))
            .collect();
        for chunk in &info.utf8_text {
            entries.push((chunk.keyword.clone(), chunk.get_text().unwrap()));
        }
        entries
    }

    #[rstest]
    #[case(0.0, 0)]
    #[case(1.0, 255)]
    #[case(0.5, 127)]
    #[case(-3.0, 0)]
    #[case(7.5, 255)]
    #[case(f32::NAN, 0)]
    #[case(f32::INFINITY, 255)]
    fn quantize_clamps_and_truncates(#[case] sample: f32, #[case] expected: u8) {
        assert_eq!(quantize(sample), expected);
    }

    #[test]
    fn new_rejects_mismatched_sample_count() {
        let err = PixelBuffer::new(2, 2, 3, vec![0.0; 11]).unwrap_err();
        assert!(matches!(err, Error::InvalidShape { .. }));
        assert!(err.to_string().contains("12 expected"));
    }

    #[test]
    fn new_rejects_unsupported_channels_and_empty_images() {
        assert!(PixelBuffer::new(1, 1, 2, vec![0.0; 2]).is_err());
        assert!(PixelBuffer::new(0, 4, 3, Vec::new()).is_err());
    }

    #[test]
    fn png_round_trip_matches_clamped_samples() {
        let data = vec![
            0.0, 0.25, 0.5, //
            1.0, 1.5, -0.2, //
            0.999, 0.004, 0.75, //
            0.1, 0.2, 0.3,
        ];
        let buffer = PixelBuffer::new(2, 2, 3, data.clone()).unwrap();
        let encoded = encode_png(&buffer, None, "img_00001_.png").unwrap();

        assert_eq!(encoded.filename(), "img_00001_.png");
        assert_eq!(encoded.mime_type(), PNG_MIME_TYPE);

        let decoded = image::load_from_memory(encoded.payload()).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (2, 2));
        let expected: Vec<u8> = data.into_iter().map(quantize).collect();
        assert_eq!(decoded.into_raw(), expected);
    }

    #[test]
    fn grayscale_and_rgba_layouts_survive_encoding() {
        let gray = PixelBuffer::new(3, 1, 1, vec![0.0, 0.5, 1.0]).unwrap();
        let decoded = image::load_from_memory(encode_png(&gray, None, "g.png").unwrap().payload())
            .unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
        assert_eq!(decoded.to_luma8().into_raw(), vec![0, 127, 255]);

        let rgba = PixelBuffer::new(1, 1, 4, vec![1.0, 0.0, 0.0, 0.5]).unwrap();
        let decoded = image::load_from_memory(encode_png(&rgba, None, "a.png").unwrap().payload())
            .unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgba8);
        assert_eq!(decoded.to_rgba8().into_raw(), vec![255, 0, 0, 127]);
    }

    #[test]
    fn metadata_is_written_as_text_chunks() {
        let buffer = PixelBuffer::new(1, 1, 3, vec![0.2, 0.4, 0.6]).unwrap();
        let extra = json!({ "workflow": { "nodes": [] } });
        let metadata = PngMetadata::from_workflow(
            Some(&json!({ "3": { "class_type": "KSampler" } })),
            extra.as_object(),
        );
        let encoded = encode_png(&buffer, Some(&metadata), "meta.png").unwrap();

        let entries = decode_text(encoded.payload());
        assert_eq!(entries, vec![
            (
                "prompt".to_string(),
                r#"{"3":{"class_type":"KSampler"}}"#.to_string()
            ),
            ("workflow".to_string(), r#"{"nodes":[]}"#.to_string()),
        ]);
    }

    #[test]
    fn non_latin1_metadata_falls_back_to_international_text() {
        let buffer = PixelBuffer::new(1, 1, 1, vec![0.0]).unwrap();
        let mut metadata = PngMetadata::new();
        metadata.insert("prompt", "\"猫の写真\"");
        let encoded = encode_png(&buffer, Some(&metadata), "cat.png").unwrap();

        let entries = decode_text(encoded.payload());
        assert_eq!(entries, vec![(
            "prompt".to_string(),
            "\"猫の写真\"".to_string()
        )]);
    }

    #[test]
    fn absent_metadata_writes_no_text() {
        let buffer = PixelBuffer::new(1, 1, 3, vec![0.0; 3]).unwrap();
        let encoded = encode_png(&buffer, None, "plain.png").unwrap();
        assert!(decode_text(encoded.payload()).is_empty());

        let empty = PngMetadata::from_workflow(None, None);
        assert!(empty.is_empty());
    }

    #[test]
    fn from_image_picks_channel_layout() {
        let rgb = DynamicImage::new_rgb8(2, 3);
        let buffer = PixelBuffer::from_image(&rgb);
        assert_eq!((buffer.width(), buffer.height(), buffer.channels()), (2, 3, 3));
        assert_eq!(buffer.samples().len(), 18);

        let gray = DynamicImage::new_luma8(4, 1);
        assert_eq!(PixelBuffer::from_image(&gray).channels(), 1);

        let rgba = DynamicImage::new_rgba8(1, 1);
        assert_eq!(PixelBuffer::from_image(&rgba).channels(), 4);
    }
}
