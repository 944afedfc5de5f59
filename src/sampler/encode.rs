use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use image::{codecs::jpeg::JpegEncoder, ExtendedColorType};

use crate::media::RawFrame;

const JPEG_QUALITY: u8 = 80;

/// One sampled frame ready for transmission. Dropped once sent.
#[derive(Debug, Clone)]
pub struct FramePayload {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

pub fn encode_frame(frame: &RawFrame, captured_at: DateTime<Utc>) -> Result<FramePayload> {
    if frame.width == 0 || frame.height == 0 {
        bail!("frame has no pixels ({}x{})", frame.width, frame.height);
    }
    let expected = frame.width as usize * frame.height as usize * 3;
    if frame.rgb.len() != expected {
        bail!(
            "frame buffer holds {} bytes, expected {} for {}x{} RGB",
            frame.rgb.len(),
            expected,
            frame.width,
            frame.height
        );
    }

    let mut jpeg = Vec::with_capacity(expected / 8);
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode(&frame.rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
        .context("jpeg encode failed")?;

    Ok(FramePayload {
        jpeg,
        width: frame.width,
        height: frame.height,
        captured_at,
    })
}
