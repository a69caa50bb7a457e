use image::{Rgb, RgbImage};
use std::io::Cursor;

/// Encode an RGB frame as JPEG for streaming viewers.
pub fn to_jpeg(frame: &RgbImage) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    frame.write_to(&mut bytes, image::ImageFormat::Jpeg)?;
    Ok(bytes.into_inner())
}

/// Dark placeholder shown to stream viewers before the first camera
/// frame arrives.
pub fn placeholder_jpeg(width: u32, height: u32) -> anyhow::Result<Vec<u8>> {
    let frame = RgbImage::from_pixel(width, height, Rgb([16, 16, 16]));
    to_jpeg(&frame)
}
