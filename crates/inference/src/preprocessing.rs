use crate::error::ClassifierError;
use image::{RgbImage, imageops};
use ndarray::{Array, IxDyn};

/// Fixed model input geometry (Teachable Machine export).
pub const INPUT_WIDTH: u32 = 224;
pub const INPUT_HEIGHT: u32 = 224;

/// Decode an image payload (JPEG or PNG) to 8-bit RGB.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ClassifierError> {
    if bytes.is_empty() {
        return Err(ClassifierError::ImageDecode { bytes: 0 });
    }

    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|_| ClassifierError::ImageDecode { bytes: bytes.len() })
}

/// Build the model input tensor: stretch-resize to the fixed input size
/// (no aspect-preserving crop, matching how the model was trained),
/// scale u8 channels to [0, 1] floats, NHWC layout [1, H, W, 3].
pub fn to_tensor(image: &RgbImage) -> Array<f32, IxDyn> {
    let resized;
    let source = if image.dimensions() == (INPUT_WIDTH, INPUT_HEIGHT) {
        image
    } else {
        resized = imageops::resize(
            image,
            INPUT_WIDTH,
            INPUT_HEIGHT,
            imageops::FilterType::Triangle,
        );
        &resized
    };

    let mut input = Array::zeros(IxDyn(&[
        1,
        INPUT_HEIGHT as usize,
        INPUT_WIDTH as usize,
        3,
    ]));
    for (x, y, pixel) in source.enumerate_pixels() {
        for c in 0..3 {
            input[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
        }
    }

    input
}
