//! Image export for captured frames.
//!
//! Readback data arrives as RGBA32F rows spaced `row_pitch` bytes apart. The
//! exporter packs it into RGB floats and writes the file with scanline 0 as
//! the bottom row of the output image.

use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgb, Rgb32FImage};

use crate::error::{RenderError, RenderResult};
use crate::submit::RawFrame;

/// Bytes of one RGBA32F texel, the only capture color format.
pub const SOURCE_PIXEL_BYTES: usize = 4 * std::mem::size_of::<f32>();

/// Channels kept per output pixel.
pub const OUTPUT_CHANNELS: usize = 3;

/// Packs padded RGBA32F scanlines into a tight RGB float buffer.
///
/// Rows are read `row_pitch` bytes apart and alpha is dropped. The result
/// holds `width * height * 3` floats in scanline order.
pub fn convert(raw: &[u8], row_pitch: usize, width: u32, height: u32) -> RenderResult<Vec<f32>> {
    let width = width as usize;
    let height = height as usize;
    let row_bytes = width * SOURCE_PIXEL_BYTES;
    if row_pitch < row_bytes {
        return Err(RenderError::InvalidRowPitch {
            row_pitch,
            row_bytes,
        });
    }
    let expected = match height {
        0 => 0,
        h => (h - 1) * row_pitch + row_bytes,
    };
    if raw.len() < expected {
        return Err(RenderError::ReadbackTooSmall {
            expected,
            actual: raw.len(),
        });
    }

    let mut packed = Vec::with_capacity(width * height * OUTPUT_CHANNELS);
    for row in 0..height {
        let start = row * row_pitch;
        for texel in raw[start..start + row_bytes].chunks_exact(SOURCE_PIXEL_BYTES) {
            let [r, g, b, _a]: [f32; 4] = bytemuck::pod_read_unaligned(texel);
            packed.extend_from_slice(&[r, g, b]);
        }
    }
    Ok(packed)
}

/// Output codecs keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    /// Float output, written as is.
    Float(ImageFormat),
    /// 8-bit preview, clamped to [0, 1].
    Preview(ImageFormat),
}

fn codec_for(path: &Path) -> RenderResult<Codec> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "exr" => Ok(Codec::Float(ImageFormat::OpenExr)),
        "hdr" => Ok(Codec::Float(ImageFormat::Hdr)),
        "png" => Ok(Codec::Preview(ImageFormat::Png)),
        "jpg" | "jpeg" => Ok(Codec::Preview(ImageFormat::Jpeg)),
        _ => Err(RenderError::UnsupportedFormat(extension)),
    }
}

/// Writes a packed RGB float buffer to `path`, vertically flipped.
///
/// Scanline 0 of `packed` becomes the bottom row of the file. The codec is
/// chosen from the extension: `.exr` and `.hdr` keep 32-bit floats, `.png` and
/// `.jpg` get a clamped 8-bit preview.
pub fn write(packed: &[f32], width: u32, height: u32, path: &Path) -> RenderResult<()> {
    let codec = codec_for(path)?;
    let row_len = width as usize * OUTPUT_CHANNELS;
    if packed.len() != row_len * height as usize {
        return Err(RenderError::InvalidImageData);
    }

    // Read source rows bottom-up instead of flipping the buffer in place.
    let img = Rgb32FImage::from_fn(width, height, |x, y| {
        let offset = (height - 1 - y) as usize * row_len + x as usize * OUTPUT_CHANNELS;
        Rgb([packed[offset], packed[offset + 1], packed[offset + 2]])
    });

    match codec {
        Codec::Float(format) => img.save_with_format(path, format)?,
        Codec::Preview(format) => DynamicImage::ImageRgb32F(img)
            .to_rgb8()
            .save_with_format(path, format)?,
    }
    Ok(())
}

/// Converts and writes a captured frame.
pub fn export_frame(frame: &RawFrame, path: &Path) -> RenderResult<()> {
    let packed = convert(
        &frame.bytes,
        frame.layout.row_pitch as usize,
        frame.width,
        frame.height,
    )?;
    write(&packed, frame.width, frame.height, path)?;
    log::info!("Saved {}", path.display());
    Ok(())
}
