use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageDecoder};

/// Placeholder sprite edge length in px.
const PLACEHOLDER_SIZE: u32 = 64;
/// Placeholder fill color, RGBA.
const PLACEHOLDER_COLOR: [u8; 4] = [0xff, 0xcc, 0x00, 0xff];

/// Problems turning a file into frames. All of them are recoverable: the
/// caller substitutes the placeholder and keeps running.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{} contains no frames", .path.display())]
    Empty { path: PathBuf },
}

/// An ordered, cyclic animation. Every frame is a width*height RGBA image
/// with premultiplied alpha, ready for texture upload. Never empty.
pub struct FrameSequence {
    pub frames: Vec<Vec<u8>>,
    pub width: u32,
    pub height: u32,
}

/// Decodes GIFs into frame sequences, caching by path.
///
/// A failed decode is logged once and cached as the placeholder, so a broken
/// file does not re-fail on every state change.
pub struct AssetLibrary {
    cache: HashMap<PathBuf, Rc<FrameSequence>>,
    placeholder: Rc<FrameSequence>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            placeholder: Rc::new(placeholder_sequence()),
        }
    }

    /// The built-in stand-in sprite: a single amber disc.
    pub fn placeholder(&self) -> Rc<FrameSequence> {
        Rc::clone(&self.placeholder)
    }

    /// Fetch the sequence at `path`, decoding it on first use.
    pub fn load(&mut self, path: &Path) -> Rc<FrameSequence> {
        if let Some(sequence) = self.cache.get(path) {
            return Rc::clone(sequence);
        }
        let sequence = match decode_file(path) {
            Ok(sequence) => Rc::new(sequence),
            Err(e) => {
                log::error!("animation unavailable, using placeholder: {e}");
                Rc::clone(&self.placeholder)
            }
        };
        self.cache.insert(path.to_path_buf(), Rc::clone(&sequence));
        sequence
    }
}

fn decode_file(path: &Path) -> Result<FrameSequence, AssetError> {
    let file = File::open(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode(BufReader::new(file), path)
}

/// Decode a GIF stream into premultiplied RGBA frames.
fn decode(reader: impl BufRead + Seek, path: &Path) -> Result<FrameSequence, AssetError> {
    let decoder = GifDecoder::new(reader).map_err(|source| AssetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let (width, height) = decoder.dimensions();
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    if frames.is_empty() {
        return Err(AssetError::Empty {
            path: path.to_path_buf(),
        });
    }
    let frames = frames
        .into_iter()
        .map(|frame| {
            let mut pixels = frame.into_buffer().into_raw();
            premultiply(&mut pixels);
            pixels
        })
        .collect();
    Ok(FrameSequence {
        frames,
        width,
        height,
    })
}

/// Premultiply alpha in place. GIF alpha is 1-bit in practice, so this is a
/// pass-through for nearly every pixel.
fn premultiply(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * a) / 255) as u8;
        px[1] = ((px[1] as u16 * a) / 255) as u8;
        px[2] = ((px[2] as u16 * a) / 255) as u8;
    }
}

/// A single amber disc on a transparent background.
fn placeholder_sequence() -> FrameSequence {
    let size = PLACEHOLDER_SIZE;
    let mut pixels = vec![0u8; (size * size * 4) as usize];
    let center = (size as f32 - 1.0) * 0.5;
    let radius = size as f32 * 0.5 - 2.0;
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            if dx * dx + dy * dy <= radius * radius {
                let at = ((y * size + x) * 4) as usize;
                pixels[at..at + 4].copy_from_slice(&PLACEHOLDER_COLOR);
            }
        }
    }
    FrameSequence {
        frames: vec![pixels],
        width: size,
        height: size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Frame, RgbaImage};
    use std::io::Cursor;

    fn tiny_gif(frames: u32, width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut encoder = image::codecs::gif::GifEncoder::new(&mut bytes);
            let frames = (0..frames).map(|i| {
                let shade = (i * 40) as u8;
                Frame::new(RgbaImage::from_pixel(
                    width,
                    height,
                    image::Rgba([shade, 0xcc, 0x00, 0xff]),
                ))
            });
            encoder.encode_frames(frames).unwrap();
        }
        bytes
    }

    #[test]
    fn decodes_every_frame_of_a_gif() {
        let bytes = tiny_gif(3, 5, 4);
        let sequence = decode(Cursor::new(bytes), Path::new("test.gif")).unwrap();
        assert_eq!(sequence.frames.len(), 3);
        assert_eq!((sequence.width, sequence.height), (5, 4));
        for frame in &sequence.frames {
            assert_eq!(frame.len(), 5 * 4 * 4);
        }
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let result = decode(Cursor::new(b"definitely not a gif".to_vec()), Path::new("x.gif"));
        assert!(matches!(result, Err(AssetError::Decode { .. })));
    }

    #[test]
    fn missing_file_falls_back_to_the_placeholder() {
        let mut library = AssetLibrary::new();
        let sequence = library.load(Path::new("images/does-not-exist.gif"));
        assert!(Rc::ptr_eq(&sequence, &library.placeholder()));
    }

    #[test]
    fn failed_loads_are_cached() {
        let mut library = AssetLibrary::new();
        let first = library.load(Path::new("images/broken.gif"));
        let second = library.load(Path::new("images/broken.gif"));
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn placeholder_is_a_single_opaque_disc() {
        let placeholder = placeholder_sequence();
        assert_eq!(placeholder.frames.len(), 1);
        assert_eq!((placeholder.width, placeholder.height), (64, 64));
        let frame = &placeholder.frames[0];
        // corners transparent, center opaque amber
        assert_eq!(frame[3], 0);
        let center = ((32 * 64 + 32) * 4) as usize;
        assert_eq!(&frame[center..center + 4], &PLACEHOLDER_COLOR);
    }

    #[test]
    fn premultiply_scales_color_by_alpha() {
        let mut pixels = vec![0xff, 0x80, 0x00, 0x80, 0xff, 0xff, 0xff, 0xff];
        premultiply(&mut pixels);
        assert_eq!(&pixels[..4], &[0x80, 0x40, 0x00, 0x80]);
        // opaque pixels untouched
        assert_eq!(&pixels[4..], &[0xff, 0xff, 0xff, 0xff]);
    }
}
