//! Decoding of image XObject streams into 8-bit RGB rasters.
//!
//! Supported: `DCTDecode` through the `image` crate, and raw samples (after
//! lopdf's stream filters) in Gray, RGB, CMYK, ICCBased and Indexed colour
//! spaces at 1, 2, 4 or 8 bits per component.

use image::{ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};

use crate::pdf_utils;
use crate::{Result, VerifyError};

/// Colour model of the decoded samples.
#[derive(Debug, Clone, PartialEq)]
enum ColourSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColourSpace>,
        hival: usize,
        lookup: Vec<u8>,
    },
}

impl ColourSpace {
    fn components(&self) -> usize {
        match self {
            ColourSpace::Gray | ColourSpace::Indexed { .. } => 1,
            ColourSpace::Rgb => 3,
            ColourSpace::Cmyk => 4,
        }
    }
}

/// Decode an image XObject stream. `name` is only used in error messages.
pub(crate) fn decode_image(document: &Document, stream: &Stream, name: &str) -> Result<RgbImage> {
    let dict = &stream.dict;
    let unsupported = |reason: &str| VerifyError::UnsupportedImage(name.into(), reason.into());

    if matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
        return Err(unsupported("stencil masks carry no colour"));
    }

    let filters = filter_names(document, dict);
    if filters.iter().any(|f| f == b"DCTDecode") {
        let img = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)?;
        return Ok(img.to_rgb8());
    }
    if let Some(other) = filters
        .iter()
        .find(|f| matches!(f.as_slice(), b"JPXDecode" | b"JBIG2Decode" | b"CCITTFaxDecode"))
    {
        return Err(unsupported(&format!(
            "filter /{} is not supported",
            String::from_utf8_lossy(other)
        )));
    }

    let width = dimension(document, dict, b"Width").ok_or_else(|| unsupported("missing /Width"))?;
    let height =
        dimension(document, dict, b"Height").ok_or_else(|| unsupported("missing /Height"))?;
    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| pdf_utils::resolve(document, o))
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if !matches!(bits, 1 | 2 | 4 | 8) {
        return Err(unsupported(&format!("{bits} bits per component")));
    }

    let colour_space = match dict.get(b"ColorSpace") {
        Ok(cs) => parse_colour_space(document, cs)
            .ok_or_else(|| unsupported("unsupported /ColorSpace"))?,
        Err(_) => ColourSpace::Gray,
    };

    let samples = pdf_utils::stream_bytes(stream)?;

    unpack_samples(&samples, width, height, bits as u8, &colour_space)
        .ok_or_else(|| unsupported("sample data shorter than declared dimensions"))
}

fn dimension(document: &Document, dict: &Dictionary, key: &[u8]) -> Option<u32> {
    pdf_utils::resolve(document, dict.get(key).ok()?)?
        .as_i64()
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
}

fn filter_names(document: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    let Some(filter) = dict
        .get(b"Filter")
        .ok()
        .and_then(|f| pdf_utils::resolve(document, f))
    else {
        return Vec::new();
    };
    match filter {
        Object::Name(n) => vec![n.clone()],
        Object::Array(items) => items
            .iter()
            .filter_map(|i| i.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_colour_space(document: &Document, object: &Object) -> Option<ColourSpace> {
    let object = pdf_utils::resolve(document, object)?;
    match object {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Some(ColourSpace::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(ColourSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Some(ColourSpace::Cmyk),
            _ => None,
        },
        Object::Array(items) => {
            let family = items.first()?.as_name().ok()?;
            match family {
                b"CalGray" => Some(ColourSpace::Gray),
                b"CalRGB" | b"Lab" => Some(ColourSpace::Rgb),
                b"ICCBased" => {
                    let profile = pdf_utils::resolve(document, items.get(1)?)?.as_stream().ok()?;
                    match profile.dict.get(b"N").ok()?.as_i64().ok()? {
                        1 => Some(ColourSpace::Gray),
                        3 => Some(ColourSpace::Rgb),
                        4 => Some(ColourSpace::Cmyk),
                        _ => None,
                    }
                }
                b"Indexed" | b"I" => {
                    let base = parse_colour_space(document, items.get(1)?)?;
                    if matches!(base, ColourSpace::Indexed { .. }) {
                        return None;
                    }
                    let hival = pdf_utils::resolve(document, items.get(2)?)?.as_i64().ok()?;
                    let lookup = match pdf_utils::resolve(document, items.get(3)?)? {
                        Object::String(bytes, _) => bytes.clone(),
                        Object::Stream(s) => s
                            .decompressed_content()
                            .unwrap_or_else(|_| s.content.clone()),
                        _ => return None,
                    };
                    Some(ColourSpace::Indexed {
                        base: Box::new(base),
                        hival: usize::try_from(hival).ok()?,
                        lookup,
                    })
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Expand packed samples into an RGB raster. `None` when `data` is short.
fn unpack_samples(
    data: &[u8],
    width: u32,
    height: u32,
    bits: u8,
    colour_space: &ColourSpace,
) -> Option<RgbImage> {
    let components = colour_space.components();
    let row_bits = (width as usize)
        .checked_mul(components)?
        .checked_mul(bits as usize)?;
    let row_bytes = row_bits.div_ceil(8);
    if data.len() < row_bytes.checked_mul(height as usize)? {
        return None;
    }

    let max = (1u16 << bits) - 1;
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    let mut sample = Vec::with_capacity(components);

    for row in data.chunks_exact(row_bytes).take(height as usize) {
        for x in 0..width as usize {
            sample.clear();
            for c in 0..components {
                let index = x * components + c;
                sample.push(read_sample(row, index, bits));
            }
            pixels.extend_from_slice(&to_rgb(&sample, max, colour_space));
        }
    }

    RgbImage::from_raw(width, height, pixels)
}

fn read_sample(row: &[u8], index: usize, bits: u8) -> u16 {
    if bits == 8 {
        return row[index] as u16;
    }
    let bit_offset = index * bits as usize;
    let byte = row[bit_offset / 8];
    let shift = 8 - bits as usize - (bit_offset % 8);
    ((byte >> shift) as u16) & ((1u16 << bits) - 1)
}

fn scale(value: u16, max: u16) -> u8 {
    if max == 255 {
        value as u8
    } else {
        ((value as u32 * 255 + max as u32 / 2) / max as u32) as u8
    }
}

fn to_rgb(sample: &[u16], max: u16, colour_space: &ColourSpace) -> [u8; 3] {
    match colour_space {
        ColourSpace::Gray => {
            let g = scale(sample[0], max);
            [g, g, g]
        }
        ColourSpace::Rgb => [
            scale(sample[0], max),
            scale(sample[1], max),
            scale(sample[2], max),
        ],
        ColourSpace::Cmyk => cmyk_to_rgb([
            scale(sample[0], max),
            scale(sample[1], max),
            scale(sample[2], max),
            scale(sample[3], max),
        ]),
        ColourSpace::Indexed {
            base,
            hival,
            lookup,
        } => {
            let index = (sample[0] as usize).min(*hival);
            let n = base.components();
            let entry: Vec<u16> = (0..n)
                .map(|c| lookup.get(index * n + c).copied().unwrap_or(0) as u16)
                .collect();
            to_rgb(&entry, 255, base)
        }
    }
}

fn cmyk_to_rgb([c, m, y, k]: [u8; 4]) -> [u8; 3] {
    let inv_k = 255 - k as u32;
    let channel = |v: u8| ((255 - v as u32) * inv_k / 255) as u8;
    [channel(c), channel(m), channel(y)]
}
