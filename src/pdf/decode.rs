//! Pixel decoding of image XObjects into RGB.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::{Document, Object, Stream};

use crate::error::{ExtractError, Result};
use crate::models::ImageRef;
use crate::pdf::{as_number, resolve, stream_data};

/// Filters whose output we cannot turn into samples
const UNSUPPORTED_FILTERS: &[&[u8]] = &[b"JPXDecode", b"JBIG2Decode", b"CCITTFaxDecode"];

#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        hival: usize,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    pub fn components(&self) -> usize {
        match self {
            Self::Gray | Self::Indexed { .. } => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
        }
    }

    /// Convert one pixel's raw samples of depth `bpc` to RGB
    pub fn to_rgb(&self, samples: &[u16], bpc: u8) -> [u8; 3] {
        let scale = |v: u16| -> u8 {
            match bpc {
                8 => v as u8,
                16 => (v >> 8) as u8,
                b => (u32::from(v) * 255 / ((1u32 << b) - 1)) as u8,
            }
        };
        match self {
            Self::Gray => {
                let v = scale(samples[0]);
                [v, v, v]
            }
            Self::Rgb => [scale(samples[0]), scale(samples[1]), scale(samples[2])],
            Self::Cmyk => {
                let k = u32::from(scale(samples[3]));
                let channel = |c: u16| ((255 - u32::from(scale(c))) * (255 - k) / 255) as u8;
                [channel(samples[0]), channel(samples[1]), channel(samples[2])]
            }
            Self::Indexed {
                base,
                hival,
                lookup,
            } => {
                let n = base.components();
                let start = usize::from(samples[0]).min(*hival) * n;
                match lookup.get(start..start + n) {
                    Some(entry) => {
                        let entry: Vec<u16> = entry.iter().map(|&b| u16::from(b)).collect();
                        base.to_rgb(&entry, 8)
                    }
                    None => [0, 0, 0],
                }
            }
        }
    }
}

/// Decode an image XObject stream to an 8-bit RGB image
pub fn decode_image(doc: &Document, image: ImageRef, stream: &Stream) -> Result<DynamicImage> {
    let filters = filter_names(doc, stream);

    if filters.last().map(Vec::as_slice) == Some(b"DCTDecode".as_slice()) {
        let leading = &filters[..filters.len() - 1];
        let jpeg = if leading.is_empty() {
            image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)?
        } else {
            let data = strip_to_jpeg(doc, stream, leading)?;
            image::load_from_memory_with_format(&data, ImageFormat::Jpeg)?
        };
        return Ok(DynamicImage::ImageRgb8(jpeg.to_rgb8()));
    }
    let unsupported = filters
        .iter()
        .find(|f| UNSUPPORTED_FILTERS.iter().any(|u| *u == f.as_slice()));
    if let Some(f) = unsupported {
        return Err(ExtractError::unsupported(
            image,
            format!("{} encoding", String::from_utf8_lossy(f)),
        ));
    }

    let dict = &stream.dict;
    let number = |key: &[u8]| {
        dict.get(key)
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(as_number)
    };
    let width = number(b"Width").unwrap_or(0.0) as u32;
    let height = number(b"Height").unwrap_or(0.0) as u32;
    if width == 0 || height == 0 {
        return Err(ExtractError::unsupported(image, "zero width or height"));
    }

    let is_mask = matches!(
        dict.get(b"ImageMask").ok().and_then(|o| resolve(doc, o)),
        Some(Object::Boolean(true))
    );
    let (space, bpc) = if is_mask {
        (ColorSpace::Gray, 1)
    } else {
        let cs = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| resolve(doc, o))
            .ok_or_else(|| ExtractError::unsupported(image, "missing color space"))?;
        let space = parse_color_space(doc, cs, image)?;
        let bpc = number(b"BitsPerComponent").unwrap_or(8.0) as u8;
        (space, bpc)
    };
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return Err(ExtractError::unsupported(image, format!("{} bits per component", bpc)));
    }

    let decode = dict
        .get(b"Decode")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .and_then(|values| values.iter().map(as_number).collect::<Option<Vec<f64>>>())
        .and_then(|values| DecodeRanges::new(&values, space.components()));

    let data = stream_data(stream)?;
    samples_to_rgb(&data, width, height, &space, bpc, decode.as_ref())
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| ExtractError::unsupported(image, "truncated sample data"))
}

/// An image's `/Decode` array: one `(min, max)` pair per color component
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeRanges(Vec<(f64, f64)>);

impl DecodeRanges {
    /// `None` unless there are at least two values per component
    pub fn new(values: &[f64], components: usize) -> Option<Self> {
        if components == 0 || values.len() < components * 2 {
            return None;
        }
        Some(Self(
            values
                .chunks_exact(2)
                .take(components)
                .map(|pair| (pair[0], pair[1]))
                .collect(),
        ))
    }

    /// Map one pixel's raw samples through the ranges, back into sample
    /// space `0..=2^bpc-1`. Indexed ranges are in palette indices.
    fn apply(&self, pixel: &mut [u16], bpc: u8, indexed: bool) {
        let max = f64::from((1u32 << bpc) - 1);
        for (sample, &(lo, hi)) in pixel.iter_mut().zip(&self.0) {
            let v = f64::from(*sample);
            let mapped = if indexed {
                lo + v * (hi - lo) / max
            } else {
                (lo + v * (hi - lo) / max) * max
            };
            *sample = mapped.round().clamp(0.0, max) as u16;
        }
    }
}

/// Build an RGB image from packed rows of samples. `None` if `data` is short.
pub fn samples_to_rgb(
    data: &[u8],
    width: u32,
    height: u32,
    space: &ColorSpace,
    bpc: u8,
    decode: Option<&DecodeRanges>,
) -> Option<RgbImage> {
    let n = space.components();
    let per_row = width as usize * n;
    let row_bytes = (per_row * usize::from(bpc)).div_ceil(8);
    if data.len() < row_bytes * height as usize {
        return None;
    }
    let indexed = matches!(space, ColorSpace::Indexed { .. });

    let mut out = RgbImage::new(width, height);
    for (y, row) in data.chunks_exact(row_bytes).take(height as usize).enumerate() {
        let mut samples = unpack_samples(row, bpc, per_row);
        for (x, pixel) in samples.chunks_exact_mut(n).enumerate() {
            if let Some(ranges) = decode {
                ranges.apply(pixel, bpc, indexed);
            }
            out.put_pixel(x as u32, y as u32, Rgb(space.to_rgb(pixel, bpc)));
        }
    }
    Some(out)
}

/// Split a row into `count` samples of `bpc` bits, most significant first
pub fn unpack_samples(row: &[u8], bpc: u8, count: usize) -> Vec<u16> {
    match bpc {
        8 => row.iter().take(count).map(|&b| u16::from(b)).collect(),
        16 => row
            .chunks_exact(2)
            .take(count)
            .map(|p| u16::from_be_bytes([p[0], p[1]]))
            .collect(),
        _ => {
            let bits = usize::from(bpc);
            let mask = (1u16 << bits) - 1;
            (0..count)
                .map(|i| {
                    let offset = i * bits;
                    let byte = u16::from(row[offset / 8]);
                    (byte >> (8 - bits - offset % 8)) & mask
                })
                .collect()
        }
    }
}

/// Undo the filters in front of a trailing `DCTDecode`, leaving JPEG data
fn strip_to_jpeg(doc: &Document, stream: &Stream, leading: &[Vec<u8>]) -> lopdf::Result<Vec<u8>> {
    let mut inner = Stream::new(stream.dict.clone(), stream.content.clone());
    let names: Vec<Object> = leading.iter().map(|f| Object::Name(f.clone())).collect();
    inner.dict.set("Filter", Object::Array(names));

    let parms = stream
        .dict
        .get(b"DecodeParms")
        .ok()
        .and_then(|o| resolve(doc, o))
        .cloned();
    match parms {
        Some(Object::Array(items)) => match items.first().and_then(|o| resolve(doc, o)) {
            Some(Object::Dictionary(first)) => inner.dict.set("DecodeParms", first.clone()),
            _ => {
                inner.dict.remove(b"DecodeParms");
            }
        },
        Some(Object::Dictionary(d)) => inner.dict.set("DecodeParms", d),
        _ => {
            inner.dict.remove(b"DecodeParms");
        }
    }
    inner.decompressed_content()
}

fn filter_names(doc: &Document, stream: &Stream) -> Vec<Vec<u8>> {
    match stream.dict.get(b"Filter").ok().and_then(|o| resolve(doc, o)) {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| resolve(doc, o))
            .filter_map(|o| o.as_name().ok())
            .map(<[u8]>::to_vec)
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_color_space(doc: &Document, obj: &Object, image: ImageRef) -> Result<ColorSpace> {
    match obj {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"G" | b"CalGray" => Ok(ColorSpace::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColorSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::Cmyk),
            other => Err(ExtractError::unsupported(
                image,
                format!("color space {}", String::from_utf8_lossy(other)),
            )),
        },
        Object::Array(items) => {
            let family = items
                .first()
                .and_then(|o| resolve(doc, o))
                .and_then(|o| o.as_name().ok())
                .ok_or_else(|| ExtractError::unsupported(image, "empty color space array"))?;
            let arg = |i: usize| items.get(i).and_then(|o| resolve(doc, o));
            match family {
                b"CalGray" => Ok(ColorSpace::Gray),
                b"CalRGB" => Ok(ColorSpace::Rgb),
                b"ICCBased" => {
                    let profile = arg(1)
                        .and_then(|o| o.as_stream().ok())
                        .ok_or_else(|| ExtractError::unsupported(image, "ICCBased without profile"))?;
                    let n = profile.dict.get(b"N").ok().and_then(|o| resolve(doc, o)).and_then(as_number);
                    match n.map(|v| v as u32) {
                        Some(1) => Ok(ColorSpace::Gray),
                        Some(3) => Ok(ColorSpace::Rgb),
                        Some(4) => Ok(ColorSpace::Cmyk),
                        _ => match profile.dict.get(b"Alternate").ok().and_then(|o| resolve(doc, o)) {
                            Some(alt) => parse_color_space(doc, alt, image),
                            None => Err(ExtractError::unsupported(image, "ICCBased with unknown /N")),
                        },
                    }
                }
                b"Indexed" | b"I" => {
                    let base = arg(1)
                        .ok_or_else(|| ExtractError::unsupported(image, "Indexed without base"))
                        .and_then(|b| parse_color_space(doc, b, image))?;
                    if matches!(base, ColorSpace::Indexed { .. }) {
                        return Err(ExtractError::unsupported(image, "nested Indexed color space"));
                    }
                    let hival = arg(2).and_then(as_number).unwrap_or(0.0).max(0.0) as usize;
                    let lookup = match arg(3) {
                        Some(Object::String(bytes, _)) => bytes.clone(),
                        Some(Object::Stream(s)) => stream_data(s)?,
                        _ => return Err(ExtractError::unsupported(image, "Indexed without lookup")),
                    };
                    Ok(ColorSpace::Indexed {
                        base: Box::new(base),
                        hival,
                        lookup,
                    })
                }
                _ if items.len() == 1 => match resolve(doc, &items[0]) {
                    Some(inner) => parse_color_space(doc, inner, image),
                    None => Err(ExtractError::unsupported(image, "dangling color space")),
                },
                other => Err(ExtractError::unsupported(
                    image,
                    format!("color space {}", String::from_utf8_lossy(other)),
                )),
            }
        }
        _ => Err(ExtractError::unsupported(image, "malformed color space")),
    }
}
