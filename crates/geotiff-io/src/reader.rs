//! Reading band stacks from GeoTIFF files.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use stack_common::{RasterTemplate, DEFAULT_NODATA};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, instrument};

use crate::error::{GeoTiffError, Result};
use crate::metadata::GdalMetadata;
use crate::raster::{Band, BandRaster, RasterHeader};
use crate::tags;

// Stacks of large grids easily exceed the decoder's default buffer limits.
const BUFFER_LIMIT: usize = 1024 * 1024 * 1024;

/// Read every band of a GeoTIFF into memory.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_raster(path: impl AsRef<Path>) -> Result<BandRaster> {
    let (header, bands) = read_file(path.as_ref(), true)?;
    debug!(
        bands = header.band_count,
        width = header.template.width,
        height = header.template.height,
        "Read raster"
    );
    Ok(BandRaster {
        template: header.template,
        bands,
        placeholder: header.placeholder,
    })
}

/// Read grid, band count, descriptions and flags without decoding pixels.
pub fn read_header(path: impl AsRef<Path>) -> Result<RasterHeader> {
    read_file(path.as_ref(), false).map(|(header, _)| header)
}

fn open(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    let mut limits = Limits::default();
    limits.decoding_buffer_size = BUFFER_LIMIT;
    limits.intermediate_buffer_size = BUFFER_LIMIT;
    limits.ifd_value_size = BUFFER_LIMIT;
    Ok(Decoder::new(BufReader::new(file))?.with_limits(limits))
}

/// Per-directory layout facts.
struct Directory {
    width: usize,
    height: usize,
    samples: usize,
    planar: u16,
    description: String,
}

fn read_file(path: &Path, with_data: bool) -> Result<(RasterHeader, Vec<Band>)> {
    let mut decoder = open(path)?;
    let template = read_template(&mut decoder, path)?;
    let metadata = read_metadata(&mut decoder)?;
    let placeholder = placeholder_flag(&metadata);

    let mut descriptions = Vec::new();
    let mut bands = Vec::new();
    let mut index = 0usize;
    loop {
        let dir = read_directory(&mut decoder)?;
        if dir.width == template.width && dir.height == template.height {
            let names = sample_descriptions(&dir, &metadata, descriptions.len());
            if with_data {
                let data = decode_f32(decoder.read_image()?)?;
                let planes = split_samples(data, &dir)?;
                bands.extend(
                    planes
                        .into_iter()
                        .zip(names.iter())
                        .map(|(data, name)| Band::new(data, name.clone())),
                );
            }
            descriptions.extend(names);
        } else {
            // Overviews and masks live in their own, smaller directories.
            debug!(index, width = dir.width, height = dir.height, "Skipping directory");
        }

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
        index += 1;
    }

    if descriptions.is_empty() {
        return Err(GeoTiffError::invalid_data(format!(
            "{} contains no bands",
            path.display()
        )));
    }

    let header = RasterHeader {
        template,
        band_count: descriptions.len(),
        descriptions,
        placeholder,
    };
    Ok((header, bands))
}

fn read_directory<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Directory> {
    let (width, height) = decoder.dimensions()?;
    let samples = match decoder.find_tag(Tag::SamplesPerPixel)? {
        Some(value) => value.into_u32()? as usize,
        None => 1,
    };
    let planar = match decoder.find_tag(Tag::PlanarConfiguration)? {
        Some(value) => value.into_u16()?,
        None => 1,
    };
    let description = match decoder.find_tag(Tag::ImageDescription)? {
        Some(value) => value.into_string()?.trim_end_matches('\0').to_string(),
        None => String::new(),
    };

    Ok(Directory {
        width: width as usize,
        height: height as usize,
        samples: samples.max(1),
        planar,
        description,
    })
}

/// The grid of the first directory.
fn read_template<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<RasterTemplate> {
    let (width, height) = decoder.dimensions()?;

    let scale = find_f64_vec(decoder, tags::MODEL_PIXEL_SCALE)?;
    let tiepoint = find_f64_vec(decoder, tags::MODEL_TIEPOINT)?;
    let transform = match (scale, tiepoint) {
        (Some(scale), Some(tiepoint)) => tags::transform_from_tiepoint(&scale, &tiepoint),
        _ => match find_f64_vec(decoder, tags::MODEL_TRANSFORMATION)? {
            Some(matrix) => {
                tags::transform_from_matrix(&matrix).map_err(GeoTiffError::UnsupportedLayout)?
            }
            None => None,
        },
    }
    .ok_or_else(|| GeoTiffError::MissingGeoreference(path.to_path_buf()))?;

    let crs = match decoder.find_tag(Tag::Unknown(tags::GEO_KEY_DIRECTORY))? {
        Some(value) => tags::parse_geokey_directory(&value.into_u32_vec()?),
        None => None,
    }
    .ok_or_else(|| GeoTiffError::MissingCrs(path.to_path_buf()))?;

    let nodata = match decoder.find_tag(Tag::Unknown(tags::GDAL_NODATA))? {
        Some(value) => tags::parse_nodata(&value.into_string()?).unwrap_or(DEFAULT_NODATA),
        None => DEFAULT_NODATA,
    };

    Ok(RasterTemplate::new(
        width as usize,
        height as usize,
        transform,
        crs,
        nodata,
    ))
}

fn read_metadata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GdalMetadata> {
    match decoder.find_tag(Tag::Unknown(tags::GDAL_METADATA))? {
        Some(value) => GdalMetadata::parse(value.into_string()?.trim_end_matches('\0')),
        None => Ok(GdalMetadata::default()),
    }
}

fn placeholder_flag(metadata: &GdalMetadata) -> Option<bool> {
    metadata.dataset_item(tags::PLACEHOLDER_ITEM).and_then(|v| {
        match v.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        }
    })
}

fn find_f64_vec<R: Read + Seek>(decoder: &mut Decoder<R>, tag: u16) -> Result<Option<Vec<f64>>> {
    match decoder.find_tag(Tag::Unknown(tag))? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

/// Descriptions for the samples of `dir`, numbered from `first`.
///
/// GDAL DESCRIPTION items win; a single-sample directory falls back to
/// its ImageDescription, the layout of page-per-band stacks.
fn sample_descriptions(dir: &Directory, metadata: &GdalMetadata, first: usize) -> Vec<String> {
    (0..dir.samples)
        .map(|i| match metadata.band_description(first + i) {
            Some(text) => text.to_string(),
            None if dir.samples == 1 => dir.description.clone(),
            None => String::new(),
        })
        .collect()
}

/// Split decoded samples into one plane per band.
fn split_samples(data: Vec<f32>, dir: &Directory) -> Result<Vec<Vec<f32>>> {
    let len = dir.width * dir.height;
    if data.len() != len * dir.samples {
        return Err(GeoTiffError::unsupported(format!(
            "decoded {} values for {}x{} with {} samples",
            data.len(),
            dir.width,
            dir.height,
            dir.samples
        )));
    }
    if dir.samples == 1 {
        return Ok(vec![data]);
    }

    if dir.planar == 2 {
        return Ok(data.chunks_exact(len).map(<[f32]>::to_vec).collect());
    }

    let mut planes = vec![Vec::with_capacity(len); dir.samples];
    for pixel in data.chunks_exact(dir.samples) {
        for (plane, &value) in planes.iter_mut().zip(pixel) {
            plane.push(value);
        }
    }
    Ok(planes)
}

fn decode_f32(result: DecodingResult) -> Result<Vec<f32>> {
    Ok(match result {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::F16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => return Err(GeoTiffError::unsupported("unrecognized sample format")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataItem;

    fn dir(samples: usize, planar: u16) -> Directory {
        Directory {
            width: 2,
            height: 1,
            samples,
            planar,
            description: "elev".to_string(),
        }
    }

    #[test]
    fn test_split_chunky() {
        let planes = split_samples(vec![1.0, 10.0, 2.0, 20.0], &dir(2, 1)).unwrap();
        assert_eq!(planes, vec![vec![1.0, 2.0], vec![10.0, 20.0]]);
    }

    #[test]
    fn test_split_planar() {
        let planes = split_samples(vec![1.0, 2.0, 10.0, 20.0], &dir(2, 2)).unwrap();
        assert_eq!(planes, vec![vec![1.0, 2.0], vec![10.0, 20.0]]);
    }

    #[test]
    fn test_split_length_mismatch() {
        assert!(split_samples(vec![1.0, 2.0, 3.0], &dir(2, 1)).is_err());
    }

    #[test]
    fn test_single_sample_keeps_description() {
        let empty = GdalMetadata::default();
        assert_eq!(sample_descriptions(&dir(1, 1), &empty, 0), vec!["elev".to_string()]);
        assert_eq!(sample_descriptions(&dir(3, 1), &empty, 0), vec![""; 3]);
    }

    #[test]
    fn test_metadata_descriptions_win() {
        let mut metadata = GdalMetadata::default();
        metadata.push(MetadataItem::band_description(1, "slope"));
        metadata.push(MetadataItem::band_description(2, "aspect"));

        assert_eq!(sample_descriptions(&dir(2, 1), &metadata, 0), vec!["", "slope"]);
        // Second page of a page-per-band stack.
        assert_eq!(sample_descriptions(&dir(1, 1), &metadata, 2), vec!["aspect"]);
    }

    #[test]
    fn test_placeholder_flag_values() {
        let mut metadata = GdalMetadata::default();
        assert_eq!(placeholder_flag(&metadata), None);
        metadata.push(MetadataItem::dataset(tags::PLACEHOLDER_ITEM, " Yes "));
        assert_eq!(placeholder_flag(&metadata), Some(true));
    }

    #[test]
    fn test_decode_integer_samples() {
        let out = decode_f32(DecodingResult::I16(vec![-5, 7])).unwrap();
        assert_eq!(out, vec![-5.0, 7.0]);
    }
}
