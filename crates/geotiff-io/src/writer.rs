//! Writing band stacks as GeoTIFF.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Seek, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{GeoTiffError, Result};
use crate::metadata::{GdalMetadata, MetadataItem};
use crate::raster::{Band, BandRaster};
use crate::tags;

// Uncompressed bytes per strip before rows are split across strips.
const STRIP_BYTES: usize = 256 * 1024;

/// Compression method for GeoTIFF output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoTiffCompression {
    /// No compression
    None,
    /// Deflate compression (zlib)
    #[default]
    Deflate,
}

impl GeoTiffCompression {
    /// TIFF Compression tag value.
    fn tag_value(self) -> u16 {
        match self {
            GeoTiffCompression::None => 1,
            GeoTiffCompression::Deflate => 8,
        }
    }

    fn encode(self, strip: Vec<u8>) -> Result<Vec<u8>> {
        match self {
            GeoTiffCompression::None => Ok(strip),
            GeoTiffCompression::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
                encoder.write_all(&strip)?;
                Ok(encoder.finish()?)
            }
        }
    }
}

impl FromStr for GeoTiffCompression {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Self::None),
            "deflate" | "zip" => Ok(Self::Deflate),
            _ => Err(format!("Unknown compression: {}", s)),
        }
    }
}

impl fmt::Display for GeoTiffCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Deflate => "deflate",
        };
        f.write_str(name)
    }
}

/// Writes a [`BandRaster`] as one chunky `f32` directory with a sample per band.
pub struct GeoTiffWriter<'a> {
    raster: &'a BandRaster,
    compression: GeoTiffCompression,
}

impl<'a> GeoTiffWriter<'a> {
    pub fn new(raster: &'a BandRaster) -> Self {
        Self {
            raster,
            compression: GeoTiffCompression::default(),
        }
    }

    pub fn compression(mut self, compression: GeoTiffCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Write to `path`, replacing any existing file atomically.
    ///
    /// Data goes to a hidden sibling file first which is then renamed over
    /// the target. On failure the sibling is removed and `path` is untouched.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), bands = self.raster.band_count()))]
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let staging = staging_path(path);

        let outcome = self.write_file(&staging).and_then(|()| {
            fs::rename(&staging, path)?;
            Ok(())
        });

        if let Err(e) = &outcome {
            warn!(error = %e, "GeoTIFF write failed, discarding staging file");
            let _ = fs::remove_file(&staging);
        } else {
            debug!(compression = %self.compression, "Wrote GeoTIFF");
        }
        outcome
    }

    fn write_file(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()?;
        out.into_inner()
            .map_err(|e| GeoTiffError::Io(e.into_error()))?
            .sync_all()?;
        Ok(())
    }

    /// Encode into any seekable writer.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        self.raster.validate()?;
        let bands = &self.raster.bands;
        if bands.is_empty() {
            return Err(GeoTiffError::invalid_data("raster has no bands"));
        }

        let template = &self.raster.template;
        let width = u32::try_from(template.width)
            .map_err(|_| GeoTiffError::invalid_data("width exceeds TIFF limits"))?;
        let height = u32::try_from(template.height)
            .map_err(|_| GeoTiffError::invalid_data("height exceeds TIFF limits"))?;
        let samples = u16::try_from(bands.len())
            .map_err(|_| GeoTiffError::invalid_data("band count exceeds TIFF limits"))?;
        let metadata = self.gdal_metadata().to_xml()?;

        let mut encoder = TiffEncoder::new(writer)?;
        let mut dir = encoder.image_directory()?;

        dir.write_tag(Tag::ImageWidth, width)?;
        dir.write_tag(Tag::ImageLength, height)?;
        dir.write_tag(Tag::BitsPerSample, vec![32u16; bands.len()].as_slice())?;
        dir.write_tag(Tag::Compression, self.compression.tag_value())?;
        // BlackIsZero
        dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
        dir.write_tag(Tag::SamplesPerPixel, samples)?;
        // IEEE floating point
        dir.write_tag(Tag::SampleFormat, vec![3u16; bands.len()].as_slice())?;
        dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
        if bands.len() > 1 {
            // Unspecified extra samples.
            dir.write_tag(Tag::ExtraSamples, vec![0u16; bands.len() - 1].as_slice())?;
        }

        let rows = rows_per_strip(template.width, bands.len());
        dir.write_tag(Tag::RowsPerStrip, rows as u32)?;

        self.write_geotiff_tags(&mut dir)?;
        dir.write_tag(Tag::Unknown(tags::GDAL_METADATA), metadata.as_str())?;

        let mut offsets = Vec::new();
        let mut byte_counts = Vec::new();
        for first in (0..template.height).step_by(rows) {
            let last = (first + rows).min(template.height);
            let raw = interleave(bands, template.width, first..last);
            let strip = self.compression.encode(raw)?;
            let offset = dir.write_data(strip.as_slice())?;
            offsets.push(u32::try_from(offset).map_err(|_| {
                GeoTiffError::invalid_data("stack exceeds the 4 GiB classic TIFF limit")
            })?);
            byte_counts.push(strip.len() as u32);
        }
        dir.write_tag(Tag::StripOffsets, offsets.as_slice())?;
        dir.write_tag(Tag::StripByteCounts, byte_counts.as_slice())?;
        dir.finish()?;

        Ok(())
    }

    /// Placeholder flag plus one DESCRIPTION item per described band.
    fn gdal_metadata(&self) -> GdalMetadata {
        let mut metadata = GdalMetadata::default();
        metadata.push(MetadataItem::dataset(
            tags::PLACEHOLDER_ITEM,
            self.raster.placeholder.unwrap_or(false).to_string(),
        ));
        for (sample, band) in self.raster.bands.iter().enumerate() {
            if !band.description.is_empty() {
                metadata.push(MetadataItem::band_description(sample, band.description.as_str()));
            }
        }
        metadata
    }

    fn write_geotiff_tags<W: Write + Seek, K: TiffKind>(
        &self,
        dir: &mut DirectoryEncoder<W, K>,
    ) -> Result<()> {
        let template = &self.raster.template;
        let (pixel_scale, tiepoint) = tags::model_tags(&template.transform);
        dir.write_tag(Tag::Unknown(tags::MODEL_PIXEL_SCALE), pixel_scale.as_slice())?;
        dir.write_tag(Tag::Unknown(tags::MODEL_TIEPOINT), tiepoint.as_slice())?;

        let geokeys =
            tags::build_geokey_directory(template.crs, projection::is_geographic(template.crs))?;
        dir.write_tag(Tag::Unknown(tags::GEO_KEY_DIRECTORY), geokeys.as_slice())?;

        let nodata = tags::format_nodata(template.nodata);
        dir.write_tag(Tag::Unknown(tags::GDAL_NODATA), nodata.as_str())?;
        Ok(())
    }
}

/// Convenience wrapper around [`GeoTiffWriter`].
pub fn write_raster(
    path: impl AsRef<Path>,
    raster: &BandRaster,
    compression: GeoTiffCompression,
) -> Result<()> {
    GeoTiffWriter::new(raster).compression(compression).write(path)
}

fn rows_per_strip(width: usize, bands: usize) -> usize {
    let row_bytes = width * bands * std::mem::size_of::<f32>();
    (STRIP_BYTES / row_bytes.max(1)).max(1)
}

/// Pixel-interleaved native-endian bytes for `rows`.
fn interleave(bands: &[Band], width: usize, rows: Range<usize>) -> Vec<u8> {
    let cells = rows.start * width..rows.end * width;
    let mut bytes = Vec::with_capacity(cells.len() * bands.len() * 4);
    for cell in cells {
        for band in bands {
            bytes.extend_from_slice(&band.data[cell].to_ne_bytes());
        }
    }
    bytes
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "raster.tif".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_from_str() {
        assert_eq!("NONE".parse::<GeoTiffCompression>().unwrap(), GeoTiffCompression::None);
        assert!("lzw".parse::<GeoTiffCompression>().is_err());
        assert_eq!("zip".parse::<GeoTiffCompression>().unwrap(), GeoTiffCompression::Deflate);
        assert!("jpeg".parse::<GeoTiffCompression>().is_err());
        assert_eq!(GeoTiffCompression::None.to_string(), "none");
    }

    #[test]
    fn test_staging_path_is_sibling() {
        let target = Path::new("/data/stack.tif");
        let staging = staging_path(target);
        assert_eq!(staging.parent(), target.parent());
        let name = staging.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(".stack.tif."));
        assert!(name.ends_with(".tmp"));
    }

    #[test]
    fn test_interleave_is_pixel_major() {
        let bands = vec![
            Band::new(vec![1.0, 2.0, 3.0, 4.0], "a"),
            Band::new(vec![10.0, 20.0, 30.0, 40.0], "b"),
        ];
        let bytes = interleave(&bands, 2, 1..2);
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(values, vec![3.0, 30.0, 4.0, 40.0]);
    }

    #[test]
    fn test_rows_per_strip_never_zero() {
        assert_eq!(rows_per_strip(10_000_000, 4), 1);
        assert_eq!(rows_per_strip(1024, 1), 64);
    }
}
