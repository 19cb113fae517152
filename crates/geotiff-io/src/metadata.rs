//! The GDAL_METADATA XML document.
//!
//! GDAL stores free-form metadata as
//!
//! ```xml
//! <GDALMetadata>
//!   <Item name="STACK_PLACEHOLDER">false</Item>
//!   <Item name="DESCRIPTION" sample="0" role="description">elevation</Item>
//! </GDALMetadata>
//! ```
//!
//! Items without a `sample` attribute belong to the dataset; items with one
//! belong to the 0-based band. TIFF ASCII tags cannot hold anything above
//! 0x7F, so non-ASCII text is written as numeric character references.

use std::borrow::Cow;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{GeoTiffError, Result};

const ROOT: &str = "GDALMetadata";
const ITEM: &str = "Item";
/// Band description item name.
pub const DESCRIPTION_ITEM: &str = "DESCRIPTION";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataItem {
    pub name: String,
    pub sample: Option<usize>,
    pub role: Option<String>,
    pub value: String,
}

impl MetadataItem {
    pub fn dataset(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sample: None,
            role: None,
            value: value.into(),
        }
    }

    pub fn band_description(sample: usize, value: impl Into<String>) -> Self {
        Self {
            name: DESCRIPTION_ITEM.to_string(),
            sample: Some(sample),
            role: Some("description".to_string()),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GdalMetadata {
    pub items: Vec<MetadataItem>,
}

impl GdalMetadata {
    pub fn push(&mut self, item: MetadataItem) {
        self.items.push(item);
    }

    /// Dataset-level item by name. Band items with the same name are ignored.
    pub fn dataset_item(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.sample.is_none() && item.name == name)
            .map(|item| item.value.as_str())
    }

    /// Description of the 0-based band `sample`, if one was stored.
    pub fn band_description(&self, sample: usize) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.sample == Some(sample) && item.name == DESCRIPTION_ITEM)
            .map(|item| item.value.as_str())
    }

    /// Parse a GDAL_METADATA document.
    ///
    /// Unknown elements are skipped. Items with an unparseable `sample`
    /// attribute are dropped rather than promoted to dataset level.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut metadata = Self::default();
        let mut current: Option<(MetadataItem, bool)> = None;

        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(e) if e.name().as_ref() == ITEM.as_bytes() => {
                    current = Some(read_item_attributes(&e)?);
                }
                Event::Empty(e) if e.name().as_ref() == ITEM.as_bytes() => {
                    if let (item, true) = read_item_attributes(&e)? {
                        metadata.push(item);
                    }
                }
                Event::Text(t) => {
                    if let Some((item, _)) = current.as_mut() {
                        item.value.push_str(&t.unescape().map_err(xml_error)?);
                    }
                }
                Event::CData(c) => {
                    if let Some((item, _)) = current.as_mut() {
                        item.value.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::End(e) if e.name().as_ref() == ITEM.as_bytes() => {
                    if let Some((item, true)) = current.take() {
                        metadata.push(item);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(metadata)
    }

    /// Render the document as pure ASCII.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Start(BytesStart::new(ROOT)))
            .map_err(xml_error)?;

        for item in &self.items {
            let mut start = BytesStart::new(ITEM);
            let name = encode(&item.name);
            start.push_attribute(Attribute::from(("name".as_bytes(), name.as_bytes())));
            if let Some(sample) = item.sample {
                let sample = sample.to_string();
                start.push_attribute(Attribute::from(("sample".as_bytes(), sample.as_bytes())));
            }
            if let Some(role) = &item.role {
                let role = encode(role);
                start.push_attribute(Attribute::from(("role".as_bytes(), role.as_bytes())));
            }

            writer.write_event(Event::Start(start)).map_err(xml_error)?;
            let value = encode(&item.value);
            writer
                .write_event(Event::Text(BytesText::from_escaped(value)))
                .map_err(xml_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(ITEM)))
                .map_err(xml_error)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(ROOT)))
            .map_err(xml_error)?;
        String::from_utf8(writer.into_inner()).map_err(xml_error)
    }
}

/// Attributes of an `<Item>`; the flag is false when `sample` is malformed.
fn read_item_attributes(e: &BytesStart<'_>) -> Result<(MetadataItem, bool)> {
    let mut item = MetadataItem::dataset(String::new(), String::new());
    let mut valid = true;
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        let value = attr.unescape_value().map_err(xml_error)?;
        match attr.key.as_ref() {
            b"name" => item.name = value.into_owned(),
            b"sample" => match value.trim().parse::<usize>() {
                Ok(sample) => item.sample = Some(sample),
                Err(_) => valid = false,
            },
            b"role" => item.role = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok((item, valid))
}

/// Escape markup, then replace every non-ASCII char with `&#N;`.
fn encode(text: &str) -> String {
    let escaped: Cow<'_, str> = quick_xml::escape::escape(text);
    if escaped.is_ascii() {
        return escaped.into_owned();
    }
    let mut out = String::with_capacity(escaped.len() + 8);
    for c in escaped.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            out.push_str(&format!("&#{};", u32::from(c)));
        }
    }
    out
}

fn xml_error(err: impl std::fmt::Display) -> GeoTiffError {
    GeoTiffError::Metadata(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_lookup_ignores_band_items() {
        let xml = r#"<GDALMetadata><Item name="STACK_PLACEHOLDER" sample="0">false</Item><Item name="STACK_PLACEHOLDER">true</Item></GDALMetadata>"#;
        let metadata = GdalMetadata::parse(xml).unwrap();
        assert_eq!(metadata.dataset_item("STACK_PLACEHOLDER"), Some("true"));
    }

    #[test]
    fn test_single_quotes_and_entities() {
        let xml = "<GDALMetadata>\
            <Item name='NOTE'>a &lt;b&gt; &amp; &quot;c&quot; &apos;d&apos; &#233;&#xB5;</Item>\
            <Item name='DESCRIPTION' sample='1' role='description'>x&amp;y</Item>\
            <Item name='EMPTY'/>\
            </GDALMetadata>";
        let metadata = GdalMetadata::parse(xml).unwrap();
        assert_eq!(metadata.dataset_item("NOTE"), Some("a <b> & \"c\" 'd' éµ"));
        assert_eq!(metadata.band_description(1), Some("x&y"));
        assert_eq!(metadata.band_description(0), None);
        assert_eq!(metadata.dataset_item("EMPTY"), Some(""));
    }

    #[test]
    fn test_written_document_is_ascii() {
        let mut metadata = GdalMetadata::default();
        metadata.push(MetadataItem::dataset("STACK_PLACEHOLDER", "false"));
        metadata.push(MetadataItem::band_description(0, "Température µS"));
        metadata.push(MetadataItem::band_description(2, "a<b & \"c\""));

        let xml = metadata.to_xml().unwrap();
        assert!(xml.is_ascii());
        assert!(xml.contains("sample=\"2\""));
        assert!(xml.contains("role=\"description\""));

        let back = GdalMetadata::parse(&xml).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn test_malformed_sample_is_dropped() {
        let xml = r#"<GDALMetadata><Item name="A" sample="x">1</Item></GDALMetadata>"#;
        let metadata = GdalMetadata::parse(xml).unwrap();
        assert!(metadata.items.is_empty());
        assert_eq!(metadata.dataset_item("A"), None);
    }
}
