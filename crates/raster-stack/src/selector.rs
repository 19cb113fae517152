//! `Band <n>: <description>` band selectors.
//!
//! List widgets hand band choices over as display strings. The band number
//! is the text after the first `"Band "` (up to the next `"Band "` and then
//! the first `':'`); the description is the text between the first `": "`
//! and the next `": "`. Both rules are kept verbatim so strings produced by
//! existing front ends keep working.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StackError};

const BAND_PREFIX: &str = "Band ";
const SEPARATOR: &str = ": ";

/// A typed `(index, description)` pair. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BandSelector {
    pub index: usize,
    pub description: String,
}

impl BandSelector {
    pub fn new(index: usize, description: impl Into<String>) -> Self {
        Self {
            index,
            description: description.into(),
        }
    }

    /// Parse one selector string.
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = || StackError::MalformedBandSelector(text.to_string());

        let after_prefix = text.split(BAND_PREFIX).nth(1).ok_or_else(malformed)?;
        let number = after_prefix.split(':').next().ok_or_else(malformed)?;
        let index: usize = number.trim().parse().map_err(|_| malformed())?;
        if index == 0 {
            return Err(malformed());
        }

        let description = text.split(SEPARATOR).nth(1).ok_or_else(malformed)?;

        Ok(Self::new(index, description))
    }

    /// Zero-based position of the band.
    pub fn position(&self) -> usize {
        self.index - 1
    }
}

impl FromStr for BandSelector {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BandSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}", BAND_PREFIX, self.index, SEPARATOR, self.description)
    }
}

/// Parse a list of selector strings, failing on the first malformed entry.
pub fn parse_selectors<S: AsRef<str>>(items: &[S]) -> Result<Vec<BandSelector>> {
    items.iter().map(|s| BandSelector::parse(s.as_ref())).collect()
}

/// Selector strings for every band of a stack, as a list widget shows them.
pub fn selectors_for(descriptions: &[String]) -> Vec<BandSelector> {
    descriptions
        .iter()
        .enumerate()
        .map(|(i, d)| BandSelector::new(i + 1, d.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let sel = BandSelector::parse("Band 3: magnetics").unwrap();
        assert_eq!(sel, BandSelector::new(3, "magnetics"));
        assert_eq!(sel.position(), 2);
    }

    #[test]
    fn test_parse_padded_number() {
        let sel = BandSelector::parse("Band  12 : depth to basement").unwrap();
        assert_eq!(sel.index, 12);
        // The description starts after the first ": ".
        assert_eq!(sel.description, "depth to basement");
    }

    #[test]
    fn test_description_stops_at_next_separator() {
        let sel = BandSelector::parse("Band 2: gravity: residual").unwrap();
        assert_eq!(sel.description, "gravity");
    }

    #[test]
    fn test_description_may_be_empty() {
        let sel = BandSelector::parse("Band 1: ").unwrap();
        assert_eq!(sel.description, "");
    }

    #[test]
    fn test_malformed() {
        for bad in ["band 1: x", "Band x: y", "Band 0: zero", "Band 4:nospace", "Band : a", ""] {
            assert!(
                matches!(BandSelector::parse(bad), Err(StackError::MalformedBandSelector(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_display_roundtrip() {
        let sel = BandSelector::new(7, "Au ppm");
        assert_eq!(sel.to_string(), "Band 7: Au ppm");
        assert_eq!(sel.to_string().parse::<BandSelector>().unwrap(), sel);
    }

    #[test]
    fn test_parse_list() {
        let sels = parse_selectors(&["Band 1: a", "Band 3: c"]).unwrap();
        assert_eq!(sels.iter().map(|s| s.index).collect::<Vec<_>>(), vec![1, 3]);
        assert!(parse_selectors(&["Band 1: a", "oops"]).is_err());
    }
}
