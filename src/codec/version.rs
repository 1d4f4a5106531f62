//! Protocol revision string parsing.
//!
//! A codec maps each protocol version to a revision string of the form
//! `(REGION "-")? MAJOR ("." MINOR)? ("/" SYSMSG)?`, e.g. `EU-308.02/12`,
//! `308.02`, or `KR-331`. The major patch version selects the system-message
//! table unless an explicit sysmsg component overrides it.

use crate::error::{constants, DispatchError, Result};

/// Parsed protocol revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub region: Option<String>,
    pub major: u32,
    pub minor: Option<u32>,
    pub sysmsg: Option<u32>,
}

impl Revision {
    /// Parse a revision string. Empty components and non-numeric patch
    /// fields are rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let malformed = || {
            DispatchError::InvalidArgument(format!(
                "{}: {input:?}",
                constants::ERR_BAD_REVISION
            ))
        };

        let (patch, sysmsg) = match input.split_once('/') {
            Some((left, right)) => (left, Some(right.parse::<u32>().map_err(|_| malformed())?)),
            None => (input, None),
        };

        let (region, numbers) = match patch.split_once('-') {
            Some((region, rest)) if !region.is_empty() => (Some(region.to_string()), rest),
            Some(_) => return Err(malformed()),
            None => (None, patch),
        };

        let (major, minor) = match numbers.split_once('.') {
            Some((major, minor)) => (
                major.parse::<u32>().map_err(|_| malformed())?,
                Some(minor.parse::<u32>().map_err(|_| malformed())?),
            ),
            None => (numbers.parse::<u32>().map_err(|_| malformed())?, None),
        };

        Ok(Self {
            region,
            major,
            minor,
            sysmsg,
        })
    }

    /// The system-message table version this revision selects.
    pub fn sysmsg_version(&self) -> u32 {
        self.sysmsg.unwrap_or(self.major)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_revision() {
        let rev = Revision::parse("EU-308.02/12").expect("valid");
        assert_eq!(rev.region.as_deref(), Some("EU"));
        assert_eq!(rev.major, 308);
        assert_eq!(rev.minor, Some(2));
        assert_eq!(rev.sysmsg, Some(12));
        assert_eq!(rev.sysmsg_version(), 12);
    }

    #[test]
    fn test_major_only() {
        let rev = Revision::parse("331").expect("valid");
        assert_eq!(rev.region, None);
        assert_eq!(rev.major, 331);
        assert_eq!(rev.minor, None);
        assert_eq!(rev.sysmsg_version(), 331);
    }

    #[test]
    fn test_region_without_minor() {
        let rev = Revision::parse("KR-331").expect("valid");
        assert_eq!(rev.region.as_deref(), Some("KR"));
        assert_eq!(rev.major, 331);
    }

    #[test]
    fn test_major_minor_without_region() {
        let rev = Revision::parse("308.02").expect("valid");
        assert_eq!(rev.region, None);
        assert_eq!(rev.major, 308);
        assert_eq!(rev.minor, Some(2));
    }

    #[test]
    fn test_malformed_rejected() {
        for bad in ["", "-308", "EU-", "EU-abc", "308.", "308/x", "308./2"] {
            assert!(Revision::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
