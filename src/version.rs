use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::metadata::MalformedDocumentError;

/// A `major.minor` format version as found in `cloud.js` documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// True if `self <= other`.
    pub fn up_to(&self, other: Version) -> bool {
        *self <= other
    }

    pub fn newer_than(&self, other: Version) -> bool {
        *self > other
    }

    pub fn equal_or_higher(&self, other: Version) -> bool {
        *self >= other
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = MalformedDocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MalformedDocumentError::InvalidVersion(s.to_string());
        let trimmed = s.trim();

        let (major, minor) = match trimmed.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (trimmed, "0"),
        };

        let major = major.parse().map_err(|_| invalid())?;
        let minor = minor.parse().map_err(|_| invalid())?;

        Ok(Self { major, minor })
    }
}

impl TryFrom<String> for Version {
    type Error = MalformedDocumentError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_major_minor() {
        assert_eq!("1.7".parse::<Version>().unwrap(), Version::new(1, 7));
        assert_eq!(" 2.0 ".parse::<Version>().unwrap(), Version::new(2, 0));
    }

    #[test]
    fn parse_major_only() {
        assert_eq!("2".parse::<Version>().unwrap(), Version::new(2, 0));
    }

    #[test]
    fn parse_invalid() {
        for input in ["", "abc", "1.x", "1.2.3", "-1.0"] {
            assert!(
                matches!(
                    input.parse::<Version>(),
                    Err(MalformedDocumentError::InvalidVersion(_))
                ),
                "{input:?} should not parse"
            );
        }
    }

    #[test]
    fn comparison_is_numeric() {
        let v1_10: Version = "1.10".parse().unwrap();
        let v1_9: Version = "1.9".parse().unwrap();

        assert!(v1_10.newer_than(v1_9));
        assert!(!v1_10.up_to(v1_9));
        assert!(v1_9.up_to(v1_10));
    }

    #[test]
    fn thresholds() {
        let v1_4 = Version::new(1, 4);
        let v1_5 = Version::new(1, 5);

        assert!(v1_4.up_to(v1_4));
        assert!(v1_4.up_to(v1_5));
        assert!(!v1_5.up_to(v1_4));
        assert!(v1_5.equal_or_higher(v1_5));
        assert!(!v1_4.equal_or_higher(v1_5));
        assert!(Version::new(2, 0).newer_than(v1_5));
    }
}
