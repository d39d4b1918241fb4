//! JA3 fingerprint descriptors.
//!
//! A JA3 string has five comma-separated fields:
//! `SSLVersion,Ciphers,Extensions,EllipticCurves,EllipticCurvePointFormats`,
//! where every field after the first is a dash-separated (possibly empty)
//! list of decimal values.

use std::fmt;
use std::str::FromStr;

use reqwest::tls::Version;

/// TLS extension number for ALPN.
const EXT_ALPN: u16 = 16;
/// TLS extension number for `supported_versions` (TLS 1.3 capable clients).
const EXT_SUPPORTED_VERSIONS: u16 = 43;

/// Parsed JA3 descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ja3 {
    pub version: u16,
    pub ciphers: Vec<u16>,
    pub extensions: Vec<u16>,
    pub curves: Vec<u16>,
    pub point_formats: Vec<u8>,
}

impl Ja3 {
    /// Lowest TLS version the client advertises.
    pub fn min_tls_version(&self) -> Version {
        match self.version {
            769 => Version::TLS_1_0,
            770 => Version::TLS_1_1,
            771 => Version::TLS_1_2,
            _ => Version::TLS_1_3,
        }
    }

    /// Whether the ClientHello offers TLS 1.3 through `supported_versions`.
    pub fn offers_tls13(&self) -> bool {
        self.version == 772 || self.extensions.contains(&EXT_SUPPORTED_VERSIONS)
    }

    /// Whether the ClientHello carries ALPN, and so may negotiate HTTP/2.
    pub fn offers_alpn(&self) -> bool {
        self.extensions.contains(&EXT_ALPN)
    }

    /// Pre-TLS 1.2 clients need a backend that still speaks the old versions.
    pub fn is_legacy(&self) -> bool {
        self.version < 771
    }
}

fn parse_list<T: FromStr>(field: &str, name: &str) -> Result<Vec<T>, String> {
    if field.is_empty() {
        return Ok(Vec::new());
    }
    field
        .split('-')
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| format!("invalid {} value '{}'", name, v))
        })
        .collect()
}

impl FromStr for Ja3 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split(',').collect();
        if fields.len() != 5 {
            return Err(format!("expected 5 fields, found {}", fields.len()));
        }

        let version: u16 = fields[0]
            .parse()
            .map_err(|_| format!("invalid TLS version '{}'", fields[0]))?;
        if !(769..=772).contains(&version) {
            return Err(format!("unsupported TLS version {}", version));
        }

        Ok(Self {
            version,
            ciphers: parse_list(fields[1], "cipher")?,
            extensions: parse_list(fields[2], "extension")?,
            curves: parse_list(fields[3], "curve")?,
            point_formats: parse_list(fields[4], "point format")?,
        })
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str("-")?;
        }
        write!(f, "{}", v)?;
    }
    Ok(())
}

impl fmt::Display for Ja3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},", self.version)?;
        write_list(f, &self.ciphers)?;
        f.write_str(",")?;
        write_list(f, &self.extensions)?;
        f.write_str(",")?;
        write_list(f, &self.curves)?;
        f.write_str(",")?;
        write_list(f, &self.point_formats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME: &str = "771,4865-4866-4867-49195-49199,0-23-65281-10-11-35-16-5-13-18-51-45-43-27-21,29-23-24,0";

    #[test]
    fn test_parse_chrome() {
        let ja3: Ja3 = CHROME.parse().unwrap();
        assert_eq!(ja3.version, 771);
        assert_eq!(ja3.ciphers.len(), 5);
        assert_eq!(ja3.curves, vec![29, 23, 24]);
        assert_eq!(ja3.point_formats, vec![0]);
        assert!(ja3.offers_alpn());
        assert!(ja3.offers_tls13());
        assert!(!ja3.is_legacy());
        assert_eq!(ja3.to_string(), CHROME);
    }

    #[test]
    fn test_parse_empty_lists() {
        let ja3: Ja3 = "769,47-53,,,".parse().unwrap();
        assert!(ja3.extensions.is_empty());
        assert!(ja3.is_legacy());
        assert!(!ja3.offers_alpn());
        assert!(!ja3.offers_tls13());
        assert_eq!(ja3.min_tls_version(), Version::TLS_1_0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Ja3>().is_err());
        assert!("chrome".parse::<Ja3>().is_err());
        assert!("771,1-2,3".parse::<Ja3>().is_err());
        assert!("771,1-x,0,29,0".parse::<Ja3>().is_err());
        assert!("768,47,0,29,0".parse::<Ja3>().is_err());
        assert!("771,47,0,29,300".parse::<Ja3>().is_err());
    }
}
