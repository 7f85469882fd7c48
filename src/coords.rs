//! Sky coordinates and search radii
//!
//! Queries embed RA/Dec in degrees in a single reference frame. Input may be
//! given in ICRS, FK5 or galactic coordinates, as decimal degrees or
//! sexagesimal text; [`Coordinates::to_fk5`] normalizes it. ICRS and FK5
//! (J2000) differ by well under the precision of a cone search and are
//! treated as the same frame.

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Rotation from ICRS unit vectors to galactic unit vectors (Hipparcos definition)
const ICRS_TO_GALACTIC: [[f64; 3]; 3] = [
    [-0.054_875_560_416_215_4, -0.873_437_090_234_885, -0.483_835_015_548_713_2],
    [0.494_109_427_875_583_7, -0.444_829_629_960_011_2, 0.746_982_244_497_218_9],
    [-0.867_666_149_019_004_7, -0.198_076_373_431_201_5, 0.455_983_776_175_066_9],
];

// Constant patterns; covered by the sexagesimal parsing tests
#[allow(clippy::expect_used)]
static HMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?\d+(?:\.\d*)?)h(?:(\d+(?:\.\d*)?)m)?(?:(\d+(?:\.\d*)?)s)?$")
        .expect("valid HMS pattern")
});
#[allow(clippy::expect_used)]
static DMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?)(\d+(?:\.\d*)?)d(?:(\d+(?:\.\d*)?)m)?(?:(\d+(?:\.\d*)?)s)?$")
        .expect("valid DMS pattern")
});

/// Celestial reference frame of a coordinate pair
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Frame {
    /// International Celestial Reference System
    #[default]
    Icrs,
    /// FK5 at equinox J2000
    Fk5,
    /// Galactic longitude/latitude
    Galactic,
}

/// Position in the fixed query frame, in degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyPosition {
    /// Right ascension in degrees, `[0, 360)`
    pub ra: f64,
    /// Declination in degrees, `[-90, 90]`
    pub dec: f64,
}

/// A coordinate pair in some frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    lon: f64,
    lat: f64,
    frame: Frame,
}

impl Coordinates {
    /// Build coordinates from longitude/latitude in degrees
    pub fn new(lon: f64, lat: f64, frame: Frame) -> Result<Self> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(Error::usage("coordinates must be finite numbers"));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(Error::usage(format!(
                "latitude {} is outside [-90, 90] degrees",
                lat
            )));
        }
        Ok(Self {
            lon: lon.rem_euclid(360.0),
            lat,
            frame,
        })
    }

    /// ICRS right ascension and declination in degrees
    pub fn icrs(ra: f64, dec: f64) -> Result<Self> {
        Self::new(ra, dec, Frame::Icrs)
    }

    /// Galactic longitude and latitude in degrees
    pub fn galactic(l: f64, b: f64) -> Result<Self> {
        Self::new(l, b, Frame::Galactic)
    }

    /// The frame these coordinates are expressed in
    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// Parse ICRS coordinates from text.
    ///
    /// Accepted forms:
    /// - `"10.6847 41.2688"` or `"10.6847, 41.2688"` (decimal degrees)
    /// - `"08h45m07.5s +54d18m00s"` (RA in hours, Dec in degrees)
    /// - `"08:45:07.5 +54:18:00"` and `"08 45 07.5 +54 18 00"` (RA in hours)
    pub fn parse(text: &str) -> Result<Self> {
        let cleaned = text.replace(',', " ");
        let parts: Vec<&str> = cleaned.split_whitespace().collect();

        let (ra, dec) = match parts.as_slice() {
            [ra, dec] if ra.contains(':') => (sexagesimal(ra)? * 15.0, sexagesimal(dec)?),
            [ra, dec] => (parse_ra(ra)?, parse_dec(dec)?),
            [h, m, s, d, am, asec] => (
                sexagesimal(&format!("{}:{}:{}", h, m, s))? * 15.0,
                sexagesimal(&format!("{}:{}:{}", d, am, asec))?,
            ),
            _ => {
                return Err(Error::usage(format!("cannot parse coordinates '{}'", text)));
            }
        };

        Self::icrs(ra, dec)
    }

    /// Normalize to the FK5/ICRS query frame
    pub fn to_fk5(&self) -> SkyPosition {
        match self.frame {
            Frame::Icrs | Frame::Fk5 => SkyPosition {
                ra: self.lon,
                dec: self.lat,
            },
            Frame::Galactic => galactic_to_icrs(self.lon, self.lat),
        }
    }
}

impl FromStr for Coordinates {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<SkyPosition> for Coordinates {
    fn from(pos: SkyPosition) -> Self {
        Self {
            lon: pos.ra,
            lat: pos.dec,
            frame: Frame::Icrs,
        }
    }
}

fn galactic_to_icrs(l: f64, b: f64) -> SkyPosition {
    let (l, b) = (l.to_radians(), b.to_radians());
    let gal = [b.cos() * l.cos(), b.cos() * l.sin(), b.sin()];

    // Inverse rotation is the transpose
    let mut icrs = [0.0; 3];
    for (i, out) in icrs.iter_mut().enumerate() {
        *out = (0..3).map(|j| ICRS_TO_GALACTIC[j][i] * gal[j]).sum();
    }

    SkyPosition {
        ra: icrs[1].atan2(icrs[0]).to_degrees().rem_euclid(360.0),
        dec: icrs[2].clamp(-1.0, 1.0).asin().to_degrees(),
    }
}

fn parse_number(text: &str) -> Result<f64> {
    text.parse::<f64>()
        .map_err(|_| Error::usage(format!("'{}' is not a number", text)))
}

/// `12.5`, `12.5d` or `08h45m07.5s` to degrees
fn parse_ra(text: &str) -> Result<f64> {
    let lower = text.to_ascii_lowercase();
    if let Some(caps) = HMS.captures(&lower) {
        let hours = parse_number(&caps[1])?;
        let minutes = caps.get(2).map_or(Ok(0.0), |m| parse_number(m.as_str()))?;
        let seconds = caps.get(3).map_or(Ok(0.0), |m| parse_number(m.as_str()))?;
        return Ok((hours + minutes / 60.0 + seconds / 3600.0) * 15.0);
    }
    parse_dec(text)
}

/// `-12.5`, `-12.5d` or `-12d30m00s` to degrees
fn parse_dec(text: &str) -> Result<f64> {
    let lower = text.to_ascii_lowercase();
    if let Some(caps) = DMS.captures(&lower) {
        let sign = if &caps[1] == "-" { -1.0 } else { 1.0 };
        let degrees = parse_number(&caps[2])?;
        let minutes = caps.get(3).map_or(Ok(0.0), |m| parse_number(m.as_str()))?;
        let seconds = caps.get(4).map_or(Ok(0.0), |m| parse_number(m.as_str()))?;
        return Ok(sign * (degrees + minutes / 60.0 + seconds / 3600.0));
    }
    parse_number(text)
}

/// `[+-]a:b:c` to `a + b/60 + c/3600` carrying the sign of `a`
fn sexagesimal(text: &str) -> Result<f64> {
    let negative = text.starts_with('-');
    let fields: Vec<&str> = text.trim_start_matches(['+', '-']).split(':').collect();
    if fields.is_empty() || fields.len() > 3 {
        return Err(Error::usage(format!("cannot parse sexagesimal '{}'", text)));
    }

    let mut value = 0.0;
    let mut scale = 1.0;
    for field in fields {
        value += parse_number(field)? / scale;
        scale *= 60.0;
    }
    Ok(if negative { -value } else { value })
}

/// Cone search radius, stored in degrees
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Radius(f64);

impl Radius {
    /// Radius in degrees
    pub fn from_degrees(degrees: f64) -> Result<Self> {
        if !degrees.is_finite() || degrees <= 0.0 {
            return Err(Error::usage(format!(
                "radius must be a positive number of degrees, got {}",
                degrees
            )));
        }
        Ok(Self(degrees))
    }

    /// Radius in arcminutes
    pub fn from_arcmin(arcmin: f64) -> Result<Self> {
        Self::from_degrees(arcmin / 60.0)
    }

    /// Radius in arcseconds
    pub fn from_arcsec(arcsec: f64) -> Result<Self> {
        Self::from_degrees(arcsec / 3600.0)
    }

    /// The radius in degrees
    pub fn degrees(&self) -> f64 {
        self.0
    }
}

impl Default for Radius {
    /// One arcminute
    fn default() -> Self {
        Self(0.016666666666667)
    }
}

impl fmt::Display for Radius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Radius {
    type Err = Error;

    /// `"0.05"`, `"5e-2"`, `"0.05 deg"`, `"3 arcmin"`, `"10arcsec"`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(value) = s.parse::<f64>() {
            return Self::from_degrees(value);
        }
        // Units carry no digits, so the number ends at the last one
        let split = s
            .rfind(|c: char| c.is_ascii_digit() || c == '.')
            .map_or(0, |i| i + 1);
        let (number, unit) = s.split_at(split);
        let value = parse_number(number.trim())?;

        match unit.trim() {
            "" | "d" | "deg" | "degree" | "degrees" => Self::from_degrees(value),
            "arcmin" | "amin" => Self::from_arcmin(value),
            "arcsec" | "asec" => Self::from_arcsec(value),
            other => Err(Error::usage(format!("unknown radius unit '{}'", other))),
        }
    }
}
