//! Scroll distances mapped onto a pinned region's full progress range

use crate::Error;
use std::fmt;
use std::str::FromStr;

/// Scroll-equivalent length of a pinned region, independent of its rendered height
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distance {
    /// Multiples of the viewport height (`"1200vh"` is twelve viewports)
    ViewportHeights(f64),
    /// Absolute pixels
    Pixels(f64),
}

impl Distance {
    /// Resolves the distance against the current viewport height
    pub fn to_pixels(self, viewport_height: f64) -> f64 {
        match self {
            Self::ViewportHeights(vh) => vh / 100.0 * viewport_height,
            Self::Pixels(px) => px,
        }
    }
}

impl FromStr for Distance {
    type Err = Error;

    /// Parses `"1200vh"`, `"+=110vh"`, `"800px"` or a bare pixel count
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches("+=");
        let (number, make): (&str, fn(f64) -> Distance) =
            if let Some(n) = trimmed.strip_suffix("vh") {
                (n, Distance::ViewportHeights)
            } else if let Some(n) = trimmed.strip_suffix("px") {
                (n, Distance::Pixels)
            } else {
                (trimmed, Distance::Pixels)
            };

        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| Error::InvalidDistance(s.to_string()))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::InvalidDistance(s.to_string()));
        }
        Ok(make(value))
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ViewportHeights(vh) => write!(f, "{vh}vh"),
            Self::Pixels(px) => write!(f, "{px}px"),
        }
    }
}
