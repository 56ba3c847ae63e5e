//! Rotation angles and their FFmpeg transform descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Clockwise rotation applied in place to a job's primary artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum RotationAngle {
    Deg90,
    Deg180,
    Deg270,
}

impl RotationAngle {
    pub const ALL: [RotationAngle; 3] = [
        RotationAngle::Deg90,
        RotationAngle::Deg180,
        RotationAngle::Deg270,
    ];

    pub fn degrees(&self) -> u16 {
        match self {
            RotationAngle::Deg90 => 90,
            RotationAngle::Deg180 => 180,
            RotationAngle::Deg270 => 270,
        }
    }

    /// FFmpeg video filter performing the rotation.
    ///
    /// 180° is two counter-clockwise transposes rather than a separate filter.
    pub fn transform_filter(&self) -> &'static str {
        match self {
            RotationAngle::Deg90 => "transpose=1",
            RotationAngle::Deg180 => "transpose=2,transpose=2",
            RotationAngle::Deg270 => "transpose=2",
        }
    }

    /// Number of clockwise quarter turns.
    pub fn quarter_turns(&self) -> u8 {
        (self.degrees() / 90) as u8
    }
}

impl TryFrom<u16> for RotationAngle {
    type Error = ModelError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            90 => Ok(RotationAngle::Deg90),
            180 => Ok(RotationAngle::Deg180),
            270 => Ok(RotationAngle::Deg270),
            other => Err(ModelError::InvalidAngle(other.to_string())),
        }
    }
}

impl std::str::FromStr for RotationAngle {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u16>()
            .map_err(|_| ModelError::InvalidAngle(s.to_string()))
            .and_then(RotationAngle::try_from)
    }
}

impl From<RotationAngle> for u16 {
    fn from(angle: RotationAngle) -> Self {
        angle.degrees()
    }
}

impl fmt::Display for RotationAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}
