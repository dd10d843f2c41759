//! Orientation correction table
//!
//! Each [`OrientationCode`] names a fixed coordinate-frame correction that puts
//! a surface into display orientation (head up, patient right on screen right).
//! The table is closed: codes are parsed into the enum up front and unknown
//! codes are rejected instead of falling back to identity.
//!
//! Composite `hf*` codes chain the head-first flip with a base correction. The
//! flip is the first stage of the chain, so with pre-multiply concatenation the
//! composite matrix is `HF * base`.

use atlasview_core::{Error, Matrix3, Result, Transform3D};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named orientation correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OrientationCode {
    /// Superior to inferior: Y takes Z, Z takes -Y
    Si,
    /// Inferior to superior: Y takes -Z, Z takes -Y
    Is,
    /// Anterior to posterior: Y flip
    Ap,
    /// Posterior to anterior: Y and Z flip
    Pa,
    /// Left to right: X takes -Z, Y flips, Z takes X
    Lr,
    /// Right to left: X takes Z, Y flips, Z takes X
    Rl,
    /// Head first: X and Z flip
    Hf,
    Identity,
    /// All-zero scale, collapses geometry to hide it
    Zero,
    HfSi,
    HfIs,
    HfAp,
    HfPa,
    HfLr,
    HfRl,
}

impl OrientationCode {
    pub const ALL: [OrientationCode; 15] = [
        OrientationCode::Si,
        OrientationCode::Is,
        OrientationCode::Ap,
        OrientationCode::Pa,
        OrientationCode::Lr,
        OrientationCode::Rl,
        OrientationCode::Hf,
        OrientationCode::Identity,
        OrientationCode::Zero,
        OrientationCode::HfSi,
        OrientationCode::HfIs,
        OrientationCode::HfAp,
        OrientationCode::HfPa,
        OrientationCode::HfLr,
        OrientationCode::HfRl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrientationCode::Si => "si",
            OrientationCode::Is => "is",
            OrientationCode::Ap => "ap",
            OrientationCode::Pa => "pa",
            OrientationCode::Lr => "lr",
            OrientationCode::Rl => "rl",
            OrientationCode::Hf => "hf",
            OrientationCode::Identity => "I",
            OrientationCode::Zero => "Z",
            OrientationCode::HfSi => "hfsi",
            OrientationCode::HfIs => "hfis",
            OrientationCode::HfAp => "hfap",
            OrientationCode::HfPa => "hfpa",
            OrientationCode::HfLr => "hflr",
            OrientationCode::HfRl => "hfrl",
        }
    }

    /// Base correction applied after the head-first flip, for composite codes
    pub fn head_first_base(&self) -> Option<OrientationCode> {
        match self {
            OrientationCode::HfSi => Some(OrientationCode::Si),
            OrientationCode::HfIs => Some(OrientationCode::Is),
            OrientationCode::HfAp => Some(OrientationCode::Ap),
            OrientationCode::HfPa => Some(OrientationCode::Pa),
            OrientationCode::HfLr => Some(OrientationCode::Lr),
            OrientationCode::HfRl => Some(OrientationCode::Rl),
            _ => None,
        }
    }

    /// The correction transform for this code
    pub fn transform(&self) -> Transform3D {
        if let Some(base) = self.head_first_base() {
            let mut composite = OrientationCode::Hf.transform();
            composite.concatenate(&base.transform());
            return composite;
        }

        match self {
            OrientationCode::Si => swap(&[(0, 0, 1.0), (1, 2, 1.0), (2, 1, -1.0)]),
            OrientationCode::Is => swap(&[(0, 0, 1.0), (1, 2, -1.0), (2, 1, -1.0)]),
            OrientationCode::Lr => swap(&[(0, 2, -1.0), (1, 1, -1.0), (2, 0, 1.0)]),
            OrientationCode::Rl => swap(&[(0, 2, 1.0), (1, 1, -1.0), (2, 0, 1.0)]),
            OrientationCode::Hf => swap(&[(0, 0, -1.0), (1, 1, 1.0), (2, 2, -1.0)]),
            OrientationCode::Ap => Transform3D::scaling(1.0, -1.0, 1.0),
            OrientationCode::Pa => Transform3D::scaling(1.0, -1.0, -1.0),
            OrientationCode::Zero => Transform3D::scaling(0.0, 0.0, 0.0),
            _ => Transform3D::identity(),
        }
    }
}

/// Linear transform with the given `(row, column, value)` entries and zeros elsewhere
fn swap(entries: &[(usize, usize, f64)]) -> Transform3D {
    let mut linear = Matrix3::zeros();
    for &(row, col, value) in entries {
        linear[(row, col)] = value;
    }
    Transform3D::from_linear(linear)
}

impl FromStr for OrientationCode {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        OrientationCode::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == code)
            .ok_or_else(|| Error::UnknownOrientation(code.to_string()))
    }
}

impl TryFrom<String> for OrientationCode {
    type Error = Error;

    fn try_from(code: String) -> Result<Self> {
        code.parse()
    }
}

impl From<OrientationCode> for String {
    fn from(code: OrientationCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for OrientationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look up the correction transform for an orientation code
pub fn get(code: &str) -> Result<Transform3D> {
    Ok(code.parse::<OrientationCode>()?.transform())
}
