//! Stage training parameters.
//!
//! [`CascadeParams`] is a flat parameter struct with sensible defaults;
//! construct with struct-update syntax and check with [`CascadeParams::validate`]:
//!
//! ```
//! use cascade_boost::{BoostType, CascadeParams};
//!
//! let params = CascadeParams {
//!     boost_type: BoostType::Gentle,
//!     min_tar: 0.995,
//!     max_far: 0.5,
//!     max_depth: 1,
//!     weak_count: 100,
//!     ..Default::default()
//! };
//! params.validate().unwrap();
//! ```
//!
//! The subset of parameters that travels with a trained stage is persisted
//! as a little-endian byte stream behind a magic/version header; see
//! [`CascadeParams::write_to`] and [`CascadeParams::read_from`].

use std::io::{Read, Write};

use crate::error::{ParamError, PersistError};

// ============================================================================
// BoostType
// ============================================================================

/// Reweighting rule used by the boosting loop.
///
/// The caller's choice is authoritative; `Gentle` is only the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum BoostType {
    /// Discrete AdaBoost: trees vote a class in {-1, +1}, scaled by the
    /// log-odds of the weighted error.
    Discrete = 0,
    /// Real AdaBoost: trees output half-log-odds of the positive class.
    Real = 1,
    /// LogitBoost: regression trees on Newton-step targets of the logistic
    /// loss.
    Logit = 2,
    /// Gentle AdaBoost: regression trees on the {-1, +1} responses.
    #[default]
    Gentle = 3,
}

impl BoostType {
    fn from_tag(tag: i32) -> Result<Self, PersistError> {
        match tag {
            0 => Ok(BoostType::Discrete),
            1 => Ok(BoostType::Real),
            2 => Ok(BoostType::Logit),
            3 => Ok(BoostType::Gentle),
            other => Err(PersistError::UnknownBoostType(other)),
        }
    }
}

// ============================================================================
// CascadeParams
// ============================================================================

/// Magic bytes of the parameter stream.
const PARAMS_MAGIC: [u8; 4] = *b"CSBP";

/// Current parameter stream version.
const PARAMS_VERSION: u16 = 1;

/// Parameters of one cascade-stage training run.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeParams {
    /// Reweighting rule.
    pub boost_type: BoostType,
    /// Target true-accept rate of the stage, in (0, 1).
    pub min_tar: f32,
    /// Maximum false-accept rate of the stage, in (0, 1).
    pub max_far: f32,
    /// Fraction of the weight mass kept active by trimming. Values outside
    /// (0, 1) disable trimming.
    pub weight_trim_rate: f64,
    /// Maximum tree depth.
    pub max_depth: u32,
    /// Maximum number of weak classifiers.
    pub weak_count: u32,
    /// Number of values of a categorical feature; 0 trains on ordered
    /// (threshold-split) features.
    pub max_cat_count: u32,
    /// Nodes at or below this sample count become leaves.
    pub min_sample_count: u32,
    /// Byte budget of the feature-response value cache, in MiB.
    pub precalc_val_mib: usize,
    /// Byte budget of the pre-sorted feature index cache, in MiB.
    pub precalc_idx_mib: usize,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            boost_type: BoostType::default(),
            min_tar: 0.995,
            max_far: 0.5,
            weight_trim_rate: 0.95,
            max_depth: 1,
            weak_count: 100,
            max_cat_count: 0,
            min_sample_count: 10,
            precalc_val_mib: 256,
            precalc_idx_mib: 256,
        }
    }
}

impl CascadeParams {
    /// Validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError`] if the TAR/FAR targets are not in (0, 1) or
    /// the tree/ensemble budgets are zero.
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.min_tar > 0.0 && self.min_tar < 1.0) {
            return Err(ParamError::InvalidMinTar(self.min_tar));
        }
        if !(self.max_far > 0.0 && self.max_far < 1.0) {
            return Err(ParamError::InvalidMaxFar(self.max_far));
        }
        if self.max_depth == 0 {
            return Err(ParamError::InvalidMaxDepth(self.max_depth));
        }
        if self.weak_count == 0 {
            return Err(ParamError::InvalidWeakCount(self.weak_count));
        }
        Ok(())
    }

    /// Number of 32-bit words in a categorical subset descriptor.
    pub(crate) fn subset_words(&self) -> usize {
        (self.max_cat_count as usize).div_ceil(32)
    }

    /// Write the persisted parameter subset as a little-endian byte stream.
    ///
    /// Field order: boost type, min TAR, max FAR, weight trim rate,
    /// max depth, weak count.
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<(), PersistError> {
        w.write_all(&PARAMS_MAGIC)?;
        w.write_all(&PARAMS_VERSION.to_le_bytes())?;
        w.write_all(&(self.boost_type as i32).to_le_bytes())?;
        w.write_all(&self.min_tar.to_le_bytes())?;
        w.write_all(&self.max_far.to_le_bytes())?;
        w.write_all(&self.weight_trim_rate.to_le_bytes())?;
        w.write_all(&(self.max_depth as i32).to_le_bytes())?;
        w.write_all(&(self.weak_count as i32).to_le_bytes())?;
        Ok(())
    }

    /// Read the persisted parameter subset back, updating `self` in place.
    /// Fields that do not travel with the stream (cache budgets, categorical
    /// bound, minimum sample count) are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] on short reads, bad magic bytes, an
    /// unsupported version or an unknown boost-type tag.
    pub fn read_from<R: Read>(&mut self, mut r: R) -> Result<(), PersistError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != PARAMS_MAGIC {
            return Err(PersistError::BadMagic {
                expected: PARAMS_MAGIC,
                got: magic,
            });
        }
        let version = u16::from_le_bytes(read_array(&mut r)?);
        if version != PARAMS_VERSION {
            return Err(PersistError::UnsupportedVersion(version));
        }
        self.boost_type = BoostType::from_tag(i32::from_le_bytes(read_array(&mut r)?))?;
        self.min_tar = f32::from_le_bytes(read_array(&mut r)?);
        self.max_far = f32::from_le_bytes(read_array(&mut r)?);
        self.weight_trim_rate = f64::from_le_bytes(read_array(&mut r)?);
        self.max_depth = i32::from_le_bytes(read_array(&mut r)?) as u32;
        self.weak_count = i32::from_le_bytes(read_array(&mut r)?) as u32;
        Ok(())
    }
}

fn read_array<const N: usize, R: Read>(r: &mut R) -> Result<[u8; N], PersistError> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

// ============================================================================
// Tests
// ============================================================================
