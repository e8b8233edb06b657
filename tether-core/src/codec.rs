//! Byte encoding of observations and actions.
//!
//! Two formats are supported, chosen by [`CodecConfig::format`].
//!
//! A [`PayloadFormat::Tnda`] payload is the 4-byte magic `TNDA`, a 1-byte
//! format version and the bincode serialization (fixed-width integers, little
//! endian) of an [`NdArray`]. The variant tag of [`NdArray`] names the element
//! type and ndarray's own serde representation carries the shape, so a payload
//! is self-describing.
//!
//! A [`PayloadFormat::Npy`] payload is a NumPy `.npy` file, see [`NpyCodec`].
use crate::error::TetherError;
use bincode::Options;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
mod npy;
pub use npy::NpyCodec;

const MAGIC: &[u8; 4] = b"TNDA";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 5;

/// Element type of an [`NdArray`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DType {
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::I32 => "i32",
            DType::I64 => "i64",
        };
        f.write_str(s)
    }
}

/// A dynamically shaped numeric array with one of the supported element types.
///
/// Both observations and actions travel over the channel in this form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NdArray {
    /// Array of `f32`.
    F32(ArrayD<f32>),
    /// Array of `f64`.
    F64(ArrayD<f64>),
    /// Array of `i32`.
    I32(ArrayD<i32>),
    /// Array of `i64`.
    I64(ArrayD<i64>),
}

impl NdArray {
    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        match self {
            NdArray::F32(_) => DType::F32,
            NdArray::F64(_) => DType::F64,
            NdArray::I32(_) => DType::I32,
            NdArray::I64(_) => DType::I64,
        }
    }

    /// Returns the shape.
    pub fn shape(&self) -> &[usize] {
        match self {
            NdArray::F32(a) => a.shape(),
            NdArray::F64(a) => a.shape(),
            NdArray::I32(a) => a.shape(),
            NdArray::I64(a) => a.shape(),
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens the array into `f32` values in logical order.
    ///
    /// The conversion may lose precision, it is meant for records and logs.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            NdArray::F32(a) => a.iter().copied().collect(),
            NdArray::F64(a) => a.iter().map(|v| *v as f32).collect(),
            NdArray::I32(a) => a.iter().map(|v| *v as f32).collect(),
            NdArray::I64(a) => a.iter().map(|v| *v as f32).collect(),
        }
    }

    /// Flattens the array into `f64` values in logical order.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            NdArray::F32(a) => a.iter().map(|v| *v as f64).collect(),
            NdArray::F64(a) => a.iter().copied().collect(),
            NdArray::I32(a) => a.iter().map(|v| *v as f64).collect(),
            NdArray::I64(a) => a.iter().map(|v| *v as f64).collect(),
        }
    }

    /// Checks the array against an expected element type and shape.
    ///
    /// Returns [`TetherError::InvalidAction`] on mismatch. [`Act`](crate::Act)
    /// implementations use this to reject actions from the remote controller.
    pub fn expect(&self, dtype: DType, shape: &[usize]) -> Result<(), TetherError> {
        if self.dtype() != dtype || self.shape() != shape {
            return Err(TetherError::InvalidAction(format!(
                "expected {}{:?}, got {}{:?}",
                dtype,
                shape,
                self.dtype(),
                self.shape()
            )));
        }
        Ok(())
    }
}

impl From<ArrayD<f32>> for NdArray {
    fn from(a: ArrayD<f32>) -> Self {
        NdArray::F32(a)
    }
}

impl From<ArrayD<f64>> for NdArray {
    fn from(a: ArrayD<f64>) -> Self {
        NdArray::F64(a)
    }
}

impl From<ArrayD<i32>> for NdArray {
    fn from(a: ArrayD<i32>) -> Self {
        NdArray::I32(a)
    }
}

impl From<ArrayD<i64>> for NdArray {
    fn from(a: ArrayD<i64>) -> Self {
        NdArray::I64(a)
    }
}

/// Byte format of payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadFormat {
    /// [`NdArrayCodec`].
    Tnda,

    /// [`NpyCodec`], compatible with `numpy.save` and `numpy.load`.
    Npy,
}

impl Default for PayloadFormat {
    fn default() -> Self {
        PayloadFormat::Tnda
    }
}

/// Configuration of codecs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Upper bound of the size of a decoded payload in bytes.
    pub max_payload_bytes: u64,

    /// Byte format of payloads.
    pub format: PayloadFormat,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 64 * 1024 * 1024,
            format: PayloadFormat::default(),
        }
    }
}

impl CodecConfig {
    /// Sets the upper bound of the payload size.
    pub fn max_payload_bytes(mut self, v: u64) -> Self {
        self.max_payload_bytes = v;
        self
    }

    /// Sets the byte format.
    pub fn format(mut self, v: PayloadFormat) -> Self {
        self.format = v;
        self
    }

    /// Builds the codec of the configured format.
    pub fn build(&self) -> Arc<dyn Codec> {
        match self.format {
            PayloadFormat::Tnda => Arc::new(NdArrayCodec::new(self.clone())),
            PayloadFormat::Npy => Arc::new(NpyCodec::new(self.clone())),
        }
    }
}

/// Converts arrays to byte payloads and back.
///
/// Implementations must be pure: `decode(encode(a)) == a` for every array.
pub trait Codec: Send + Sync {
    /// Encodes an array.
    fn encode(&self, array: &NdArray) -> Result<Vec<u8>, TetherError>;

    /// Decodes a payload, failing with [`TetherError::MalformedPayload`].
    fn decode(&self, bytes: &[u8]) -> Result<NdArray, TetherError>;
}

/// The default [`Codec`], writing `TNDA` payloads.
#[derive(Clone, Debug, Default)]
pub struct NdArrayCodec {
    config: CodecConfig,
}

impl NdArrayCodec {
    /// Constructs a codec.
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }
}

impl Codec for NdArrayCodec {
    fn encode(&self, array: &NdArray) -> Result<Vec<u8>, TetherError> {
        let body = bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .serialize(array)
            .map_err(|e| TetherError::MalformedPayload(format!("failed to encode: {}", e)))?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(MAGIC);
        bytes.push(VERSION);
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<NdArray, TetherError> {
        if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
            return Err(TetherError::MalformedPayload(
                "missing array header".to_string(),
            ));
        }
        if bytes[4] != VERSION {
            return Err(TetherError::MalformedPayload(format!(
                "unsupported format version {}",
                bytes[4]
            )));
        }

        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_limit(self.config.max_payload_bytes)
            .reject_trailing_bytes()
            .deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| TetherError::MalformedPayload(e.to_string()))
    }
}
