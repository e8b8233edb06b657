//! Payloads in the NumPy `.npy` format.
use super::{CodecConfig, NdArray};
use crate::{codec::Codec, error::TetherError};
use ndarray::ArrayD;
use ndarray_npy::{ReadNpyError, ReadNpyExt, ReadableElement, WriteNpyExt};

/// A [`Codec`] reading and writing `.npy` files, the payloads of `numpy.save`
/// and `numpy.load`.
///
/// Use it to exchange observations and actions with controllers written
/// against NumPy. Little and big endian payloads of `f32`, `f64`, `i32` and
/// `i64` are decoded, in C or Fortran order. Encoding writes little endian.
#[derive(Clone, Debug, Default)]
pub struct NpyCodec {
    config: CodecConfig,
}

impl NpyCodec {
    /// Constructs a codec.
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }
}

/// Reads `bytes` as an array of `A`, or `None` if they hold another element type.
fn read<A: ReadableElement>(bytes: &[u8]) -> Result<Option<ArrayD<A>>, TetherError> {
    match ArrayD::<A>::read_npy(bytes) {
        Ok(a) => Ok(Some(a)),
        Err(ReadNpyError::WrongDescriptor(_)) => Ok(None),
        Err(e) => Err(TetherError::MalformedPayload(e.to_string())),
    }
}

impl Codec for NpyCodec {
    fn encode(&self, array: &NdArray) -> Result<Vec<u8>, TetherError> {
        let mut bytes = vec![];
        let res = match array {
            NdArray::F32(a) => a.write_npy(&mut bytes),
            NdArray::F64(a) => a.write_npy(&mut bytes),
            NdArray::I32(a) => a.write_npy(&mut bytes),
            NdArray::I64(a) => a.write_npy(&mut bytes),
        };
        res.map_err(|e| TetherError::MalformedPayload(format!("failed to encode: {}", e)))?;
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<NdArray, TetherError> {
        if bytes.len() as u64 > self.config.max_payload_bytes {
            return Err(TetherError::MalformedPayload(format!(
                "payload of {} bytes exceeds the limit",
                bytes.len()
            )));
        }

        if let Some(a) = read::<f64>(bytes)? {
            return Ok(a.into());
        }
        if let Some(a) = read::<f32>(bytes)? {
            return Ok(a.into());
        }
        if let Some(a) = read::<i64>(bytes)? {
            return Ok(a.into());
        }
        if let Some(a) = read::<i32>(bytes)? {
            return Ok(a.into());
        }
        Err(TetherError::MalformedPayload(
            "unsupported npy element type".to_string(),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::DType;
    use ndarray::{arr1, arr2, IxDyn};

    // Written by `numpy.save(f, numpy.array([0.0, 0.5, -1.0, 2.0]))`.
    const OBS_F64: &[u8] = b"\x93NUMPY\x01\x00v\x00{'descr': '<f8', 'fortran_order': False, 'shape': (4,), }                                                            \x0a\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\xe0?\x00\x00\x00\x00\x00\x00\xf0\xbf\x00\x00\x00\x00\x00\x00\x00@";

    // `numpy.save(f, numpy.asfortranarray(numpy.array([[1, 2, 3], [4, 5, 6]], dtype=numpy.float32)))`
    const FORTRAN_F32: &[u8] = b"\x93NUMPY\x01\x00v\x00{'descr': '<f4', 'fortran_order': True, 'shape': (2, 3), }                                                           \x0a\x00\x00\x80?\x00\x00\x80@\x00\x00\x00@\x00\x00\xa0@\x00\x00@@\x00\x00\xc0@";

    // `numpy.save(f, numpy.int64(-7))`
    const SCALAR_I64: &[u8] = b"\x93NUMPY\x01\x00v\x00{'descr': '<i8', 'fortran_order': False, 'shape': (), }                                                              \x0a\xf9\xff\xff\xff\xff\xff\xff\xff";

    fn codec() -> NpyCodec {
        NpyCodec::default()
    }

    #[test]
    fn test_decode_numpy_files() {
        let obs = codec().decode(OBS_F64).unwrap();
        assert_eq!(obs, NdArray::F64(arr1(&[0.0, 0.5, -1.0, 2.0]).into_dyn()));

        let a = codec().decode(FORTRAN_F32).unwrap();
        assert_eq!(a.dtype(), DType::F32);
        assert_eq!(a, NdArray::F32(arr2(&[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]).into_dyn()));

        let s = codec().decode(SCALAR_I64).unwrap();
        assert_eq!(s, NdArray::I64(ArrayD::from_elem(IxDyn(&[]), -7i64)));
    }

    #[test]
    fn test_roundtrip_through_numpy_file() {
        let obs = codec().decode(OBS_F64).unwrap();
        let bytes = codec().encode(&obs).unwrap();
        assert_eq!(&bytes[..6], b"\x93NUMPY");
        assert_eq!(codec().decode(&bytes).unwrap(), obs);

        let a = NdArray::I32(ArrayD::from_shape_vec(IxDyn(&[2, 1, 2]), vec![1, -2, 3, i32::MIN]).unwrap());
        assert_eq!(codec().decode(&codec().encode(&a).unwrap()).unwrap(), a);
    }

    #[test]
    fn test_decode_rejects_broken_files() {
        assert!(matches!(
            codec().decode(b"not an npy file"),
            Err(TetherError::MalformedPayload(_))
        ));
        assert!(matches!(
            codec().decode(&OBS_F64[..OBS_F64.len() - 4]),
            Err(TetherError::MalformedPayload(_))
        ));

        // Unsupported element type, `<u2`.
        let mut u16_file = OBS_F64.to_vec();
        let at = u16_file.windows(3).position(|w| w == b"<f8").unwrap();
        u16_file[at..at + 3].copy_from_slice(b"<u2");
        assert!(matches!(
            codec().decode(&u16_file),
            Err(TetherError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_decode_respects_payload_limit() {
        let small = NpyCodec::new(CodecConfig::default().max_payload_bytes(64));
        assert!(matches!(
            small.decode(OBS_F64),
            Err(TetherError::MalformedPayload(_))
        ));
    }
}
