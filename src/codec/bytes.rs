//! Composite key codec.
//!
//! A composite value is a sequence of components, each written as a big-endian
//! `u16` length, the component bytes and one end-of-component byte.

use crate::codec::marshal::KeyShape;
use crate::core::error::{Error, ErrorKind, Result};

const END_OF_COMPONENT: u8 = 0x00;

/// Splits `bytes` into the components declared by `shape`. A simple shape yields the
/// input unchanged as its only component.
pub fn split(bytes: &[u8], shape: &KeyShape) -> Result<Vec<Vec<u8>>> {
    match shape {
        KeyShape::Simple(_) => Ok(vec![bytes.to_vec()]),
        KeyShape::Composite(types) => {
            let components = split_composite(bytes)?;
            if components.len() > types.len() {
                return Err(Error::decode(format!(
                    "composite has {} components, shape declares {}",
                    components.len(),
                    types.len()
                )));
            }
            Ok(components)
        }
    }
}

fn split_composite(bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut components = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let header = bytes
            .get(pos..pos + 2)
            .ok_or_else(|| Error::decode(format!("truncated component length at byte {}", pos)))?;
        let len = u16::from_be_bytes([header[0], header[1]]) as usize;
        pos += 2;

        let component = bytes
            .get(pos..pos + len)
            .ok_or_else(|| Error::decode(format!("component of {} bytes overruns input at byte {}", len, pos)))?;
        pos += len;

        if pos >= bytes.len() {
            return Err(Error::decode("missing end-of-component byte"));
        }
        pos += 1;

        components.push(component.to_vec());
    }

    Ok(components)
}

/// Joins components into a composite value. Inverse of [`split`] for composite shapes.
/// A component longer than the `u16` length prefix can express is rejected.
pub fn build<C: AsRef<[u8]>>(components: &[C]) -> Result<Vec<u8>> {
    let size = components.iter().map(|c| c.as_ref().len() + 3).sum();
    let mut out = Vec::with_capacity(size);
    for (position, component) in components.iter().enumerate() {
        let component = component.as_ref();
        let len = u16::try_from(component.len()).map_err(|_| {
            Error::new(
                ErrorKind::InvalidArgument,
                format!("component {} is {} bytes, at most {} fit", position, component.len(), u16::MAX),
            )
        })?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(component);
        out.push(END_OF_COMPONENT);
    }
    Ok(out)
}

/// Renders `bytes` through each component type's text form, joined by `:`.
pub fn to_text(bytes: &[u8], shape: &KeyShape) -> Result<String> {
    match shape {
        KeyShape::Simple(t) => t.text(bytes),
        KeyShape::Composite(types) => {
            let components = split(bytes, shape)?;
            let mut parts = Vec::with_capacity(components.len());
            for (component, t) in components.iter().zip(types) {
                parts.push(t.text(component)?);
            }
            Ok(parts.join(":"))
        }
    }
}

pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

pub fn from_hex(text: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::marshal::ValueType;
    use proptest::prelude::*;

    fn shape() -> KeyShape {
        KeyShape::Composite(vec![ValueType::Utf8, ValueType::Int32, ValueType::Utf8])
    }

    #[test]
    fn build_then_split_keeps_components() {
        let components = vec![b"alice".to_vec(), 7i32.to_be_bytes().to_vec(), b"email".to_vec()];
        let encoded = build(&components).unwrap();
        assert_eq!(encoded[0..2], [0, 5]);
        assert_eq!(split(&encoded, &shape()).unwrap(), components);
        assert_eq!(to_text(&encoded, &shape()).unwrap(), "alice:7:email");
    }

    #[test]
    fn simple_shape_is_identity() {
        let key = b"plain".to_vec();
        assert_eq!(split(&key, &KeyShape::Simple(ValueType::Utf8)).unwrap(), vec![key.clone()]);
        assert_eq!(to_text(&key, &KeyShape::Simple(ValueType::Utf8)).unwrap(), "plain");
    }

    #[test]
    fn empty_trailing_component_survives() {
        let encoded = build(&[b"a".as_slice(), b"".as_slice()]).unwrap();
        let components = split(&encoded, &shape()).unwrap();
        assert_eq!(components, vec![b"a".to_vec(), Vec::new()]);
    }

    #[test]
    fn malformed_input_is_decode_error() {
        let encoded = build(&[b"abc".as_slice()]).unwrap();
        // drop the end-of-component byte
        let err = split(&encoded[..encoded.len() - 1], &shape()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
        // length overruns the input
        let err = split(&[0, 9, b'x', 0], &shape()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
        // single dangling length byte
        assert_eq!(split(&[0], &shape()).unwrap_err().kind, ErrorKind::Decode);
    }

    #[test]
    fn too_many_components_is_decode_error() {
        let encoded = build(&[b"a".as_slice(), b"b".as_slice(), b"c".as_slice(), b"d".as_slice()]).unwrap();
        assert_eq!(split(&encoded, &shape()).unwrap_err().kind, ErrorKind::Decode);
    }

    #[test]
    fn oversized_component_is_rejected() {
        let big = vec![7u8; u16::MAX as usize + 1];
        let err = build(&[b"a".as_slice(), big.as_slice()]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);

        let widest = vec![7u8; u16::MAX as usize];
        let encoded = build(&[widest.as_slice()]).unwrap();
        assert_eq!(encoded[0..2], [0xff, 0xff]);
        assert_eq!(split(&encoded, &shape()).unwrap(), vec![widest]);
    }

    #[test]
    fn bad_hex_is_decode_error() {
        assert_eq!(from_hex("zz").unwrap_err().kind, ErrorKind::Decode);
        assert_eq!(from_hex("abc").unwrap_err().kind, ErrorKind::Decode);
    }

    proptest! {
        #[test]
        fn hex_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(from_hex(&to_hex(&bytes)).unwrap(), bytes);
        }

        #[test]
        fn composite_round_trip(components in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 0..64), 0..=3)
        ) {
            let encoded = build(&components).unwrap();
            let first = split(&encoded, &shape()).unwrap();
            let again = split(&build(&first).unwrap(), &shape()).unwrap();
            prop_assert_eq!(&first, &components);
            prop_assert_eq!(again, first);
        }
    }
}
