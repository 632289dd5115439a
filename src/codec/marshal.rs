use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;
use crate::core::error::{Error, Result};

/// The store's column types. Closed set, fixed when the schema is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Ascii,
    Utf8,
    Long,
    Int32,
    Varint,
    Counter,
    Boolean,
    Double,
    Float,
    Decimal,
    Bytes,
    Uuid,
    TimeUuid,
    Timestamp,
    Inet,
}

/// Shape of a key: a single typed value, or a composite of ordered typed components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyShape {
    Simple(ValueType),
    Composite(Vec<ValueType>),
}

impl KeyShape {
    pub fn component_type(&self, index: usize) -> Option<ValueType> {
        match self {
            KeyShape::Simple(t) if index == 0 => Some(*t),
            KeyShape::Simple(_) => None,
            KeyShape::Composite(types) => types.get(index).copied(),
        }
    }
}

/// A decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(String),
    Long(i64),
    Int(i32),
    Varint(i64),
    Boolean(bool),
    Double(f64),
    Float(f32),
    Decimal { unscaled: i128, scale: i32 },
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Inet(IpAddr),
}

impl ValueType {
    /// Decodes raw column bytes into a typed value.
    pub fn compose(&self, bytes: &[u8]) -> Result<TypedValue> {
        let value = match self {
            ValueType::Ascii => {
                if !bytes.is_ascii() {
                    return Err(Error::decode("non-ascii bytes in ascii value"));
                }
                TypedValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
            ValueType::Utf8 => TypedValue::Text(
                String::from_utf8(bytes.to_vec()).map_err(|e| Error::decode(format!("utf8 value: {}", e)))?,
            ),
            ValueType::Long | ValueType::Counter => TypedValue::Long(i64::from_be_bytes(fixed(bytes, "long")?)),
            ValueType::Int32 => TypedValue::Int(i32::from_be_bytes(fixed(bytes, "int")?)),
            ValueType::Varint => {
                let v = decode_varint(bytes)?;
                TypedValue::Varint(
                    i64::try_from(v).map_err(|_| Error::decode("varint does not fit in 64 bits"))?,
                )
            }
            ValueType::Boolean => {
                let [b] = fixed::<1>(bytes, "boolean")?;
                TypedValue::Boolean(b != 0)
            }
            ValueType::Double => TypedValue::Double(f64::from_be_bytes(fixed(bytes, "double")?)),
            ValueType::Float => TypedValue::Float(f32::from_be_bytes(fixed(bytes, "float")?)),
            ValueType::Decimal => {
                if bytes.len() < 5 {
                    return Err(Error::decode(format!("decimal needs at least 5 bytes, got {}", bytes.len())));
                }
                let scale = i32::from_be_bytes(fixed(&bytes[..4], "decimal scale")?);
                TypedValue::Decimal { unscaled: decode_varint(&bytes[4..])?, scale }
            }
            ValueType::Bytes => TypedValue::Bytes(bytes.to_vec()),
            ValueType::Uuid => TypedValue::Uuid(uuid(bytes)?),
            ValueType::TimeUuid => {
                let id = uuid(bytes)?;
                if id.get_version_num() != 1 {
                    return Err(Error::decode(format!("{} is not a time-based uuid", id)));
                }
                TypedValue::Uuid(id)
            }
            ValueType::Timestamp => {
                let millis = i64::from_be_bytes(fixed(bytes, "timestamp")?);
                TypedValue::Timestamp(
                    DateTime::from_timestamp_millis(millis)
                        .ok_or_else(|| Error::decode(format!("timestamp {} out of range", millis)))?,
                )
            }
            ValueType::Inet => match bytes.len() {
                4 => TypedValue::Inet(IpAddr::V4(Ipv4Addr::from(fixed::<4>(bytes, "inet")?))),
                16 => TypedValue::Inet(IpAddr::V6(Ipv6Addr::from(fixed::<16>(bytes, "inet")?))),
                n => return Err(Error::decode(format!("inet address of {} bytes", n))),
            },
        };
        Ok(value)
    }

    /// Encodes a typed value into the store's byte form. The value must match the type.
    pub fn decompose(&self, value: &TypedValue) -> Result<Vec<u8>> {
        let bytes = match (self, value) {
            (ValueType::Ascii, TypedValue::Text(s)) if s.is_ascii() => s.as_bytes().to_vec(),
            (ValueType::Utf8, TypedValue::Text(s)) => s.as_bytes().to_vec(),
            (ValueType::Long | ValueType::Counter, TypedValue::Long(v)) => v.to_be_bytes().to_vec(),
            (ValueType::Int32, TypedValue::Int(v)) => v.to_be_bytes().to_vec(),
            (ValueType::Varint, TypedValue::Varint(v)) => encode_varint(*v as i128),
            (ValueType::Boolean, TypedValue::Boolean(b)) => vec![*b as u8],
            (ValueType::Double, TypedValue::Double(v)) => v.to_be_bytes().to_vec(),
            (ValueType::Float, TypedValue::Float(v)) => v.to_be_bytes().to_vec(),
            (ValueType::Decimal, TypedValue::Decimal { unscaled, scale }) => {
                let mut out = scale.to_be_bytes().to_vec();
                out.extend(encode_varint(*unscaled));
                out
            }
            (ValueType::Bytes, TypedValue::Bytes(b)) => b.clone(),
            (ValueType::Uuid | ValueType::TimeUuid, TypedValue::Uuid(id)) => id.as_bytes().to_vec(),
            (ValueType::Timestamp, TypedValue::Timestamp(ts)) => ts.timestamp_millis().to_be_bytes().to_vec(),
            (ValueType::Inet, TypedValue::Inet(IpAddr::V4(ip))) => ip.octets().to_vec(),
            (ValueType::Inet, TypedValue::Inet(IpAddr::V6(ip))) => ip.octets().to_vec(),
            (t, v) => {
                return Err(Error::new(
                    crate::core::error::ErrorKind::InvalidArgument,
                    format!("{:?} cannot hold {:?}", t, v),
                ))
            }
        };
        Ok(bytes)
    }

    /// Canonical text form of raw bytes of this type.
    pub fn text(&self, bytes: &[u8]) -> Result<String> {
        Ok(self.compose(bytes)?.to_string())
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Text(s) => f.write_str(s),
            TypedValue::Long(v) | TypedValue::Varint(v) => write!(f, "{}", v),
            TypedValue::Int(v) => write!(f, "{}", v),
            TypedValue::Boolean(b) => write!(f, "{}", b),
            TypedValue::Double(v) => write!(f, "{}", v),
            TypedValue::Float(v) => write!(f, "{}", v),
            TypedValue::Decimal { unscaled, scale } => f.write_str(&format_decimal(*unscaled, *scale)),
            TypedValue::Bytes(b) => f.write_str(&hex::encode(b)),
            TypedValue::Uuid(id) => write!(f, "{}", id),
            TypedValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.3fZ")),
            TypedValue::Inet(ip) => write!(f, "{}", ip),
        }
    }
}

fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| Error::decode(format!("{} needs {} bytes, got {}", what, N, bytes.len())))
}

fn uuid(bytes: &[u8]) -> Result<Uuid> {
    Uuid::from_slice(bytes).map_err(|e| Error::decode(format!("uuid: {}", e)))
}

/// Big-endian two's complement, as written by the store's varint type.
fn decode_varint(bytes: &[u8]) -> Result<i128> {
    if bytes.is_empty() {
        return Err(Error::decode("empty varint"));
    }
    if bytes.len() > 16 {
        return Err(Error::decode(format!("varint of {} bytes is too wide", bytes.len())));
    }
    let fill = if bytes[0] & 0x80 != 0 { 0xff } else { 0x00 };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Ok(i128::from_be_bytes(buf))
}

fn encode_varint(value: i128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

fn format_decimal(unscaled: i128, scale: i32) -> String {
    if scale <= 0 {
        return format!("{}{}", unscaled, "0".repeat(scale.unsigned_abs() as usize));
    }
    let digits = unscaled.unsigned_abs().to_string();
    let scale = scale as usize;
    let body = if digits.len() <= scale {
        format!("0.{}{}", "0".repeat(scale - digits.len()), digits)
    } else {
        let (int, frac) = digits.split_at(digits.len() - scale);
        format!("{}.{}", int, frac)
    };
    if unscaled < 0 { format!("-{}", body) } else { body }
}
