use crate::defs::{ArgumentDefinition, BaseType};

/// A decoded argument value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArgumentValue {
    Uint8(u8),
    Int8(i8),
    Uint16(u16),
    Int16(i16),
    Uint32(u32),
    Int32(i32),
    Uint64(u64),
    Int64(i64),
    Float(f32),
}

impl ArgumentValue {
    /// Widened value used as an enum entry key. Signed values sign-extend.
    pub fn as_u64(self) -> u64 {
        match self {
            ArgumentValue::Uint8(v) => v as u64,
            ArgumentValue::Int8(v) => v as u64,
            ArgumentValue::Uint16(v) => v as u64,
            ArgumentValue::Int16(v) => v as u64,
            ArgumentValue::Uint32(v) => v as u64,
            ArgumentValue::Int32(v) => v as u64,
            ArgumentValue::Uint64(v) => v,
            ArgumentValue::Int64(v) => v as u64,
            ArgumentValue::Float(v) => v as u64,
        }
    }

    /// Plain decimal form. Floats honor `num_decimals` when set.
    pub(crate) fn render(self, num_decimals: Option<u8>) -> String {
        match self {
            ArgumentValue::Uint8(v) => v.to_string(),
            ArgumentValue::Int8(v) => v.to_string(),
            ArgumentValue::Uint16(v) => v.to_string(),
            ArgumentValue::Int16(v) => v.to_string(),
            ArgumentValue::Uint32(v) => v.to_string(),
            ArgumentValue::Int32(v) => v.to_string(),
            ArgumentValue::Uint64(v) => v.to_string(),
            ArgumentValue::Int64(v) => v.to_string(),
            ArgumentValue::Float(v) => match num_decimals {
                Some(d) => format!("{:.*}", d as usize, v),
                None => format!("{}", v),
            },
        }
    }
}

/// Read the `index`-th argument out of a raw argument buffer. Fields are
/// packed densely in declaration order, little-endian, no padding. Returns
/// `None` once a field would read past the end of the buffer.
pub fn read_argument(
    arguments: &[ArgumentDefinition],
    buf: &[u8],
    index: usize,
) -> Option<ArgumentValue> {
    let def = arguments.get(index)?;
    let offset: usize = arguments[..index]
        .iter()
        .map(|a| a.base_type().size())
        .sum();
    read_value(def.base_type(), buf, offset)
}

fn read_value(base: BaseType, buf: &[u8], offset: usize) -> Option<ArgumentValue> {
    let size = base.size();
    if size == 0 || offset + size > buf.len() {
        return None;
    }
    let b = &buf[offset..offset + size];
    let value = match base {
        BaseType::Invalid => return None,
        BaseType::Uint8 => ArgumentValue::Uint8(b[0]),
        BaseType::Int8 => ArgumentValue::Int8(b[0] as i8),
        BaseType::Uint16 => ArgumentValue::Uint16(u16::from_le_bytes(b.try_into().ok()?)),
        BaseType::Int16 => ArgumentValue::Int16(i16::from_le_bytes(b.try_into().ok()?)),
        BaseType::Uint32 => ArgumentValue::Uint32(u32::from_le_bytes(b.try_into().ok()?)),
        BaseType::Int32 => ArgumentValue::Int32(i32::from_le_bytes(b.try_into().ok()?)),
        BaseType::Uint64 => ArgumentValue::Uint64(u64::from_le_bytes(b.try_into().ok()?)),
        BaseType::Int64 => ArgumentValue::Int64(i64::from_le_bytes(b.try_into().ok()?)),
        BaseType::Float => ArgumentValue::Float(f32::from_le_bytes(b.try_into().ok()?)),
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::ArgumentKind;

    fn arg(base: BaseType) -> ArgumentDefinition {
        ArgumentDefinition {
            name: "a".into(),
            description: String::new(),
            kind: ArgumentKind::Base(base),
            num_decimals: None,
        }
    }

    #[test]
    fn little_endian_decode() {
        let args = [arg(BaseType::Uint16)];
        let mut buf = [0u8; 32];
        buf[0] = 0x34;
        buf[1] = 0x12;
        assert_eq!(
            read_argument(&args, &buf, 0),
            Some(ArgumentValue::Uint16(0x1234))
        );
    }

    #[test]
    fn dense_packing_without_alignment() {
        // u8 at offset 0, u32 directly behind it at offset 1
        let args = [arg(BaseType::Uint8), arg(BaseType::Uint32)];
        let mut buf = [0u8; 32];
        buf[0] = 9;
        buf[1..5].copy_from_slice(&0xdead_beefu32.to_le_bytes());
        assert_eq!(read_argument(&args, &buf, 0), Some(ArgumentValue::Uint8(9)));
        assert_eq!(
            read_argument(&args, &buf, 1),
            Some(ArgumentValue::Uint32(0xdead_beef))
        );
    }

    #[test]
    fn signed_and_float_decode() {
        let args = [arg(BaseType::Int16), arg(BaseType::Float)];
        let mut buf = [0u8; 32];
        buf[0..2].copy_from_slice(&(-123i16).to_le_bytes());
        buf[2..6].copy_from_slice(&3.5f32.to_le_bytes());
        assert_eq!(
            read_argument(&args, &buf, 0),
            Some(ArgumentValue::Int16(-123))
        );
        assert_eq!(
            read_argument(&args, &buf, 1),
            Some(ArgumentValue::Float(3.5))
        );
    }

    #[test]
    fn truncated_buffer_stops_decoding() {
        // five u64s: the fifth starts at offset 32 and does not fit
        let args = [
            arg(BaseType::Uint64),
            arg(BaseType::Uint64),
            arg(BaseType::Uint64),
            arg(BaseType::Uint64),
            arg(BaseType::Uint64),
        ];
        let buf = [0u8; 32];
        assert!(read_argument(&args, &buf, 3).is_some());
        assert_eq!(read_argument(&args, &buf, 4), None);
    }

    #[test]
    fn out_of_range_index() {
        let args = [arg(BaseType::Uint8)];
        let buf = [0u8; 32];
        assert_eq!(read_argument(&args, &buf, 1), None);
    }

    #[test]
    fn sign_extension_for_enum_keys() {
        assert_eq!(ArgumentValue::Int8(-1).as_u64(), u64::MAX);
        assert_eq!(ArgumentValue::Uint8(255).as_u64(), 255);
    }

    #[test]
    fn float_render_honors_decimals() {
        assert_eq!(ArgumentValue::Float(3.14159).render(Some(2)), "3.14");
        assert_eq!(ArgumentValue::Float(1.5).render(None), "1.5");
        assert_eq!(ArgumentValue::Int32(-7).render(None), "-7");
    }
}
