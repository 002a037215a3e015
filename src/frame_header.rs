use bytes::{Buf, BufMut};

/// The common header at the start of every frame of the messaging protocol - all numbers are
///  little endian:
///
/// ```ascii
/// 0: frame length (i32)
/// 4: version (u8)
/// 5: flags (u8)
/// 6: frame type (u16)
/// ```
///
/// Loss injection only ever looks at the frame type, the other fields are here so that test code
///  can write realistic frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_length: i32,
    pub version: u8,
    pub flags: u8,
    pub frame_type: u16,
}

impl FrameHeader {
    pub const SERIALIZED_LEN: usize = 8;
    pub const FRAME_TYPE_OFFSET: usize = 6;

    pub const CURRENT_VERSION: u8 = 0;

    pub const TYPE_PAD: u16 = 0x00;
    pub const TYPE_DATA: u16 = 0x01;
    pub const TYPE_NAK: u16 = 0x02;
    pub const TYPE_SM: u16 = 0x03;
    pub const TYPE_ERR: u16 = 0x04;
    pub const TYPE_SETUP: u16 = 0x05;
    pub const TYPE_RTTM: u16 = 0x06;
    pub const TYPE_RES: u16 = 0x07;
    pub const TYPE_ATS_DATA: u16 = 0x08;
    pub const TYPE_ATS_SETUP: u16 = 0x09;
    pub const TYPE_ATS_SM: u16 = 0x0A;
    pub const TYPE_RSP_SETUP: u16 = 0x0B;
    pub const TYPE_EXT: u16 = 0xFFFF;

    pub fn new(frame_type: u16, frame_length: i32) -> FrameHeader {
        FrameHeader {
            frame_length,
            version: Self::CURRENT_VERSION,
            flags: 0,
            frame_type,
        }
    }

    pub fn ser(&self, buf: &mut impl BufMut) {
        buf.put_i32_le(self.frame_length);
        buf.put_u8(self.version);
        buf.put_u8(self.flags);
        buf.put_u16_le(self.frame_type);
    }

    pub fn deser(buf: &mut impl Buf) -> anyhow::Result<FrameHeader> {
        let frame_length = buf.try_get_i32_le()?;
        let version = buf.try_get_u8()?;
        let flags = buf.try_get_u8()?;
        let frame_type = buf.try_get_u16_le()?;
        Ok(FrameHeader {
            frame_length,
            version,
            flags,
            frame_type,
        })
    }

    /// Reads the frame type of a raw frame without parsing the rest of the header. Returns `None`
    ///  if the frame is too short to contain a complete header.
    pub fn frame_type_of(frame: &[u8]) -> Option<u16> {
        if frame.len() < Self::SERIALIZED_LEN {
            return None;
        }
        let mut type_buf = &frame[Self::FRAME_TYPE_OFFSET..];
        type_buf.try_get_u16_le().ok()
    }
}
