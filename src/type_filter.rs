use crate::config::LossParams;
use crate::frame_header::FrameHeader;

/// Loss masks are configured per direction, and each direction only ever consults its own mask
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LossDirection {
    Receive,
    Send,
}

impl LossDirection {
    pub fn mask(&self, params: &LossParams) -> u64 {
        match self {
            LossDirection::Receive => params.recv_msg_type_mask,
            LossDirection::Send => params.send_msg_type_mask,
        }
    }
}

/// `true` iff bit `frame_type` is set in `mask`. Frame types that do not fit into the mask
///  are never candidates.
pub fn is_loss_candidate(frame_type: u16, mask: u64) -> bool {
    mask.checked_shr(frame_type as u32)
        .map(|m| m & 1 != 0)
        .unwrap_or(false)
}

/// Returns the frame type if `frame` is a loss candidate for `mask`. Frames too short to have
///  a frame type are never candidates.
pub fn loss_candidate_type(frame: &[u8], mask: u64) -> Option<u16> {
    FrameHeader::frame_type_of(frame)
        .filter(|&t| is_loss_candidate(t, mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::data_selected(FrameHeader::TYPE_DATA, 1 << FrameHeader::TYPE_DATA, true)]
    #[case::setup_not_selected(FrameHeader::TYPE_SETUP, 1 << FrameHeader::TYPE_DATA, false)]
    #[case::empty_mask(FrameHeader::TYPE_DATA, 0, false)]
    #[case::all_selected(FrameHeader::TYPE_SETUP, u64::MAX, true)]
    #[case::pad(FrameHeader::TYPE_PAD, 1, true)]
    #[case::highest_bit(63, 1 << 63, true)]
    #[case::beyond_mask(64, u64::MAX, false)]
    #[case::ext(FrameHeader::TYPE_EXT, u64::MAX, false)]
    fn test_is_loss_candidate(#[case] frame_type: u16, #[case] mask: u64, #[case] expected: bool) {
        assert_eq!(is_loss_candidate(frame_type, mask), expected);
    }

    fn frame(frame_type: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        FrameHeader::new(frame_type, 12).ser(&mut buf);
        buf.extend_from_slice(&[1,2,3,4]);
        buf
    }

    #[rstest]
    #[case::candidate(frame(FrameHeader::TYPE_DATA), 0b10, Some(FrameHeader::TYPE_DATA))]
    #[case::not_candidate(frame(FrameHeader::TYPE_SM), 0b10, None)]
    #[case::truncated(frame(FrameHeader::TYPE_DATA)[..7].to_vec(), u64::MAX, None)]
    fn test_loss_candidate_type(#[case] frame: Vec<u8>, #[case] mask: u64, #[case] expected: Option<u16>) {
        assert_eq!(loss_candidate_type(&frame, mask), expected);
    }

    #[test]
    fn test_direction_mask() {
        let params = LossParams { rate: 1.0, recv_msg_type_mask: 0b10, send_msg_type_mask: 0xFFFFF, seed: 0 };
        assert_eq!(LossDirection::Receive.mask(&params), 0b10);
        assert_eq!(LossDirection::Send.mask(&params), 0xFFFFF);
    }
}
