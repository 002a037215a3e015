use std::str::FromStr;
use anyhow::{anyhow, bail, Context};

/// Parameters for simulated message loss. They are immutable once a lossy transport is
///  initialized with them - changing them requires re-initialization, which starts a fresh
///  random sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct LossParams {
    /// The probability for a loss candidate to be dropped, in `[0.0, 1.0]`. `0.0` drops nothing,
    ///  `1.0` drops every candidate.
    pub rate: f64,

    /// Bit `t` set means that received frames of type `t` are loss candidates, see
    ///  [crate::frame_header::FrameHeader] for the frame types. Types >= 64 can not be selected.
    pub recv_msg_type_mask: u64,

    /// Same as `recv_msg_type_mask`, but for sent frames
    pub send_msg_type_mask: u64,

    /// The only source of randomness - a given seed always produces the same sequence of drop
    ///  decisions
    pub seed: u64,
}

impl LossParams {
    pub const KEY_RATE: &'static str = "rate";
    pub const KEY_RECV_MSG_MASK: &'static str = "recv-msg-mask";
    pub const KEY_SEND_MSG_MASK: &'static str = "send-msg-mask";
    pub const KEY_SEED: &'static str = "seed";

    pub fn new(rate: f64, recv_msg_type_mask: u64, send_msg_type_mask: u64, seed: u64) -> anyhow::Result<LossParams> {
        let result = LossParams {
            rate,
            recv_msg_type_mask,
            send_msg_type_mask,
            seed,
        };
        result.validate()?;
        Ok(result)
    }

    /// mask selecting exactly the given frame types
    pub fn mask_for(frame_types: &[u16]) -> u64 {
        frame_types.iter()
            .filter(|&&t| t < u64::BITS as u16)
            .fold(0, |mask, &t| mask | (1 << t))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.rate) {
            bail!("loss rate must be in [0.0, 1.0], was {}", self.rate);
        }
        Ok(())
    }
}

impl Default for LossParams {
    fn default() -> Self {
        LossParams {
            rate: 0.0,
            recv_msg_type_mask: 0,
            send_msg_type_mask: 0,
            seed: 0,
        }
    }
}

/// Parses loss args of the form `rate=0.2|recv-msg-mask=0x2|send-msg-mask=0|seed=10`. Keys may be
///  omitted and default to zero. Masks may be hex (with `0x` prefix) or decimal.
impl FromStr for LossParams {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut result = LossParams::default();

        for part in s.split('|').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=')
                .ok_or_else(|| anyhow!("loss arg '{}' is not of the form key=value", part))?;
            let (key, value) = (key.trim(), value.trim());

            match key {
                Self::KEY_RATE => result.rate = value.parse()
                    .with_context(|| format!("invalid loss rate '{}'", value))?,
                Self::KEY_RECV_MSG_MASK => result.recv_msg_type_mask = parse_mask(value)?,
                Self::KEY_SEND_MSG_MASK => result.send_msg_type_mask = parse_mask(value)?,
                Self::KEY_SEED => result.seed = value.parse()
                    .with_context(|| format!("invalid loss seed '{}'", value))?,
                _ => bail!("unknown loss arg '{}'", key),
            }
        }

        result.validate()?;
        Ok(result)
    }
}

fn parse_mask(value: &str) -> anyhow::Result<u64> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.with_context(|| format!("invalid message type mask '{}'", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use crate::frame_header::FrameHeader;

    #[rstest]
    #[case::zero(0.0)]
    #[case::half(0.5)]
    #[case::one(1.0)]
    fn test_new_valid(#[case] rate: f64) {
        let params = LossParams::new(rate, 2, 3, 4).unwrap();
        assert_eq!(params, LossParams { rate, recv_msg_type_mask: 2, send_msg_type_mask: 3, seed: 4 });
    }

    #[rstest]
    #[case::negative(-0.1)]
    #[case::above_one(1.01)]
    #[case::nan(f64::NAN)]
    #[case::infinite(f64::INFINITY)]
    fn test_new_invalid(#[case] rate: f64) {
        assert!(LossParams::new(rate, 0, 0, 0).is_err());
    }

    #[rstest]
    #[case::none(vec![], 0)]
    #[case::data(vec![FrameHeader::TYPE_DATA], 0b10)]
    #[case::data_setup(vec![FrameHeader::TYPE_DATA, FrameHeader::TYPE_SETUP], 0b100010)]
    #[case::ignores_ext(vec![FrameHeader::TYPE_PAD, FrameHeader::TYPE_EXT], 0b1)]
    #[case::highest(vec![63], 1 << 63)]
    fn test_mask_for(#[case] frame_types: Vec<u16>, #[case] expected: u64) {
        assert_eq!(LossParams::mask_for(&frame_types), expected);
    }

    #[rstest]
    #[case::empty("", LossParams::default())]
    #[case::full("rate=0.25|recv-msg-mask=0x2|send-msg-mask=34|seed=23764", LossParams { rate: 0.25, recv_msg_type_mask: 2, send_msg_type_mask: 34, seed: 23764 })]
    #[case::partial("rate=1|recv-msg-mask=0XFF", LossParams { rate: 1.0, recv_msg_type_mask: 0xff, ..LossParams::default() })]
    #[case::whitespace(" seed = 7 | rate = 0.5 |", LossParams { rate: 0.5, seed: 7, ..LossParams::default() })]
    fn test_parse(#[case] s: &str, #[case] expected: LossParams) {
        assert_eq!(s.parse::<LossParams>().unwrap(), expected);
    }

    #[rstest]
    #[case::no_value("rate")]
    #[case::unknown_key("rate=0.5|loss=1")]
    #[case::bad_rate("rate=half")]
    #[case::rate_out_of_range("rate=2.0")]
    #[case::bad_hex_mask("recv-msg-mask=0xZZ")]
    #[case::negative_mask("send-msg-mask=-1")]
    #[case::bad_seed("seed=abc")]
    fn test_parse_invalid(#[case] s: &str) {
        assert!(s.parse::<LossParams>().is_err());
    }
}
