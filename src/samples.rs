/*
 *  samples.rs
 *
 *  vumeter - worth the squeeze
 *	(c) 2020-26 Stuart Hunter
 *
 *	Peak scan over interleaved S16_BE stereo capture buffers
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

/// Bytes per stereo frame: L hi, L lo, R hi, R lo.
pub const FRAME_BYTES: usize = 4;

/// Full scale for signed 16-bit samples.
pub const FULL_SCALE: f64 = 32768.0;

/// Metered channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    /// Byte offset of this channel's sample inside a frame.
    #[inline]
    fn offset(self) -> usize {
        match self {
            Channel::Left => 0,
            Channel::Right => 2,
        }
    }
}

impl TryFrom<usize> for Channel {
    type Error = usize;

    fn try_from(idx: usize) -> Result<Self, Self::Error> {
        match idx {
            0 => Ok(Channel::Left),
            1 => Ok(Channel::Right),
            other => Err(other),
        }
    }
}

/// Largest |sample| on `channel` normalised by 32768.
///
/// `buf` is interleaved big-endian signed 16-bit stereo. A trailing partial
/// frame is ignored. An empty buffer reads as silence.
pub fn peak_amplitude(buf: &[u8], channel: Channel) -> f64 {
    let off = channel.offset();
    let mut peak = 0i32;
    for frame in buf.chunks_exact(FRAME_BYTES) {
        let a = (i16::from_be_bytes([frame[off], frame[off + 1]]) as i32).abs();
        peak = peak.max(a);
    }
    peak as f64 / FULL_SCALE
}

/// Both channel peaks in one pass.
pub fn peak_amplitudes(buf: &[u8]) -> (f64, f64) {
    let mut peak_l = 0i32;
    let mut peak_r = 0i32;
    for frame in buf.chunks_exact(FRAME_BYTES) {
        let l = (i16::from_be_bytes([frame[0], frame[1]]) as i32).abs();
        let r = (i16::from_be_bytes([frame[2], frame[3]]) as i32).abs();
        peak_l = peak_l.max(l);
        peak_r = peak_r.max(r);
    }
    (peak_l as f64 / FULL_SCALE, peak_r as f64 / FULL_SCALE)
}

/// Pack one stereo frame as S16_BE.
#[inline]
pub fn encode_frame(left: i16, right: i16) -> [u8; FRAME_BYTES] {
    let [lh, ll] = left.to_be_bytes();
    let [rh, rl] = right.to_be_bytes();
    [lh, ll, rh, rl]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(frames: &[(i16, i16)]) -> Vec<u8> {
        frames.iter().flat_map(|&(l, r)| encode_frame(l, r)).collect()
    }

    #[test]
    fn test_planted_peaks_per_channel() {
        let buf = buffer(&[(100, -3), (-16384, 20), (5, 8192), (200, -700)]);
        assert_eq!(peak_amplitude(&buf, Channel::Left), 0.5);
        assert_eq!(peak_amplitude(&buf, Channel::Right), 0.25);
        assert_eq!(peak_amplitudes(&buf), (0.5, 0.25));
    }

    #[test]
    fn test_channels_are_independent() {
        let quiet_right = buffer(&[(1000, 0), (-12000, 0), (300, 0)]);
        let loud_right = buffer(&[(1000, 32767), (-12000, -32000), (300, 4)]);
        assert_eq!(
            peak_amplitude(&quiet_right, Channel::Left),
            peak_amplitude(&loud_right, Channel::Left)
        );
        assert_eq!(peak_amplitude(&quiet_right, Channel::Right), 0.0);
        assert_eq!(peak_amplitude(&loud_right, Channel::Right), 32767.0 / 32768.0);
    }

    #[test]
    fn test_big_endian_bytes() {
        // 0x01 0x02 = 258, 0xFF 0xFE = -2
        let buf = [0x01, 0x02, 0xFF, 0xFE];
        assert_eq!(peak_amplitude(&buf, Channel::Left), 258.0 / 32768.0);
        assert_eq!(peak_amplitude(&buf, Channel::Right), 2.0 / 32768.0);
    }

    #[test]
    fn test_most_negative_sample_is_full_scale() {
        let buf = buffer(&[(i16::MIN, i16::MIN)]);
        assert_eq!(peak_amplitude(&buf, Channel::Left), 1.0);
        assert_eq!(peak_amplitude(&buf, Channel::Right), 1.0);
    }

    #[test]
    fn test_empty_and_partial() {
        assert_eq!(peak_amplitude(&[], Channel::Left), 0.0);
        let mut buf = buffer(&[(10, 20)]);
        buf.extend_from_slice(&[0x7F, 0xFF]);
        assert_eq!(peak_amplitude(&buf, Channel::Left), 10.0 / 32768.0);
    }

    #[test]
    fn test_channel_index() {
        assert_eq!(Channel::try_from(0), Ok(Channel::Left));
        assert_eq!(Channel::try_from(1), Ok(Channel::Right));
        assert_eq!(Channel::try_from(2), Err(2));
    }
}
