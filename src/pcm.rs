/// Converts captured float samples to 16-bit little-endian PCM (LINEAR16)
///
/// This is the only transformation applied to audio on its way to the
/// recognizer: the stream start message declares LINEAR16, so every audio
/// frame on the wire has to match it.
pub fn f32_to_linear16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_two_bytes_per_sample() {
        let bytes = f32_to_linear16(&[0.0, 0.5, -0.5]);
        assert_eq!(bytes.len(), 6);
    }

    #[test]
    fn silence_is_zero() {
        assert_eq!(f32_to_linear16(&[0.0]), vec![0, 0]);
    }

    #[test]
    fn full_scale_maps_to_i16_extremes() {
        let bytes = f32_to_linear16(&[1.0, -1.0]);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), -i16::MAX);
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let bytes = f32_to_linear16(&[2.5, -3.0]);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), -i16::MAX);
    }

    #[test]
    fn output_is_little_endian() {
        let bytes = f32_to_linear16(&[0.5]);
        let expected = ((0.5 * i16::MAX as f32) as i16).to_le_bytes();
        assert_eq!(bytes, expected);
    }
}
