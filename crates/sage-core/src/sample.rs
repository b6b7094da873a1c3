//! Sample types and block helpers

/// Type alias for audio samples (always f64 for maximum precision)
pub type Sample = f64;

/// Split an interleaved buffer into per-channel buffers.
///
/// `output` must hold one buffer per channel, each at least
/// `interleaved.len() / output.len()` samples long.
pub fn deinterleave(interleaved: &[Sample], output: &mut [Vec<Sample>]) {
    let channels = output.len();
    if channels == 0 {
        return;
    }
    let frames = interleaved.len() / channels;
    for (ch, buffer) in output.iter_mut().enumerate() {
        for (frame, slot) in buffer.iter_mut().take(frames).enumerate() {
            *slot = interleaved[frame * channels + ch];
        }
    }
}

/// Interleave per-channel buffers into `output`
pub fn interleave<C: AsRef<[Sample]>>(channels: &[C], output: &mut [Sample]) {
    let count = channels.len();
    if count == 0 {
        return;
    }
    let frames = output.len() / count;
    for (ch, buffer) in channels.iter().enumerate() {
        for (frame, &s) in buffer.as_ref().iter().take(frames).enumerate() {
            output[frame * count + ch] = s;
        }
    }
}

/// Largest absolute sample value in a block
#[inline]
pub fn sample_peak(block: &[Sample]) -> Sample {
    block.iter().fold(0.0, |peak, &s| peak.max(s.abs()))
}

/// Mean of the squared samples in a block (0.0 for an empty block)
#[inline]
pub fn mean_square(block: &[Sample]) -> f64 {
    if block.is_empty() {
        return 0.0;
    }
    block.iter().map(|&s| s * s).sum::<f64>() / block.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_roundtrip() {
        let interleaved = [1.0, -1.0, 2.0, -2.0, 3.0, -3.0];
        let mut split = vec![vec![0.0; 3]; 2];
        deinterleave(&interleaved, &mut split);
        assert_eq!(split[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(split[1], vec![-1.0, -2.0, -3.0]);

        let mut joined = [0.0; 6];
        interleave(&split, &mut joined);
        assert_eq!(joined, interleaved);
    }

    #[test]
    fn test_peak_and_mean_square() {
        let block = [0.5, -0.8, 0.1];
        assert_eq!(sample_peak(&block), 0.8);
        assert!((mean_square(&[1.0, -1.0]) - 1.0).abs() < 1e-12);
        assert_eq!(mean_square(&[]), 0.0);
    }
}
