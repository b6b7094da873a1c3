//! WAV file I/O via hound

use std::path::Path;

use anyhow::{Context, Result, bail};
use sage_core::{Sample, deinterleave, interleave};

/// Deinterleaved audio held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFile {
    pub sample_rate: u32,
    /// One buffer per channel, all the same length
    pub channels: Vec<Vec<Sample>>,
}

impl AudioFile {
    pub fn new(sample_rate: u32, channels: Vec<Vec<Sample>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration_s(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Load a WAV file, normalising integer formats to [-1, 1)
pub fn read_wav(path: &Path) -> Result<AudioFile> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let spec = reader.spec();
    let num_channels = spec.channels as usize;
    if num_channels == 0 {
        bail!("{} has no channels", path.display());
    }

    let samples: Vec<Sample> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| v as Sample))
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("failed to decode {}", path.display()))?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as Sample;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as Sample / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("failed to decode {}", path.display()))?
        }
    };

    let frames = samples.len() / num_channels;
    let mut channels = vec![vec![0.0; frames]; num_channels];
    deinterleave(&samples, &mut channels);

    log::debug!(
        "read {}: {} Hz, {} ch, {} frames ({:?} {} bit)",
        path.display(),
        spec.sample_rate,
        num_channels,
        frames,
        spec.sample_format,
        spec.bits_per_sample
    );

    Ok(AudioFile::new(spec.sample_rate, channels))
}

/// Write 32-bit float WAV
pub fn write_wav(path: &Path, audio: &AudioFile) -> Result<()> {
    let channels = u16::try_from(audio.channel_count())
        .context("too many channels for a WAV file")?;
    let spec = hound::WavSpec {
        channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut interleaved = vec![0.0; audio.frames() * audio.channel_count()];
    interleave(&audio.channels, &mut interleaved);

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for &sample in &interleaved {
        writer.write_sample(sample as f32)?;
    }
    writer
        .finalize()
        .with_context(|| format!("failed to finalize {}", path.display()))?;

    log::debug!("wrote {}: {} frames", path.display(), audio.frames());
    Ok(())
}
