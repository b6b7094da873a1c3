//! Offline EQ + dynamics rendering

use std::path::Path;

use anyhow::{Context, Result};
use sage_core::{Sample, SageResult};
use sage_dsp::biquad::{Biquad, FilterSpec};
use sage_dsp::dynamics::{DynamicsProcessor, DynamicsSettings};
use sage_dsp::presets::{DynamicsPreset, EqPreset};
use sage_dsp::{MonoProcessor, Processor};
use serde::{Deserialize, Serialize};

use crate::wav::AudioFile;

/// Processing chain description loaded from JSON
///
/// ```json
/// {
///   "eq": [{ "kind": "Highpass", "frequency": 80.0 }],
///   "dynamics": { "type": "compressor", "params": { "threshold_db": -18.0, "ratio": 3.0 } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// EQ bands applied in order before dynamics
    #[serde(default)]
    pub eq: Vec<FilterSpec>,
    pub dynamics: DynamicsSettings,
}

impl ProcessConfig {
    pub fn from_preset(preset: DynamicsPreset) -> Self {
        Self {
            eq: Vec::new(),
            dynamics: preset.settings(),
        }
    }

    pub fn with_eq(mut self, preset: EqPreset) -> Self {
        self.eq.push(preset.filter());
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid process config")?;
        config.dynamics.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in {}", path.display()))
    }
}

/// One channel's filters followed by its dynamics processor
#[derive(Debug, Clone)]
struct ChannelChain {
    eq: Vec<Biquad>,
    dynamics: DynamicsProcessor,
}

impl ChannelChain {
    fn process_block(&mut self, block: &mut [Sample]) {
        for filter in &mut self.eq {
            filter.process_block(block);
        }
        self.dynamics.process_block(block);
    }
}

/// Independent per-channel chains built from one `ProcessConfig`
#[derive(Debug, Clone)]
pub struct ProcessingChain {
    channels: Vec<ChannelChain>,
    max_gain_reduction_db: f64,
}

impl ProcessingChain {
    pub fn new(config: &ProcessConfig, sample_rate: f64, channels: usize) -> SageResult<Self> {
        let template = ChannelChain {
            eq: config
                .eq
                .iter()
                .map(|&spec| Biquad::with_spec(spec, sample_rate))
                .collect::<SageResult<_>>()?,
            dynamics: config.dynamics.build(sample_rate)?,
        };
        Ok(Self {
            channels: vec![template; channels],
            max_gain_reduction_db: 0.0,
        })
    }

    /// Delay introduced by the dynamics stage (limiter lookahead)
    pub fn latency(&self) -> usize {
        self.channels.first().map_or(0, |c| c.dynamics.latency())
    }

    /// Process one block per channel in place
    pub fn process<C: AsMut<[Sample]>>(&mut self, channels: &mut [C]) {
        for (chain, block) in self.channels.iter_mut().zip(channels.iter_mut()) {
            chain.process_block(block.as_mut());
            self.max_gain_reduction_db = self
                .max_gain_reduction_db
                .max(chain.dynamics.gain_reduction_db());
        }
    }

    /// Largest gain reduction seen at a block boundary
    pub fn max_gain_reduction_db(&self) -> f64 {
        self.max_gain_reduction_db
    }

    pub fn reset(&mut self) {
        for chain in &mut self.channels {
            for filter in &mut chain.eq {
                filter.reset();
            }
            chain.dynamics.reset();
        }
        self.max_gain_reduction_db = 0.0;
    }
}

/// What `render` did to a file
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProcessSummary {
    pub frames: usize,
    /// Latency removed from the output (frames)
    pub latency: usize,
    pub max_gain_reduction_db: f64,
}

/// Render `audio` through the chain, compensating its latency so the
/// output lines up with the input sample for sample
pub fn render(
    audio: &AudioFile,
    config: &ProcessConfig,
    block_size: usize,
) -> SageResult<(AudioFile, ProcessSummary)> {
    let mut chain =
        ProcessingChain::new(config, audio.sample_rate as f64, audio.channel_count())?;
    let latency = chain.latency();
    let frames = audio.frames();
    let block_size = block_size.max(1);

    let mut buffers: Vec<Vec<Sample>> = audio
        .channels
        .iter()
        .map(|c| {
            let mut padded = Vec::with_capacity(frames + latency);
            padded.extend_from_slice(c);
            padded.resize(frames + latency, 0.0);
            padded
        })
        .collect();

    let total = frames + latency;
    let mut start = 0;
    while start < total {
        let end = (start + block_size).min(total);
        let mut blocks: Vec<&mut [Sample]> =
            buffers.iter_mut().map(|b| &mut b[start..end]).collect();
        chain.process(&mut blocks);
        start = end;
    }

    for buffer in &mut buffers {
        buffer.drain(..latency);
    }

    let summary = ProcessSummary {
        frames,
        latency,
        max_gain_reduction_db: chain.max_gain_reduction_db(),
    };
    log::debug!(
        "rendered {frames} frames, latency {latency}, max GR {:.1} dB",
        summary.max_gain_reduction_db
    );

    Ok((AudioFile::new(audio.sample_rate, buffers), summary))
}
