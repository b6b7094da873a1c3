//! Whole-file loudness analysis and report formatting

use std::fmt;

use anyhow::{Context, Result, anyhow};
use sage_core::{ChannelLayout, Sample};
use sage_dsp::presets::{Assessment, LoudnessTarget};
use sage_dsp::loudness::LoudnessReport;
use sage_dsp::{LoudnessMeter, LoudnessMeterConfig};
use serde::Serialize;

use crate::wav::AudioFile;

/// Measurement of one file, optionally checked against a target
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub source: String,
    pub sample_rate: u32,
    pub channels: usize,
    pub layout: ChannelLayout,
    pub loudness: LoudnessReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<Assessment>,
}

impl AnalysisReport {
    pub fn new(source: impl Into<String>, audio: &AudioFile, block_size: usize) -> Result<Self> {
        let layout = layout_for(audio.channel_count())?;
        let loudness = analyze(audio, layout, block_size)?;
        Ok(Self {
            source: source.into(),
            sample_rate: audio.sample_rate,
            channels: audio.channel_count(),
            layout,
            loudness,
            assessment: None,
        })
    }

    pub fn with_target(mut self, target: LoudnessTarget) -> Self {
        self.assessment = Some(target.assess(&self.loudness));
        self
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize report")
    }
}

/// Channel layout implied by a file's channel count
pub fn layout_for(channels: usize) -> Result<ChannelLayout> {
    ChannelLayout::from_channel_count(channels)
        .ok_or_else(|| anyhow!("unsupported channel count {channels} (expected 1, 2 or 6)"))
}

/// Run the whole file through a meter in `block_size` chunks
pub fn analyze(
    audio: &AudioFile,
    layout: ChannelLayout,
    block_size: usize,
) -> Result<LoudnessReport> {
    let config = LoudnessMeterConfig::new(audio.sample_rate as f64, layout);
    let mut meter = LoudnessMeter::new(config).context("invalid meter configuration")?;
    meter.reserve_seconds(audio.duration_s());

    let block_size = block_size.max(1);
    let frames = audio.frames();
    let mut start = 0;
    while start < frames {
        let end = (start + block_size).min(frames);
        let block: Vec<&[Sample]> = audio.channels.iter().map(|c| &c[start..end]).collect();
        meter.process_checked(&block)?;
        start = end;
    }

    log::debug!(
        "analyzed {} frames in {} hops",
        frames,
        meter.accumulator().hops()
    );
    Ok(meter.report())
}

fn fmt_lu(value: Option<f64>) -> String {
    value.map_or_else(|| "--".to_string(), |v| format!("{v:.1} LU"))
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.loudness;
        writeln!(f, "File:            {}", self.source)?;
        writeln!(
            f,
            "Format:          {} Hz, {} ch ({:?}), {:.2} s",
            self.sample_rate, self.channels, self.layout, r.duration_s
        )?;
        writeln!(f, "Integrated:      {}", r.integrated)?;
        writeln!(f, "Loudness range:  {}", fmt_lu(r.loudness_range))?;
        writeln!(f, "Max momentary:   {}", r.max_momentary)?;
        writeln!(f, "Max short-term:  {}", r.max_short_term)?;
        match r.true_peak_dbtp {
            Some(tp) => writeln!(f, "True peak:       {tp:.1} dBTP")?,
            None => writeln!(f, "True peak:       --")?,
        }
        write!(f, "Sample peak:     {:.1} dBFS", r.sample_peak_db)?;

        if let Some(a) = &self.assessment {
            writeln!(f)?;
            write!(
                f,
                "Target:          {} ({:.0} LUFS, {:.1} dBTP): {}",
                a.target,
                a.target.target_lufs(),
                a.target.true_peak_ceiling_dbtp(),
                a.compliance
            )?;
            if let (Some(gain), Some(peak)) = (a.gain_needed_db, a.true_peak_after_gain_dbtp) {
                writeln!(f)?;
                write!(f, "Gain to target:  {gain:+.1} dB (true peak after gain {peak:.1} dBTP)")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_dsp::LoudnessReading;
    use sage_dsp::presets::Compliance;

    fn sine(sample_rate: u32, seconds: f64, amplitude: f64) -> Vec<Sample> {
        let n = (sample_rate as f64 * seconds) as usize;
        let step = 2.0 * std::f64::consts::PI * 1000.0 / sample_rate as f64;
        (0..n).map(|i| amplitude * (step * i as f64).sin()).collect()
    }

    #[test]
    fn test_layout_for() {
        assert_eq!(layout_for(1).unwrap(), ChannelLayout::Mono);
        assert_eq!(layout_for(6).unwrap(), ChannelLayout::Surround51);
        assert!(layout_for(4).is_err());
    }

    #[test]
    fn test_block_size_does_not_change_result() {
        let audio = AudioFile::new(48000, vec![sine(48000, 3.0, 0.2)]);
        let a = analyze(&audio, ChannelLayout::Mono, 64).unwrap();
        let b = analyze(&audio, ChannelLayout::Mono, 4800).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_report_text_and_json() {
        let audio = AudioFile::new(48000, vec![sine(48000, 4.0, 0.1); 2]);
        let report = AnalysisReport::new("tone.wav", &audio, 1024)
            .unwrap()
            .with_target(LoudnessTarget::EbuR128);

        let text = report.to_string();
        assert!(text.contains("tone.wav"));
        assert!(text.contains("LUFS"));
        assert!(text.contains("ebu-r128"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["channels"], 2);
        assert_eq!(json["assessment"]["target"], "ebu-r128");
    }

    #[test]
    fn test_short_file_is_unmeasurable() {
        let audio = AudioFile::new(48000, vec![vec![0.1; 1000]]);
        let report = AnalysisReport::new("short.wav", &audio, 256)
            .unwrap()
            .with_target(LoudnessTarget::Streaming);
        assert_eq!(report.loudness.integrated, LoudnessReading::InsufficientData);
        assert_eq!(report.assessment.unwrap().compliance, Compliance::Unmeasurable);
        assert!(report.to_string().contains("Integrated:      --"));
    }
}
