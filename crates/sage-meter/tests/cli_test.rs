//! File round trips through the library and the binary

use std::process::Command;

use approx::assert_abs_diff_eq;
use sage_core::{Sample, db_to_linear, linear_to_db, sample_peak};
use sage_dsp::presets::{Compliance, DynamicsPreset, LoudnessTarget};
use sage_dsp::LoudnessReading;
use sage_meter::{AnalysisReport, AudioFile, ProcessConfig, read_wav, render, write_wav};

const SAMPLE_RATE: u32 = 48000;

fn generate_sine(seconds: f64, freq: f64, rms_dbfs: f64) -> Vec<Sample> {
    let amplitude = db_to_linear(rms_dbfs) * std::f64::consts::SQRT_2;
    let n = (SAMPLE_RATE as f64 * seconds) as usize;
    let step = 2.0 * std::f64::consts::PI * freq / SAMPLE_RATE as f64;
    (0..n).map(|i| amplitude * (step * i as f64).sin()).collect()
}

fn integrated(report: &AnalysisReport) -> f64 {
    match report.loudness.integrated {
        LoudnessReading::Value(v) => v,
        other => panic!("expected a value, got {other:?}"),
    }
}

#[test]
fn test_broadcast_tone_is_compliant_after_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");

    // -26 dBFS RMS per channel sums to about -23 LUFS in stereo
    let tone = generate_sine(5.0, 1000.0, -26.0);
    write_wav(&path, &AudioFile::new(SAMPLE_RATE, vec![tone.clone(), tone])).unwrap();

    let audio = read_wav(&path).unwrap();
    let report = AnalysisReport::new("tone.wav", &audio, 1024)
        .unwrap()
        .with_target(LoudnessTarget::EbuR128);

    assert_abs_diff_eq!(integrated(&report), -23.0, epsilon = 0.2);
    assert_eq!(report.assessment.unwrap().compliance, Compliance::Compliant);
}

#[test]
fn test_process_file_with_limiter() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("hot.wav");
    let output = dir.path().join("limited.wav");

    let hot = generate_sine(3.0, 220.0, 0.0);
    write_wav(&input, &AudioFile::new(SAMPLE_RATE, vec![hot])).unwrap();

    let audio = read_wav(&input).unwrap();
    let config = ProcessConfig::from_preset(DynamicsPreset::MasterLimiter);
    let (rendered, summary) = render(&audio, &config, 512).unwrap();
    write_wav(&output, &rendered).unwrap();

    let limited = read_wav(&output).unwrap();
    assert_eq!(limited.frames(), audio.frames());
    assert!(summary.max_gain_reduction_db > 1.0);
    assert!(linear_to_db(sample_peak(&limited.channels[0])) <= -1.0 + 0.1);
}

#[test]
fn test_config_file_drives_chain() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("chain.json");
    std::fs::write(
        &config_path,
        r#"{
            "eq": [{ "kind": "Peaking", "frequency": 1000.0, "gain_db": -6.0 }],
            "dynamics": { "type": "compressor", "params": { "threshold_db": 0.0, "ratio": 2.0 } }
        }"#,
    )
    .unwrap();

    let config = ProcessConfig::load(&config_path).unwrap();
    let audio = AudioFile::new(SAMPLE_RATE, vec![generate_sine(4.0, 1000.0, -20.0)]);
    let before = AnalysisReport::new("in", &audio, 1024).unwrap();
    let (rendered, _) = render(&audio, &config, 1024).unwrap();
    let after = AnalysisReport::new("out", &rendered, 1024).unwrap();

    // Compressor never engages; only the -6 dB bell at the tone frequency acts
    assert_abs_diff_eq!(integrated(&after) - integrated(&before), -6.0, epsilon = 0.1);
}

#[test]
fn test_bad_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("bad.json");
    std::fs::write(&config_path, r#"{ "dynamics": { "type": "expander" } }"#).unwrap();

    let err = ProcessConfig::load(&config_path).unwrap_err();
    assert!(format!("{err:#}").contains("bad.json"));
}

#[test]
fn test_binary_analyze_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    let tone = AudioFile::new(SAMPLE_RATE, vec![generate_sine(4.0, 1000.0, -20.0)]);
    write_wav(&path, &tone).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sage-meter"))
        .args(["analyze", "--json", "--target", "streaming"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["channels"], 1);
    assert_eq!(json["assessment"]["compliance"], "too-quiet");
}

#[test]
fn test_binary_presets_and_errors() {
    let presets = Command::new(env!("CARGO_BIN_EXE_sage-meter"))
        .arg("presets")
        .output()
        .unwrap();
    assert!(presets.status.success());
    let text = String::from_utf8_lossy(&presets.stdout);
    assert!(text.contains("master-limiter"));
    assert!(text.contains("ebu-r128"));

    let missing = Command::new(env!("CARGO_BIN_EXE_sage-meter"))
        .args(["analyze", "/nonexistent/file.wav"])
        .output()
        .unwrap();
    assert!(!missing.status.success());
}
