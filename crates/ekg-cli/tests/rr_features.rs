use assert_cmd::cargo::cargo_bin_cmd;
use ekg_lib::metrics::RRIntervalFeatureVector;
use serde::Deserialize;
use std::{error::Error, path::PathBuf};

#[derive(Deserialize)]
struct FeaturesOutput {
    fs: f64,
    sample_count: usize,
    beats: usize,
    features: RRIntervalFeatureVector,
}

fn rr_features(extra: &[&str]) -> Result<FeaturesOutput, Box<dyn Error>> {
    let recording = sample_path("test_data/ecg_regular.csv");
    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args(["rr-features", "--input", recording.to_str().expect("utf8 path")]);
    cmd.args(extra);
    let output = cmd.assert().success().get_output().stdout.clone();
    Ok(serde_json::from_slice(&output)?)
}

#[test]
fn annotated_one_second_beats_give_sixty_bpm() -> Result<(), Box<dyn Error>> {
    let peaks = sample_path("test_data/ecg_regular_peaks.txt");
    let out = rr_features(&["--annotations", peaks.to_str().expect("utf8 path")])?;

    assert_eq!(out.fs, 500.0);
    assert_eq!(out.sample_count, 5000);
    assert_eq!(out.beats, 5);
    assert_close(out.features.mean_rr, 1.0, 1e-12);
    assert_close(out.features.median_rr, 1.0, 1e-12);
    assert_close(out.features.std_rr, 0.0, 1e-12);
    assert_close(out.features.skewness_rr, 0.0, 1e-12);
    assert_close(out.features.kurtosis_rr, 0.0, 1e-12);
    assert_close(out.features.heart_rate, 60.0, 1e-9);
    Ok(())
}

#[test]
fn single_annotated_beat_yields_zero_vector() -> Result<(), Box<dyn Error>> {
    let peaks = sample_path("test_data/single_peak.txt");
    let out = rr_features(&["--annotations", peaks.to_str().expect("utf8 path")])?;

    assert_eq!(out.beats, 1);
    assert!(out.features.is_zero());
    Ok(())
}

#[test]
fn detected_beats_track_the_synthetic_rhythm() -> Result<(), Box<dyn Error>> {
    let out = rr_features(&[])?;

    assert!(
        (8..=11).contains(&out.beats),
        "unexpected beat count {}",
        out.beats
    );
    assert_close(out.features.mean_rr, 1.0, 0.05);
    assert!(out.features.heart_rate > 55.0 && out.features.heart_rate < 65.0);
    Ok(())
}

#[test]
fn annotation_past_the_end_is_rejected() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let peaks = dir.path().join("late.txt");
    std::fs::write(&peaks, "10\n99999\n")?;
    let recording = sample_path("test_data/ecg_regular.csv");

    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args([
        "rr-features",
        "--input",
        recording.to_str().expect("utf8 path"),
        "--annotations",
        peaks.to_str().expect("utf8 path"),
    ]);
    cmd.assert().failure();
    Ok(())
}

#[test]
fn find_rpeaks_lands_near_each_synthetic_beat() -> Result<(), Box<dyn Error>> {
    let recording = sample_path("test_data/ecg_regular.csv");
    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args([
        "ecg-find-rpeaks",
        "--input",
        recording.to_str().expect("utf8 path"),
        "--min-rr-s",
        "0.3",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let peaks: serde_json::Value = serde_json::from_slice(&output)?;
    let indices: Vec<u64> = peaks["indices"]
        .as_array()
        .expect("indices array")
        .iter()
        .filter_map(|v| v.as_u64())
        .collect();

    assert!(!indices.is_empty());
    assert!(indices.windows(2).all(|w| w[0] < w[1]));
    // Synthetic beats sit at 0.5 s + k * 1.0 s, i.e. sample 250 + 500k.
    for idx in indices {
        let offset = (idx + 250) % 500;
        assert!(offset.min(500 - offset) <= 25, "peak {idx} far from any beat");
    }
    Ok(())
}

fn sample_path(relative: &str) -> PathBuf {
    workspace_root().join(relative)
}

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected}, got {actual} (tol {tol})"
    );
}
