use driftcorr_core::error::DriftError;
use driftcorr_core::pipeline::config::{DriftConfig, PeakRefinement};
use driftcorr_core::pipeline::PipelineStage;

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[test]
fn test_peak_refinement_display() {
    assert_eq!(format!("{}", PeakRefinement::None), "Integer");
    assert_eq!(format!("{}", PeakRefinement::Parabolic), "Parabolic");
    assert_eq!(format!("{}", PeakRefinement::Upsampled), "Upsampled DFT");
}

#[test]
fn test_pipeline_stage_display() {
    assert_eq!(format!("{}", PipelineStage::Correlating), "Correlating pairs");
    assert_eq!(format!("{}", PipelineStage::Shifting), "Shifting frames");
}

// ---------------------------------------------------------------------------
// Defaults and TOML
// ---------------------------------------------------------------------------

#[test]
fn test_defaults() {
    let c = DriftConfig::default();
    assert_eq!(c.stride, 1);
    assert_eq!(c.fftsize, 256);
    assert_eq!(c.block_size, 10);
    assert_eq!(c.sigma, 3.0);
    assert_eq!(c.min_normed_weight, 0.15);
    assert_eq!(c.weight_power, 1.0);
    assert_eq!(c.peak_refinement, PeakRefinement::Upsampled);
    assert_eq!(c.upsample_factor, 20);
    assert_eq!(c.window(), 256);
    assert!(c.validate().is_ok());
}

#[test]
fn test_partial_toml_fills_defaults() {
    let c: DriftConfig = toml::from_str(
        r#"
        stride = 3
        fftsize = 64
        peak_refinement = "parabolic"
        center = [100, 120]
        "#,
    )
    .unwrap();
    assert_eq!(c.stride, 3);
    assert_eq!(c.fftsize, 64);
    assert_eq!(c.peak_refinement, PeakRefinement::Parabolic);
    assert_eq!(c.center, Some((100, 120)));
    assert_eq!(c.block_size, 10);
    assert_eq!(c.stop, None);
    assert_eq!(c.upsample_factor, 20);

    let c: DriftConfig = toml::from_str(
        r#"
        peak_refinement = "upsampled"
        upsample_factor = 50
        "#,
    )
    .unwrap();
    assert_eq!(c.peak_refinement, PeakRefinement::Upsampled);
    assert_eq!(c.upsample_factor, 50);
}

#[test]
fn test_toml_round_trip() {
    let c = DriftConfig {
        stride: 2,
        stop: Some(40),
        max_shift: Some(20),
        weight_power: 4.0,
        ..DriftConfig::default()
    };
    let text = toml::to_string(&c).unwrap();
    let back: DriftConfig = toml::from_str(&text).unwrap();
    assert_eq!(back.stride, 2);
    assert_eq!(back.stop, Some(40));
    assert_eq!(back.max_shift, Some(20));
    assert_eq!(back.weight_power, 4.0);
    assert_eq!(back.center, None);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn rejects(c: DriftConfig) -> bool {
    matches!(c.validate(), Err(DriftError::InvalidConfig(_)))
}

#[test]
fn test_invalid_options_rejected() {
    assert!(rejects(DriftConfig { stride: 0, ..Default::default() }));
    assert!(rejects(DriftConfig { block_size: 0, ..Default::default() }));
    assert!(rejects(DriftConfig { sigma: 0.0, ..Default::default() }));
    assert!(rejects(DriftConfig { sigma: f32::NAN, ..Default::default() }));
    assert!(rejects(DriftConfig { fftsize: 0, ..Default::default() }));
    assert!(rejects(DriftConfig { max_shift: Some(300), ..Default::default() }));
    assert!(rejects(DriftConfig { min_normed_weight: 1.5, ..Default::default() }));
    assert!(rejects(DriftConfig { weight_power: 0.0, ..Default::default() }));
    assert!(rejects(DriftConfig { upsample_factor: 0, ..Default::default() }));
    assert!(rejects(DriftConfig { threads: Some(0), ..Default::default() }));
}

#[test]
fn test_validate_for_resolves_centered_window() {
    let c = DriftConfig {
        fftsize: 32,
        ..Default::default()
    };
    let e = c.validate_for(100, 80).unwrap();
    assert_eq!((e.row0, e.col0, e.size()), (18, 8, 64));
}

#[test]
fn test_validate_for_rejects_window_past_edge() {
    let c = DriftConfig {
        fftsize: 32,
        center: Some((40, 70)),
        ..Default::default()
    };
    assert!(matches!(
        c.validate_for(100, 80),
        Err(DriftError::DimensionMismatch(_))
    ));
}

#[test]
fn test_validate_for_explicit_extent() {
    let c = DriftConfig {
        extent: Some((10, 50, 20, 60)),
        center: Some((0, 0)),
        ..Default::default()
    };
    let e = c.validate_for(100, 80).unwrap();
    assert_eq!((e.row0, e.col0, e.size()), (10, 20, 40));
    assert_eq!(c.window(), 20);

    let too_far = DriftConfig {
        extent: Some((10, 50, 20, 60)),
        max_shift: Some(30),
        ..Default::default()
    };
    assert!(too_far.validate().is_ok());
    assert!(matches!(
        too_far.validate_for(100, 80),
        Err(DriftError::InvalidConfig(_))
    ));
}

#[test]
fn test_sampled_indices() {
    let c = DriftConfig {
        stride: 3,
        start: 2,
        stop: Some(12),
        ..Default::default()
    };
    assert_eq!(c.sampled_indices(100), vec![2, 5, 8, 11]);
    assert_eq!(c.sampled_indices(6), vec![2, 5]);
    assert!(c.sampled_indices(2).is_empty());
}
