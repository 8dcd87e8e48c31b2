use eddyprobe::config::{ProbeParams, TapMode};
use eddyprobe::error::EddyError;
use eddyprobe::probe::EddyProbe;
use eddyprobe::profile::Profile;
use eddyprobe::simulation::{SensorModel, generate_tap_trace};
use eddyprobe::tap::TapMove;

const LEAD_TIME: f64 = 0.4;

fn probe_with(params: ProbeParams) -> EddyProbe {
    let model = SensorModel::default();
    let profile = Profile::with_params("default", params).unwrap();
    EddyProbe::new(profile, model.sample_rate).unwrap()
}

/// One simulated probing move against a bed at `contact_z`.
fn simulated_attempt(
    params: &ProbeParams,
    contact_z: f64,
    seed: u64,
) -> (eddyprobe::tap::TapTrace, TapMove) {
    let model = SensorModel {
        contact_z,
        ..SensorModel::default()
    };
    let mv = TapMove::new(
        params.tap_start_z,
        params.tap_target_z,
        params.tap_speed,
        0.0,
    )
    .unwrap();
    let trace = generate_tap_trace(&model, &mv, LEAD_TIME, seed);
    (trace, mv)
}

#[test]
fn test_wma_tap_finds_contact() {
    let params = ProbeParams {
        tap_mode: TapMode::Wma,
        tap_threshold: TapMode::Wma.default_threshold(),
        ..ProbeParams::default()
    };
    let probe = probe_with(params.clone());

    let result = probe
        .tap(|index| Ok(simulated_attempt(&params, 0.0, 100 + index as u64)))
        .unwrap();

    assert_eq!(result.sample_indices.len(), 3);
    assert!(result.stddev <= 0.020);
    // Filter delay makes the reported offset trail true contact slightly.
    assert!(
        result.z_offset.abs() < 0.05,
        "z_offset {} too far from contact",
        result.z_offset
    );
}

#[test]
fn test_butter_tap_finds_contact() {
    let params = ProbeParams::default();
    assert_eq!(params.tap_mode, TapMode::Butter);
    let probe = probe_with(params.clone());

    let result = probe
        .tap(|index| Ok(simulated_attempt(&params, 0.0, 200 + index as u64)))
        .unwrap();

    assert_eq!(result.samples.len(), 3);
    assert!(result.stddev <= 0.020);
    assert!(
        result.z_offset.abs() < 0.05,
        "z_offset {} too far from contact",
        result.z_offset
    );
}

#[test]
fn test_tap_with_shifted_bed() {
    let params = ProbeParams::default();
    let probe = probe_with(params.clone());

    let result = probe
        .tap(|index| Ok(simulated_attempt(&params, 0.8, 300 + index as u64)))
        .unwrap();

    assert!(
        (result.z_offset - 0.8).abs() < 0.05,
        "z_offset {} too far from shifted contact",
        result.z_offset
    );
}

#[test]
fn test_no_contact_when_bed_out_of_reach() {
    // Bed below the lowest Z the move reaches, so the signal never
    // collapses inside the window.
    let params = ProbeParams::default();
    let probe = probe_with(params.clone());

    let err = probe
        .tap(|index| Ok(simulated_attempt(&params, -1.0, 400 + index as u64)))
        .unwrap_err();
    assert!(matches!(err, EddyError::NoContactDetected));
}

#[test]
fn test_outlier_attempt_triggers_extra_sample() {
    let params = ProbeParams::default();
    let probe = probe_with(params.clone());

    // Attempt 1 contacts 0.3mm high (debris under the nozzle); the rest
    // agree. The first batch of three cannot pass the stddev gate, so a
    // fourth attempt is requested and the outlier is left out.
    let result = probe
        .tap(|index| {
            let contact = if index == 1 { 0.3 } else { 0.0 };
            Ok(simulated_attempt(&params, contact, 500 + index as u64))
        })
        .unwrap();

    assert_eq!(result.samples.len(), 4);
    assert_eq!(result.sample_indices, vec![0, 2, 3]);
    assert!(result.z_offset.abs() < 0.05);
}

#[test]
fn test_inconsistent_attempts_rejected() {
    let params = ProbeParams::default();
    let probe = probe_with(params.clone());

    // Every attempt lands somewhere else; no subset can agree.
    let err = probe
        .tap(|index| {
            let contact = 0.1 * index as f64;
            Ok(simulated_attempt(&params, contact, 600 + index as u64))
        })
        .unwrap_err();

    match err {
        EddyError::InconsistentSamples { samples } => {
            assert_eq!(samples.len(), 5);
        }
        other => panic!("expected InconsistentSamples, got {other:?}"),
    }
}
