use eddyprobe::config::{ProbeParams, TapMode};
use eddyprobe::probe::EddyProbe;
use eddyprobe::profile::Profile;
use eddyprobe::report::TapReport;
use eddyprobe::simulation::{SensorModel, generate_tap_trace};
use eddyprobe::tap::TapMove;

fn run_mode(mode: TapMode, contact_z: f64, seed_base: u64) -> eddyprobe::Result<()> {
    let model = SensorModel {
        contact_z,
        ..SensorModel::default()
    };
    let params = ProbeParams {
        tap_mode: mode,
        tap_threshold: mode.default_threshold(),
        ..ProbeParams::default()
    };
    let profile = Profile::with_params("default", params.clone())?;
    let probe = EddyProbe::new(profile, model.sample_rate)?;

    let outcome = probe.tap(|index| {
        let mv = TapMove::new(
            params.tap_start_z,
            params.tap_target_z,
            params.tap_speed,
            0.0,
        )?;
        let trace = generate_tap_trace(&model, &mv, 0.4, seed_base + index as u64);
        Ok((trace, mv))
    });

    let report = TapReport::from_outcome(&outcome);
    match report.to_json() {
        Ok(json) => println!("{mode}: {json}"),
        Err(e) => eprintln!("{mode}: report serialization failed: {e}"),
    }
    Ok(())
}

fn main() -> eddyprobe::Result<()> {
    println!("=== Simulated tap sequences ===");
    for (contact_z, seed_base) in [(0.0, 1000u64), (0.45, 2000)] {
        println!("-- bed contact at {contact_z} mm --");
        for mode in [TapMode::Wma, TapMode::Butter] {
            run_mode(mode, contact_z, seed_base)?;
        }
    }
    Ok(())
}
