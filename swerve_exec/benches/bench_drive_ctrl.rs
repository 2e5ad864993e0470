//! # Drive Control Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nalgebra::Vector2;
use swerve_lib::{
    drive_ctrl::{ChassisVelocity, DriveCtrl, InputData, SwerveParams, SwerveSynth},
    lead_pred::{LeadPredParams, LeadPredictor},
};
use util::module::State;

fn synth_benchmark(c: &mut Criterion) {
    let synth = SwerveSynth::new(&SwerveParams::default());
    let cmd = ChassisVelocity::field(3.0, 2.0, 1.5);
    let measured = [0.1, -0.2, 2.9, -3.0];

    c.bench_function("SwerveSynth::synthesize", |b| {
        b.iter(|| synth.synthesize(black_box(&cmd), black_box(0.7), black_box(&measured)))
    });
}

fn lead_pred_benchmark(c: &mut Criterion) {
    let pred = LeadPredictor::new(&LeadPredParams::default());
    let pos = Vector2::new(2.0, 1.5);
    let vel = Vector2::new(1.2, -2.0);
    let accel = Vector2::new(0.5, 0.5);

    c.bench_function("LeadPredictor::solve", |b| {
        b.iter(|| pred.solve(black_box(&pos), black_box(&vel), black_box(&accel), 0.15))
    });
}

fn drive_ctrl_benchmark(c: &mut Criterion) {
    let mut dc = DriveCtrl::default();
    let h = dc.handle();
    h.set_auto_aiming(true);
    h.command_velocity(ChassisVelocity::field(2.0, 0.0, 0.0))
        .unwrap();

    let mut time_s = 0.0;

    c.bench_function("DriveCtrl::proc", |b| {
        b.iter(|| {
            time_s += 0.02;
            dc.proc(black_box(&InputData {
                time_s,
                ..Default::default()
            }))
        })
    });
}

criterion_group!(benches, synth_benchmark, lead_pred_benchmark, drive_ctrl_benchmark);
criterion_main!(benches);
