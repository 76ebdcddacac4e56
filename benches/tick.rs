use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use oref::prelude::*;

fn profile() -> Profile {
    Profile {
        max_basal: 5.0,
        max_daily_basal: 1.2,
        current_basal: 1.0,
        sens: 50.0,
        carb_ratio: 10.0,
        min_bg: 100.0,
        max_bg: 120.0,
        enable_smb_with_cob: true,
        enable_uam: true,
        ..Default::default()
    }
}

fn one_tick_inputs() -> EngineInputs {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let glucose = (0..24)
        .map(|i| GlucoseReading::new(150.0 - i as f64 * 1.5, now - Duration::minutes(5 * i)))
        .collect();
    let pump_history = vec![
        PumpEvent::Bolus { timestamp: now - Duration::minutes(35), units: 3.0 },
        PumpEvent::TempBasal { timestamp: now - Duration::minutes(20), rate: 1.4 },
        PumpEvent::TempBasalDuration { timestamp: now - Duration::minutes(20), minutes: 30.0 },
    ];
    let carbs = vec![CarbEntry { timestamp: now - Duration::minutes(30), carbs: 40.0, fat: None, protein: None }];

    EngineInputs {
        profile: profile(),
        current_temp: CurrentTemp::absolute(1.4, 10.0),
        glucose,
        pump_history,
        carbs,
        temp_targets: Vec::new(),
        clock: now,
        previous_autosens_ratio: 1.0,
        tdd: None,
        weighted_average_tdd: None,
        average_total_tdd: None,
    }
}

fn bench_tick(c: &mut Criterion) {
    let inputs = one_tick_inputs();
    c.bench_function("determine_one_tick", |b| {
        b.iter(|| determine(black_box(&inputs)).unwrap());
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
