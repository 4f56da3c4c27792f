use codspeed_criterion_compat::{black_box, criterion_group, criterion_main, Criterion};
use spacemouse_protocol::{registry, Input};

fn bench_parse_reports(c: &mut Criterion) {
    let config = registry::get(0x256f, 0xc633).expect("enterprise entry");

    let motion: [u8; 13] = [0x01, 0x2c, 0x01, 0x10, 0x00, 0, 0, 0x9a, 0xff, 0, 0, 0x05, 0x00];
    c.bench_function("protocol_parse_motion_report", |b| {
        b.iter(|| {
            let data = black_box(&motion[..]);
            black_box(config.parse_report(data, &Input::default()))
        })
    });

    let buttons: [u8; 8] = [0x1c, 0x0d, 0x19, 0x1a, 0, 0, 0, 0];
    c.bench_function("protocol_parse_button_report", |b| {
        b.iter(|| {
            let data = black_box(&buttons[..]);
            black_box(config.parse_report(data, &Input::default()))
        })
    });
}

criterion_group!(benches, bench_parse_reports);
criterion_main!(benches);
