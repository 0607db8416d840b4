use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kinema_player_core::{
    Animation, Mode, NullRasterizer, PlaybackConfig, PlaybackScheduler, Player, Status,
};

fn bench_scheduler(c: &mut Criterion) {
    let anim: Animation = kinema_test_fixtures::animations::load("walk-cycle")
        .expect("walk-cycle fixture");
    let cfg = PlaybackConfig {
        mode: Mode::Bounce,
        loop_animation: true,
        ..Default::default()
    };
    let mut scheduler = PlaybackScheduler::new();
    scheduler.rewind(cfg.mode, cfg.resolve_bounds(&anim));
    scheduler.set_status(Status::Playing);

    c.bench_function("scheduler_advance_bounce_16ms", |b| {
        b.iter(|| {
            scheduler
                .advance(Some(&anim), &cfg, black_box(16.6))
                .expect("advance")
        })
    });
}

fn bench_player_tick(c: &mut Criterion) {
    let anim: Animation = kinema_test_fixtures::animations::load("bouncing-ball")
        .expect("bouncing-ball fixture");
    let mut player = Player::with_config(
        NullRasterizer::new(),
        PlaybackConfig {
            loop_animation: true,
            autoplay: true,
            ..Default::default()
        },
    );
    player.load_animation(anim).expect("load");

    c.bench_function("player_tick_loop_16ms", |b| {
        b.iter(|| player.tick(black_box(16.6)).expect("tick"))
    });
}

criterion_group!(benches, bench_scheduler, bench_player_tick);
criterion_main!(benches);
