use std::collections::HashMap;

use kinema_player_core::{
    Animation, FrameBounds, Mode, PlaybackConfig, PlaybackScheduler, PlayerError, Status,
};

/// 11 frames at one frame per 10ms.
fn ten_step() -> Animation {
    Animation::new(11.0, 0.11)
}

fn started(mode: Mode, anim: &Animation, cfg: &PlaybackConfig) -> PlaybackScheduler {
    let mut s = PlaybackScheduler::new();
    s.rewind(mode, cfg.resolve_bounds(anim));
    s.set_status(Status::Playing);
    s
}

/// it should advance monotonically until the end, then complete and stay put
#[test]
fn forward_without_loop_is_monotonic_then_complete() {
    let anim = ten_step();
    let cfg = PlaybackConfig {
        speed: 1.7,
        ..Default::default()
    };
    let mut s = started(Mode::Forward, &anim, &cfg);
    let mut last = s.raw_frame();
    let mut completed_at = None;
    for i in 0..200 {
        let r = s.advance(Some(&anim), &cfg, 7.0).unwrap();
        assert!(r.frame >= last, "frame went backwards at tick {i}");
        last = r.frame;
        if r.completed {
            completed_at = Some(i);
            break;
        }
    }
    assert!(completed_at.is_some());
    assert_eq!(s.status(), Status::Complete);
    assert_eq!(s.raw_frame(), 10.0);

    let r = s.advance(Some(&anim), &cfg, 500.0).unwrap();
    assert_eq!(r.frame, 10.0);
    assert!(!r.changed && !r.completed);
}

/// it should visit interior frames twice per bounce cycle and flip exactly at the bounds
#[test]
fn bounce_cycle_visits_interior_frames_twice() {
    let anim = ten_step();
    let cfg = PlaybackConfig {
        mode: Mode::Bounce,
        loop_animation: true,
        use_frame_interpolation: false,
        ..Default::default()
    };
    let mut s = started(Mode::Bounce, &anim, &cfg);
    let mut visits: HashMap<i32, u32> = HashMap::new();
    for tick in 1..=20 {
        let r = s.advance(Some(&anim), &cfg, 10.0).unwrap();
        *visits.entry(r.frame as i32).or_default() += 1;
        match tick {
            1..=9 => assert_eq!(s.state().direction, 1.0, "tick {tick}"),
            10 => {
                assert_eq!(r.frame, 10.0);
                assert_eq!(s.state().direction, -1.0);
            }
            11..=19 => assert_eq!(s.state().direction, -1.0, "tick {tick}"),
            _ => {
                assert_eq!(r.frame, 0.0);
                assert!(r.looped);
                assert_eq!(s.state().direction, 1.0);
            }
        }
    }
    for f in 1..10 {
        assert_eq!(visits.get(&f), Some(&2), "frame {f}");
    }
    assert_eq!(visits.get(&0), Some(&1));
    assert_eq!(visits.get(&10), Some(&1));
    assert_eq!(s.loops_completed(), 1);
}

/// it should complete after exactly N loops
#[test]
fn finite_loop_count_completes_after_n_wraps() {
    let anim = ten_step();
    let cfg = PlaybackConfig {
        loop_animation: true,
        loop_count: 3,
        ..Default::default()
    };
    let mut s = started(Mode::Forward, &anim, &cfg);
    let mut wraps = 0;
    let mut ticks = 0;
    while s.status() == Status::Playing && ticks < 1000 {
        let r = s.advance(Some(&anim), &cfg, 10.0).unwrap();
        wraps += r.looped as u32;
        ticks += 1;
    }
    assert_eq!(wraps, 3);
    assert_eq!(s.loops_completed(), 3);
    assert_eq!(s.status(), Status::Complete);
    assert_eq!(ticks, 40);
}

/// it should loop forever when loop_count is zero
#[test]
fn infinite_loop_never_completes() {
    let anim = ten_step();
    let cfg = PlaybackConfig {
        loop_animation: true,
        loop_count: 0,
        ..Default::default()
    };
    let mut s = started(Mode::Forward, &anim, &cfg);
    for _ in 0..1000 {
        let r = s.advance(Some(&anim), &cfg, 10.0).unwrap();
        assert!(!r.completed);
    }
    assert_eq!(s.status(), Status::Playing);
    assert_eq!(s.loops_completed(), 100);
}

#[test]
fn reverse_runs_from_end_to_start() {
    let anim = ten_step();
    let cfg = PlaybackConfig {
        mode: Mode::Reverse,
        ..Default::default()
    };
    let mut s = started(Mode::Reverse, &anim, &cfg);
    assert_eq!(s.raw_frame(), 10.0);
    let r = s.advance(Some(&anim), &cfg, 35.0).unwrap();
    assert!((r.frame - 6.5).abs() < 1e-3);
    let r = s.advance(Some(&anim), &cfg, 1000.0).unwrap();
    assert!(r.completed);
    assert_eq!(r.frame, 0.0);
}

#[test]
fn segment_scopes_the_run() {
    let anim = Animation::new(101.0, 1.01);
    let cfg = PlaybackConfig {
        segment: Some((20.0, 30.0)),
        ..Default::default()
    };
    let mut s = started(Mode::Forward, &anim, &cfg);
    assert_eq!(s.raw_frame(), 20.0);
    let r = s.advance(Some(&anim), &cfg, 10_000.0).unwrap();
    assert!(r.completed);
    assert_eq!(r.frame, 30.0);
}

#[test]
fn stale_frame_outside_new_bounds_is_clamped_before_advancing() {
    let anim = Animation::new(101.0, 1.01);
    let cfg = PlaybackConfig {
        segment: Some((50.0, 60.0)),
        ..Default::default()
    };
    let mut s = started(Mode::Forward, &anim, &PlaybackConfig::default());
    s.set_frame(5.0);
    let r = s.advance(Some(&anim), &cfg, 10.0).unwrap();
    assert!((r.frame - 51.0).abs() < 1e-3);
}

#[test]
fn zero_width_range_is_invalid_state() {
    let anim = Animation::new(1.0, 0.5);
    let cfg = PlaybackConfig::default();
    let mut s = PlaybackScheduler::new();
    s.rewind(
        Mode::Forward,
        FrameBounds {
            start: 0.0,
            end: 0.0,
        },
    );
    s.set_status(Status::Playing);
    let err = s.advance(Some(&anim), &cfg, 16.0).unwrap_err();
    assert!(matches!(err, PlayerError::InvalidState { .. }));
    assert_eq!(s.raw_frame(), 0.0);
}
