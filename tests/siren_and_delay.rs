//! Dub siren patterns, the feedback delay and tap tempo

use tonebox::engine::Transition;
use tonebox::{Engine, EngineEvent, NoteDivision, NoteStyle, OfflineOutput, SirenType};

fn engine(sample_rate: f32) -> Engine<OfflineOutput> {
    Engine::new(OfflineOutput::with_sample_rate(sample_rate))
}

/// Render in 50 ms chunks, polling after each, until `seconds` have passed
fn run(engine: &mut Engine<OfflineOutput>, seconds: f64) -> Vec<(f64, EngineEvent)> {
    let chunk = (engine.sample_rate() as f64 * 0.05).round() as usize;
    let end = engine.now() + seconds;
    let mut events = Vec::new();
    while engine.now() < end - 1e-9 {
        engine.output_mut().render(chunk);
        let now = engine.now();
        events.extend(engine.poll().into_iter().map(|e| (now, e)));
    }
    events
}

#[test]
fn chop_pattern_stops_after_four_seconds() {
    let mut engine = engine(1000.0);
    engine.start_siren(SirenType::Chop).unwrap();

    let pattern = engine.siren_events().to_vec();
    assert_eq!(pattern.len(), 20);
    assert!(pattern.iter().all(|e| e.transition == Transition::Step));
    assert!((pattern.last().unwrap().offset - 3.8).abs() < 1e-9);

    engine.output_mut().render(250);
    assert_eq!(engine.output().renderer().unwrap().siren_frequency(), 1000.0);
    engine.output_mut().render(200);
    assert_eq!(engine.output().renderer().unwrap().siren_frequency(), 200.0);

    let events = run(&mut engine, 5.0);
    let finished: Vec<f64> = events
        .iter()
        .filter(|(_, e)| *e == EngineEvent::SirenFinished)
        .map(|(t, _)| *t)
        .collect();
    assert_eq!(finished.len(), 1);
    assert!((finished[0] - 4.0).abs() < 1e-6, "finished at {}", finished[0]);

    assert!(!engine.is_siren_playing());
    assert!(engine.siren_events().is_empty());
    let renderer = engine.output().renderer().unwrap();
    assert!(!renderer.is_siren_active());
    assert_eq!(renderer.siren_gain(), 0.0);
}

#[test]
fn sweep_pattern_glides_exponentially() {
    let mut engine = engine(1000.0);
    engine.start_siren(SirenType::Sweep).unwrap();

    // Halfway up the 200 -> 1000 ramp
    engine.output_mut().render(1001);
    let frequency = engine.output().renderer().unwrap().siren_frequency();
    let expected = 200.0 * 5f32.sqrt();
    assert!((frequency - expected).abs() < 0.5, "got {}", frequency);

    // Top of the rise
    engine.output_mut().render(1000);
    let frequency = engine.output().renderer().unwrap().siren_frequency();
    assert!((frequency - 1000.0).abs() < 0.5, "got {}", frequency);
}

#[test]
fn siren_pattern_runs_ten_seconds() {
    let mut engine = engine(1000.0);
    engine.start_siren(SirenType::Siren).unwrap();

    let events = run(&mut engine, 9.9);
    assert!(events.is_empty());
    assert!(engine.is_siren_playing());

    let events = run(&mut engine, 0.2);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1, EngineEvent::SirenFinished);
}

#[test]
fn restart_replaces_running_pattern() {
    let mut engine = engine(1000.0);
    engine.start_siren(SirenType::Sweep).unwrap();
    run(&mut engine, 1.0);

    engine.start_siren(SirenType::Chop).unwrap();
    assert_eq!(engine.siren_type(), SirenType::Chop);

    // The first pattern would have ended at 4 s; only the second may finish, at 5 s
    let events = run(&mut engine, 4.5);
    assert_eq!(events.len(), 1);
    assert!((events[0].0 - 5.0).abs() < 1e-6);
}

#[test]
fn stop_siren_is_idempotent_and_cancels_events() {
    let mut engine = engine(1000.0);
    assert!(!engine.stop_siren());

    engine.start_siren(SirenType::Chop).unwrap();
    engine.output_mut().render(300);
    assert!(engine.stop_siren());
    assert!(!engine.stop_siren());
    assert_eq!(engine.next_timer_due(), None);

    engine.output_mut().render(1);
    let renderer = engine.output().renderer().unwrap();
    assert!(!renderer.is_siren_active());
    assert_eq!(renderer.siren_gain(), 0.0);
    // The stop also dropped the end-of-pattern stop it made redundant
    assert_eq!(renderer.pending_len(), 0);

    assert!(run(&mut engine, 5.0).is_empty());
}

#[test]
fn siren_volume_and_echoes() {
    let mut engine = engine(8000.0);
    engine.set_volume(0.2);
    engine.set_delay_feedback(0.0);
    engine.set_delay_manual_ms(100);
    engine.start_siren(SirenType::Chop).unwrap();
    engine.output_mut().render(1);
    assert!((engine.output().renderer().unwrap().siren_gain() - 0.1).abs() < 1e-6);

    engine.set_volume(0.4);
    engine.output_mut().render(2399);
    assert!((engine.output().renderer().unwrap().siren_gain() - 0.2).abs() < 1e-6);

    // With zero feedback the wet path repeats the dry signal once, 100 ms later
    engine.stop_siren();
    let echo = engine.output_mut().render(800);
    assert!(echo.iter().any(|f| f.left.abs() > 1e-3));

    // Skip the frames where the delay read still straddles the stop
    let later = engine.output_mut().render(800);
    assert!(later[10..].iter().all(|f| f.left.abs() < 1e-4));
}

#[test]
fn delay_times_follow_sync_settings() {
    let mut engine = engine(1000.0);
    engine.initialize().unwrap();

    engine.set_delay_manual_ms(250);
    assert!((engine.delay_time() - 0.25).abs() < 1e-6);

    engine.set_tempo_sync(true);
    engine.set_bpm(120);
    engine.set_division(NoteDivision::Quarter);
    engine.set_style(NoteStyle::Regular);
    assert!((engine.delay_time() - 0.5).abs() < 1e-6);

    engine.set_division(NoteDivision::Eighth);
    engine.set_style(NoteStyle::Triplet);
    assert!((engine.delay_time() - 0.1667).abs() < 1e-4);

    // Whole notes at 40 bpm would be 6 s
    engine.set_bpm(40);
    engine.set_division(NoteDivision::Whole);
    engine.set_style(NoteStyle::Regular);
    assert!((engine.delay_time() - 2.0).abs() < 1e-6);

    engine.set_delay_feedback(150.0);
    engine.output_mut().render(1);
    let renderer = engine.output().renderer().unwrap();
    assert!((renderer.delay_time() - 2.0).abs() < 1e-6);
    assert!((renderer.delay_feedback() - 1.5).abs() < 1e-6);

    engine.set_delay_feedback(500.0);
    assert_eq!(engine.delay_parameters().feedback_percent(), 200.0);
}

#[test]
fn tap_tempo_commits_and_pushes_delay() {
    let mut engine = engine(1000.0);
    engine.initialize().unwrap();
    engine.set_tempo_sync(true);
    engine.set_bpm(90);

    assert_eq!(engine.tap_tempo_at(0.0), None);
    assert_eq!(engine.tap_tempo_at(500.0), Some(120));
    assert_eq!(engine.tap_tempo_at(1000.0), Some(120));
    assert_eq!(engine.tap_tempo_at(1500.0), Some(120));
    assert_eq!(engine.bpm(), 120);

    engine.output_mut().render(1);
    let renderer = engine.output().renderer().unwrap();
    assert!((renderer.delay_time() - 0.5).abs() < 1e-6);
}

#[test]
fn out_of_range_taps_leave_bpm_alone() {
    let mut engine = engine(1000.0);
    engine.set_bpm(100);

    engine.tap_tempo_at(0.0);
    assert_eq!(engine.tap_tempo_at(5000.0), None);
    assert_eq!(engine.tap_tempo_at(5100.0), None);
    assert_eq!(engine.bpm(), 100);
}
