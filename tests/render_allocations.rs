//! Noise buffers are freed on the control thread, never inside a render call

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use tonebox::{Engine, EngineConfig, NoiseType, OfflineOutput};

struct TrackingAllocator;

thread_local! {
    static WATCHING: Cell<bool> = const { Cell::new(false) };
    static LARGEST_FREE: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let _ = WATCHING.try_with(|watching| {
            if watching.get() {
                let _ = LARGEST_FREE.try_with(|largest| largest.set(largest.get().max(layout.size())));
            }
        });
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static ALLOCATOR: TrackingAllocator = TrackingAllocator;

/// Run `f` and report the largest block freed on this thread while it ran
fn largest_free_during<T>(f: impl FnOnce() -> T) -> (T, usize) {
    LARGEST_FREE.with(|largest| largest.set(0));
    WATCHING.with(|watching| watching.set(true));
    let result = f();
    WATCHING.with(|watching| watching.set(false));
    (result, LARGEST_FREE.with(|largest| largest.get()))
}

// Two seconds of f32 samples at 44.1 kHz
const NOISE_BUFFER_BYTES: usize = 88200 * 4;

fn seeded_engine() -> Engine<OfflineOutput> {
    let config = EngineConfig::default().with_noise_seed(7);
    Engine::with_config(OfflineOutput::with_sample_rate(44100.0), config)
}

#[test]
fn stopping_noise_frees_nothing_on_render() {
    let mut engine = seeded_engine();
    engine.start_noise(NoiseType::Pink).unwrap();
    engine.output_mut().render(64);

    engine.stop_noise();
    let (frames, largest) = largest_free_during(|| engine.output_mut().render(1));
    drop(frames);
    assert!(largest < 4096, "render freed {} bytes", largest);
    assert!(!engine.output().renderer().unwrap().has_noise_buffer());

    let (_, largest) = largest_free_during(|| engine.poll());
    assert!(largest >= NOISE_BUFFER_BYTES, "poll freed only {} bytes", largest);
}

#[test]
fn switching_noise_type_frees_nothing_on_render() {
    let mut engine = seeded_engine();
    engine.start_noise(NoiseType::White).unwrap();
    engine.output_mut().render(64);

    engine.set_noise_type(NoiseType::Brown).unwrap();
    let (frames, largest) = largest_free_during(|| engine.output_mut().render(64));
    drop(frames);
    assert!(largest < 4096, "render freed {} bytes", largest);
    assert_eq!(engine.output().renderer().unwrap().noise_buffer_len(), 88200);

    // The next start picks up the retired white buffer
    let (result, largest) = largest_free_during(|| engine.start_noise(NoiseType::Green));
    result.unwrap();
    assert!(largest >= NOISE_BUFFER_BYTES, "start freed only {} bytes", largest);
}
