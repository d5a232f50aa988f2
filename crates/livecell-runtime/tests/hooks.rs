#![forbid(unsafe_code)]

//! Integration tests for the became-used / became-unused hooks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use livecell_core::LifecycleState;
use livecell_harness::{ManualExecutor, ManualLifecycle, Recorder};
use livecell_runtime::{LiveData, LiveDataBuilder, ObserveOptions, Observer};
use tracing::Level;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init();
}

#[derive(Default)]
struct Edges {
    used: AtomicUsize,
    unused: AtomicUsize,
}

impl Edges {
    fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    fn unused(&self) -> usize {
        self.unused.load(Ordering::SeqCst)
    }
}

fn counted<V: Clone + Send + 'static>() -> (Arc<Edges>, LiveDataBuilder<V>) {
    init_tracing();
    let edges = Arc::new(Edges::default());
    let on_used = Arc::clone(&edges);
    let on_unused = Arc::clone(&edges);
    let builder = LiveData::builder(Arc::new(ManualExecutor::new()))
        .on_active(move |_| {
            on_used.used.fetch_add(1, Ordering::SeqCst);
        })
        .on_inactive(move |_| {
            on_unused.unused.fetch_add(1, Ordering::SeqCst);
        });
    (edges, builder)
}

#[test]
fn hooks_fire_only_on_zero_crossings() {
    let (edges, builder) = counted::<u32>();
    let live = builder.build();
    let a = Observer::new(|_: &u32| {});
    let b = Observer::new(|_: &u32| {});

    live.observe_forever(ObserveOptions::new(), &a);
    assert_eq!((edges.used(), edges.unused()), (1, 0));
    live.observe_forever(ObserveOptions::new(), &b);
    assert_eq!((edges.used(), edges.unused()), (1, 0));

    live.remove_observer(&a);
    assert_eq!((edges.used(), edges.unused()), (1, 0));
    live.remove_observer(&b);
    assert_eq!((edges.used(), edges.unused()), (1, 1));
    assert!(!live.has_active_observers());
}

#[test]
fn lifecycle_transitions_drive_hooks() {
    let (edges, builder) = counted::<u32>();
    let live = builder.build();
    let owner = ManualLifecycle::new("screen", LifecycleState::Created);
    live.observe(&owner.owner(), &Observer::new(|_: &u32| {}));
    assert_eq!(edges.used(), 0);

    owner.start();
    owner.resume();
    assert_eq!((edges.used(), edges.unused()), (1, 0));
    owner.stop();
    assert_eq!((edges.used(), edges.unused()), (1, 1));
    owner.destroy();
    assert_eq!((edges.used(), edges.unused()), (1, 1));
}

#[test]
fn stale_flag_correction_fires_unused() {
    let (edges, builder) = counted::<u32>();
    let live = builder.build();
    let owner = ManualLifecycle::started("screen");
    live.observe(&owner.owner(), &Observer::new(|_: &u32| {}));
    owner.set_silently(LifecycleState::Created);

    live.set_now(1);
    assert_eq!((edges.used(), edges.unused()), (1, 1));
}

#[test]
fn hook_reentering_the_holder_is_folded_into_the_same_reduction() {
    init_tracing();
    let used = Arc::new(AtomicUsize::new(0));
    let used_in_hook = Arc::clone(&used);
    let rec = Recorder::new();
    let replacement = Observer::new(rec.sink());
    let to_register = replacement.clone();

    let live = LiveData::builder(Arc::new(ManualExecutor::new()))
        .initial(10u32)
        .on_active(move |_| {
            used_in_hook.fetch_add(1, Ordering::SeqCst);
        })
        .on_inactive(move |live| {
            // Keep the source alive by registering a replacement.
            live.observe_forever(ObserveOptions::new(), &to_register);
        })
        .build();

    let first = Observer::new(|_: &u32| {});
    live.observe_forever(ObserveOptions::new(), &first);
    assert_eq!(used.load(Ordering::SeqCst), 1);

    live.remove_observer(&first);
    assert_eq!(used.load(Ordering::SeqCst), 2);
    assert_eq!(live.active_observer_count(), 1);
    assert_eq!(rec.values(), vec![10]);
}

#[test]
fn hook_may_publish() {
    init_tracing();
    let live = LiveData::builder(Arc::new(ManualExecutor::new()))
        .on_active(|live: &LiveData<&'static str>| live.set_now("warm"))
        .build();
    let rec = Recorder::new();
    live.observe_forever(ObserveOptions::new(), &Observer::new(rec.sink()));
    assert_eq!(rec.values(), vec!["warm"]);
}
