//! Performance benchmarks for the media store.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use media_store::testing::{FakeMedia, FakeTextTrack, FakeTextTracks};
use media_store::{facade, MediaOwner, MediaState, MediaStore, Request, StoreConfig};
use std::sync::Arc;

fn create_store(media: &Arc<FakeMedia>) -> MediaStore {
    let media: Arc<dyn MediaOwner> = media.clone();
    MediaStore::new(StoreConfig {
        monitor_on_demand: false,
        media: Some(media),
        ..Default::default()
    })
}

fn subtitled_media(track_count: usize) -> Arc<FakeMedia> {
    let tracks = FakeTextTracks::new();
    for i in 0..track_count {
        tracks.add_track(FakeTextTrack::subtitles(&format!("l{i}"), &format!("Track {i}")));
    }
    FakeMedia::builder().duration(600.0).text_tracks(tracks).build()
}

/// Full facade evaluation, as done on every owner change
fn bench_snapshot_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_recompute");

    for track_count in [0, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("subtitle_tracks", track_count),
            &track_count,
            |b, &count| {
                let media = subtitled_media(count);
                let store = create_store(&media);
                let owners = store.owners();

                b.iter(|| {
                    black_box(facade::snapshot(&owners));
                });
            },
        );
    }

    group.finish();
}

/// Request through the facade, owner event, recompute and commit
fn bench_dispatch_round_trip(c: &mut Criterion) {
    let media = FakeMedia::with_duration(600.0);
    let store = create_store(&media);
    let mut time = 0.0;

    c.bench_function("dispatch_seek", |b| {
        b.iter(|| {
            time = (time + 1.0) % 600.0;
            store.dispatch(Request::Seek(black_box(time))).unwrap();
        });
    });
}

/// Publishing one change to many subscribers
fn bench_subscriber_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscriber_broadcast");

    for subscribers in [1, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &count| {
                let media = FakeMedia::with_duration(600.0);
                let store = create_store(&media);
                let handles: Vec<_> = (0..count)
                    .map(|_| {
                        store.subscribe(|state: &MediaState| {
                            black_box(state.current_time());
                        })
                    })
                    .collect();
                let mut muted = false;

                b.iter(|| {
                    muted = !muted;
                    media.set_muted(muted);
                });

                for handle in handles {
                    handle.unsubscribe();
                }
            },
        );
    }

    group.finish();
}

/// Cheap reads of the current snapshot
fn bench_get_state(c: &mut Criterion) {
    let media = FakeMedia::with_duration(600.0);
    let store = create_store(&media);

    c.bench_function("get_state", |b| {
        b.iter(|| {
            black_box(store.get_state().paused());
        });
    });
}

criterion_group!(
    benches,
    bench_snapshot_recompute,
    bench_dispatch_round_trip,
    bench_subscriber_broadcast,
    bench_get_state,
);

criterion_main!(benches);
