//! Controller driving the clock adapters end to end

use cadence_backends::{clock_adapters, MediaInfo, StaticProbe};
use cadence_core::MediaItem;
use cadence_playback::{PlaybackConfig, PlayerController, PlayerEvent, RepeatMode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const AUDIO: &str = "https://cdn.test/intro.mp3";
const VIDEO: &str = "https://cdn.test/clip.mp4";

fn queue() -> Vec<MediaItem> {
    vec![
        MediaItem::audio("intro", "Intro", AUDIO),
        MediaItem::video("clip", "Clip", VIDEO),
    ]
}

fn probe() -> StaticProbe {
    StaticProbe::new()
        .with(AUDIO, MediaInfo::audio(2_000))
        .with(VIDEO, MediaInfo::video(3_000, 1920, 1080))
}

async fn next_matching(
    rx: &mut broadcast::Receiver<PlayerEvent>,
    pred: impl Fn(&PlayerEvent) -> bool,
) -> PlayerEvent {
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            let event = rx.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn plays_through_mixed_queue() {
    let player = PlayerController::spawn(PlaybackConfig::default(), clock_adapters(Arc::new(probe())));
    let mut events = player.events();

    player.play_queue(queue(), 0).await.unwrap();
    assert_eq!(player.state().duration_ms, 2_000);

    let ready = next_matching(&mut events, |e| matches!(e, PlayerEvent::VideoReady { .. })).await;
    assert_eq!(
        ready,
        PlayerEvent::VideoReady {
            item_id: "clip".into(),
            width: 1920,
            height: 1080,
        }
    );

    next_matching(&mut events, |e| *e == PlayerEvent::QueueEnded).await;
    let state = player.state();
    assert_eq!(state.current_index, 1);
    assert!(!state.is_playing);
    assert_eq!(state.position_ms, 3_000);
}

#[tokio::test(start_paused = true)]
async fn repeat_all_wraps_to_first_item() {
    let player = PlayerController::spawn(PlaybackConfig::default(), clock_adapters(Arc::new(probe())));
    let mut events = player.events();

    player.set_repeat_mode(RepeatMode::All).await.unwrap();
    player.play_queue(queue(), 1).await.unwrap();

    let changed = next_matching(&mut events, |e| {
        matches!(e, PlayerEvent::ItemChanged { previous_item_id: Some(_), .. })
    })
    .await;
    assert_eq!(
        changed,
        PlayerEvent::ItemChanged {
            item_id: "intro".into(),
            previous_item_id: Some("clip".into()),
        }
    );
    assert_eq!(player.state().current_index, 0);
}

#[tokio::test(start_paused = true)]
async fn unknown_media_fails_load() {
    let player = PlayerController::spawn(PlaybackConfig::default(), clock_adapters(Arc::new(probe())));

    let result = player
        .play_queue(vec![MediaItem::audio("x", "Missing", "https://cdn.test/x.mp3")], 0)
        .await;

    assert!(result.is_err());
    assert!(player.state().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rate_speeds_up_position() {
    let player = PlayerController::spawn(PlaybackConfig::default(), clock_adapters(Arc::new(probe())));
    player.set_playback_rate(2.0).await.unwrap();
    player
        .play_queue(vec![MediaItem::audio("intro", "Intro", AUDIO)], 0)
        .await
        .unwrap();
    let mut events = player.events();

    let start = tokio::time::Instant::now();
    next_matching(&mut events, |e| *e == PlayerEvent::QueueEnded).await;

    // 2s of media at double speed, noticed on the next 500ms poll
    assert!(start.elapsed() <= Duration::from_millis(1_500));
}
