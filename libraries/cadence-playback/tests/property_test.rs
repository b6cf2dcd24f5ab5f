//! Property-based tests for queue policy, shuffle and level clamping
//!
//! Uses proptest to verify invariants across many random inputs.

use cadence_core::MediaItem;
use cadence_playback::levels::{
    clamp_rate, clamp_seek, clamp_volume, MAX_PLAYBACK_RATE, MAX_VOLUME, MIN_PLAYBACK_RATE,
    MIN_VOLUME,
};
use cadence_playback::queue::{clamp_index, end_of_track, next_index, previous_index, EndOfTrack};
use cadence_playback::shuffle::{restore_original, shuffle_keep_current};
use cadence_playback::RepeatMode;
use proptest::prelude::*;

// ===== Helpers =====

fn queue_of(len: usize) -> Vec<MediaItem> {
    (0..len)
        .map(|i| MediaItem::audio(format!("item-{}", i), format!("Item {}", i), format!("https://cdn.test/{}.mp3", i)))
        .collect()
}

fn arbitrary_repeat() -> impl Strategy<Value = RepeatMode> {
    prop_oneof![
        Just(RepeatMode::Off),
        Just(RepeatMode::All),
        Just(RepeatMode::One),
    ]
}

/// Queue length with an index inside it
fn queue_position() -> impl Strategy<Value = (usize, usize)> {
    (1usize..100).prop_flat_map(|len| (Just(len), 0..len))
}

// ===== Property Tests =====

proptest! {
    /// Property: shuffle pins the current item at 0 and keeps every item
    #[test]
    fn shuffle_keeps_current_and_all_items((len, current) in queue_position()) {
        let original = queue_of(len);
        let pinned = original[current].id.clone();

        let shuffled = shuffle_keep_current(original.clone(), current);

        prop_assert_eq!(shuffled.len(), len);
        prop_assert_eq!(&shuffled[0].id, &pinned);

        let mut before: Vec<_> = original.iter().map(|i| i.id.clone()).collect();
        let mut after: Vec<_> = shuffled.iter().map(|i| i.id.clone()).collect();
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
    }

    /// Property: restoring the original order finds the pinned item again
    #[test]
    fn restore_finds_pinned_item((len, current) in queue_position()) {
        let original = queue_of(len);
        let shuffled = shuffle_keep_current(original.clone(), current);

        let (restored, index) = restore_original(original.clone(), Some(&shuffled[0].id));

        prop_assert_eq!(restored, original);
        prop_assert_eq!(index, current);
    }

    /// Property: clamped start index is always in range
    #[test]
    fn clamped_index_in_range(len in 1usize..1000, index in any::<usize>()) {
        let clamped = clamp_index(len, index);
        prop_assert!(clamped < len);
        if index < len {
            prop_assert_eq!(clamped, index);
        }
    }

    /// Property: skip targets stay in range and previous undoes next
    #[test]
    fn skip_indices_in_range((len, current) in queue_position(), repeat in arbitrary_repeat()) {
        let previous = previous_index(len, current).unwrap();
        prop_assert!(previous < len);
        prop_assert_eq!(next_index(len, previous, RepeatMode::All), Some(current));

        match next_index(len, current, repeat) {
            Some(next) => {
                prop_assert!(next < len);
                prop_assert_eq!(previous_index(len, next), Some(current));
            }
            None => {
                prop_assert_eq!(repeat, RepeatMode::Off);
                prop_assert_eq!(current, len - 1);
            }
        }
    }

    /// Property: end of track only stops on the last item with repeat off
    #[test]
    fn end_of_track_policy((len, current) in queue_position(), repeat in arbitrary_repeat()) {
        match end_of_track(len, current, repeat) {
            EndOfTrack::Replay => prop_assert_eq!(repeat, RepeatMode::One),
            EndOfTrack::Stop => {
                prop_assert_eq!(repeat, RepeatMode::Off);
                prop_assert_eq!(current, len - 1);
            }
            EndOfTrack::Advance(next) => {
                prop_assert_ne!(repeat, RepeatMode::One);
                prop_assert!(next < len);
                prop_assert_eq!(next, (current + 1) % len);
            }
        }
    }

    /// Property: finite rates and volumes clamp into their ranges
    #[test]
    fn levels_clamp_into_range(rate in any::<f32>(), volume in any::<f32>()) {
        match clamp_rate(rate) {
            Some(r) => prop_assert!((MIN_PLAYBACK_RATE..=MAX_PLAYBACK_RATE).contains(&r)),
            None => prop_assert!(rate.is_nan()),
        }
        match clamp_volume(volume) {
            Some(v) => prop_assert!((MIN_VOLUME..=MAX_VOLUME).contains(&v)),
            None => prop_assert!(volume.is_nan()),
        }
    }

    /// Property: seek targets are never negative and keep valid positions
    #[test]
    fn seek_clamps_negative(position in any::<i64>()) {
        let clamped = clamp_seek(position);
        if position < 0 {
            prop_assert_eq!(clamped, 0);
        } else {
            prop_assert_eq!(clamped, position as u64);
        }
    }
}
