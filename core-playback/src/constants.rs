//! Named integer constants published to hosts.
//!
//! Older hosts pass capabilities and rating types as these integers and
//! compare playback states against them.

use bridge_traits::{Capability, PlaybackState, RatingType};
use std::collections::BTreeMap;

const STATES: [(&str, PlaybackState); 5] = [
    ("STATE_NONE", PlaybackState::None),
    ("STATE_PLAYING", PlaybackState::Playing),
    ("STATE_PAUSED", PlaybackState::Paused),
    ("STATE_STOPPED", PlaybackState::Stopped),
    ("STATE_BUFFERING", PlaybackState::Buffering),
];

/// Every published constant by name.
pub fn compatibility_table() -> BTreeMap<&'static str, i64> {
    let mut table = BTreeMap::new();
    for capability in Capability::ALL {
        table.insert(capability.constant_name(), capability.as_code());
    }
    for (name, state) in STATES {
        table.insert(name, state.as_code());
    }
    for rating in RatingType::ALL {
        table.insert(rating.constant_name(), rating.as_code());
    }
    table
}
