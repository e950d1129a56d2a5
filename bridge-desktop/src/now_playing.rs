//! Now-playing sink that only logs.

use bridge_traits::{
    now_playing::{MediaSessionOptions, NowPlayingSink},
    playback::{LaneId, MediaItem, PlaybackState},
};
use tracing::debug;

/// Desktop hosts without a media-session integration get a sink that records
/// the transitions in the log and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNowPlaying;

impl NowPlayingSink for TracingNowPlaying {
    fn set_foreground(&self, foreground: bool, keep_notification: bool) {
        debug!(foreground, keep_notification, "Now playing foreground changed");
    }

    fn update_metadata(&self, lane: LaneId, item: &MediaItem) {
        debug!(
            lane,
            track_id = %item.id,
            title = item.metadata.title.as_deref().unwrap_or(""),
            "Now playing metadata updated"
        );
    }

    fn update_playback(&self, lane: LaneId, state: PlaybackState) {
        debug!(lane, ?state, "Now playing state updated");
    }

    fn update_options(&self, options: &MediaSessionOptions) {
        debug!(
            capabilities = options.capabilities.len(),
            stop_with_app = options.stop_with_app,
            "Now playing options updated"
        );
    }

    fn remove_notifications(&self) {
        debug!("Now playing notifications removed");
    }
}
