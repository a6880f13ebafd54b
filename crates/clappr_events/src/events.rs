//! Event taxonomy
//!
//! Each emitter level has its own set of names. The wire strings are what
//! ends up in the bus, so a host can still subscribe with plain `&str`.

use crate::event_names;

event_names! {
    /// Player level events, also emitted by playbacks.
    pub enum Event {
        Playing => "playing",
        DidPause => "didPause",
        DidStop => "didStop",
        DidComplete => "didComplete",
        Ready => "ready",
        Error => "error",
        RequestFullscreen => "requestFullscreen",
        ExitFullscreen => "exitFullscreen",
        Stalled => "stalled",
        TimeUpdated => "timeUpdated",
        BufferUpdate => "bufferUpdate",
        DidSeek => "didSeek",
        DidSelectSubtitle => "didSelectSubtitle",
        DidSelectAudio => "didSelectAudio",
        WillUpdatePoster => "willUpdatePoster",
        DidUpdatePoster => "didUpdatePoster",
        RequestPosterUpdate => "requestPosterUpdate",
    }
}

event_names! {
    /// Events emitted by the core.
    pub enum CoreEvent {
        EnterFullscreen => "enterFullscreen",
        ExitFullscreen => "exitFullscreen",
    }
}

event_names! {
    /// Events emitted by a container, mostly forwarded from its playback.
    pub enum ContainerEvent {
        Play => "play",
        Ready => "ready",
        Ended => "ended",
        Error => "error",
        Stop => "stop",
        Pause => "pause",
        Stalled => "stalled",
        TimeUpdated => "timeUpdated",
        MediaControlEnabled => "mediaControlEnabled",
        MediaControlDisabled => "mediaControlDisabled",
    }
}

event_names! {
    /// Events emitted by the media control.
    pub enum MediaControlEvent {
        Playing => "playing",
        NotPlaying => "notPlaying",
        FullscreenEnter => "fullscreenEnter",
        FullscreenExit => "fullscreenExit",
        Show => "show",
        Hide => "hide",
    }
}

event_names! {
    /// Lifecycle events used between the core's own components.
    pub enum InternalEvent {
        DidChangePlayback => "didChangePlayback",
        DidChangeActiveContainer => "didChangeActiveContainer",
        WillEnterFullscreen => "willEnterFullscreen",
        DidEnterFullscreen => "didEnterFullscreen",
        WillExitFullscreen => "willExitFullscreen",
        DidExitFullscreen => "didExitFullscreen",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_wire_names_are_unique_per_level() {
        fn assert_unique(names: impl Iterator<Item = &'static str>) {
            let names: Vec<_> = names.collect();
            let set: HashSet<_> = names.iter().collect();
            assert_eq!(set.len(), names.len());
        }

        assert_unique(Event::ALL.iter().map(Event::as_str));
        assert_unique(CoreEvent::ALL.iter().map(CoreEvent::as_str));
        assert_unique(ContainerEvent::ALL.iter().map(ContainerEvent::as_str));
        assert_unique(MediaControlEvent::ALL.iter().map(MediaControlEvent::as_str));
        assert_unique(InternalEvent::ALL.iter().map(InternalEvent::as_str));
    }

    #[test]
    fn test_lookup_by_wire_name() {
        assert_eq!(Event::from_name("didComplete"), Some(Event::DidComplete));
        assert_eq!(ContainerEvent::from_name("ended"), Some(ContainerEvent::Ended));
        assert_eq!(MediaControlEvent::from_name("notPlaying"), Some(MediaControlEvent::NotPlaying));
        assert_eq!(InternalEvent::from_name("nope"), None);
        assert_eq!(CoreEvent::EnterFullscreen.to_string(), "enterFullscreen");
    }
}
