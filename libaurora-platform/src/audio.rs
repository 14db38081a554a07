/// A voice/BGM mixer channel number. `u8` falls outside the integer widths
/// `libcommon`'s `newtype_num!` covers, so this one is hand-written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u8);

impl ChannelId {
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<u8> for ChannelId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<ChannelId> for u8 {
    fn from(value: ChannelId) -> Self {
        value.0
    }
}

/// The audio mixer collaborator. `WaitVoiceAction` (§4.4) polls
/// [`is_channel_finished`](AudioMixer::is_channel_finished) once per frame;
/// the lip-sync action polls [`mouth_openness`](AudioMixer::mouth_openness).
pub trait AudioMixer {
    fn play_voice(&mut self, channel: ChannelId, path: &str) -> anyhow::Result<()>;
    fn play_bgm(&mut self, path: &str, looped: bool) -> anyhow::Result<()>;
    fn stop(&mut self, channel: ChannelId);
    fn set_volume(&mut self, channel: ChannelId, volume: u8);
    fn is_channel_finished(&self, channel: ChannelId) -> bool;

    /// A coarse 0..=255 "mouth openness" sample for the given channel's
    /// current playback position, used by `LipsAnimationAction`.
    fn mouth_openness(&self, channel: ChannelId) -> u8 {
        let _ = channel;
        0
    }
}

#[derive(Debug, Default)]
pub struct NullAudioMixer {
    finished: std::collections::HashSet<ChannelId>,
}

impl NullAudioMixer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: mark a channel as having finished playback this frame.
    pub fn finish(&mut self, channel: ChannelId) {
        self.finished.insert(channel);
    }
}

impl AudioMixer for NullAudioMixer {
    fn play_voice(&mut self, channel: ChannelId, _path: &str) -> anyhow::Result<()> {
        self.finished.remove(&channel);
        Ok(())
    }

    fn play_bgm(&mut self, _path: &str, _looped: bool) -> anyhow::Result<()> {
        Ok(())
    }

    fn stop(&mut self, channel: ChannelId) {
        self.finished.insert(channel);
    }

    fn set_volume(&mut self, _channel: ChannelId, _volume: u8) {}

    fn is_channel_finished(&self, channel: ChannelId) -> bool {
        self.finished.contains(&channel)
    }
}
