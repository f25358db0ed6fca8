//! Per-channel playback state.

/// Guest-visible channel states, as read from the state port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelState {
    #[default]
    Stopped = 0,
    Paused = 1,
    Playing = 2,
}

#[derive(Clone, Copy, Debug)]
pub struct Channel {
    /// Sound index this channel plays; −1 is the BIOS sound.
    pub assigned_sound: i32,
    pub state: ChannelState,
    /// Gain factor in [0, 8].
    pub volume: f32,
    /// Samples consumed per output sample, in [0, 128].
    pub speed: f32,
    pub loop_enabled: bool,
    /// Fractional read position within the assigned sound.
    pub position: f64,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            assigned_sound: -1,
            state: ChannelState::Stopped,
            volume: 1.0,
            speed: 1.0,
            loop_enabled: false,
            position: 0.0,
        }
    }
}

impl Channel {
    pub fn play(&mut self) {
        // resuming keeps the position, anything else starts over
        if self.state != ChannelState::Paused {
            self.position = 0.0;
        }
        self.state = ChannelState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == ChannelState::Playing {
            self.state = ChannelState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == ChannelState::Paused {
            self.state = ChannelState::Playing;
        }
    }

    pub fn stop(&mut self) {
        self.state = ChannelState::Stopped;
        self.position = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_transitions() {
        let mut channel = Channel::default();
        channel.position = 10.0;
        channel.play();
        assert_eq!(channel.state, ChannelState::Playing);
        assert_eq!(channel.position, 0.0);

        channel.position = 5.0;
        channel.pause();
        assert_eq!(channel.state, ChannelState::Paused);
        channel.resume();
        assert_eq!(channel.state, ChannelState::Playing);
        assert_eq!(channel.position, 5.0);

        // playing again from paused keeps the position too
        channel.pause();
        channel.play();
        assert_eq!(channel.position, 5.0);

        channel.stop();
        assert_eq!(channel.state, ChannelState::Stopped);
        assert_eq!(channel.position, 0.0);

        // pause and resume are no-ops on a stopped channel
        channel.pause();
        assert_eq!(channel.state, ChannelState::Stopped);
        channel.resume();
        assert_eq!(channel.state, ChannelState::Stopped);
    }
}
