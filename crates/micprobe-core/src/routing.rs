//! Channel routing between a mono stimulus and stereo hardware buffers.
//!
//! Output side: [`pan`] replicates a mono stimulus onto two channels and mutes
//! the channel the [`ChannelMode`] does not select.
//!
//! Input side: [`extract`] picks the analysis channel out of a captured
//! multi-channel buffer. Stereo mode passes the capture through untouched;
//! downstream analysis then reads channel 0 by convention.

use crate::Signal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which physical channel carries (output) or receives (input) the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    /// Channel 0.
    #[default]
    Left,
    /// Channel 1.
    Right,
    /// Both channels (also accepted as "center").
    #[serde(alias = "center")]
    Stereo,
}

impl ChannelMode {
    /// Channel index selected by this mode, or `None` for stereo.
    pub fn channel_index(self) -> Option<usize> {
        match self {
            ChannelMode::Left => Some(0),
            ChannelMode::Right => Some(1),
            ChannelMode::Stereo => None,
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelMode::Left => "left",
            ChannelMode::Right => "right",
            ChannelMode::Stereo => "stereo",
        };
        f.write_str(name)
    }
}

impl FromStr for ChannelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(ChannelMode::Left),
            "right" | "r" => Ok(ChannelMode::Right),
            "stereo" | "center" | "both" => Ok(ChannelMode::Stereo),
            other => Err(format!(
                "unknown channel mode '{other}' (expected left, right or stereo)"
            )),
        }
    }
}

/// Spread a mono signal onto two channels, muting the unselected one.
///
/// Multi-channel input is reduced to its first channel before panning.
pub fn pan(mono: &Signal, mode: ChannelMode) -> Signal {
    let source = if mono.channels() == 1 {
        mono.samples().to_vec()
    } else {
        mono.channel(0).unwrap_or_default()
    };

    let (left_gain, right_gain) = match mode {
        ChannelMode::Left => (1.0, 0.0),
        ChannelMode::Right => (0.0, 1.0),
        ChannelMode::Stereo => (1.0, 1.0),
    };

    let mut interleaved = Vec::with_capacity(source.len() * 2);
    for sample in source {
        interleaved.push(sample * left_gain);
        interleaved.push(sample * right_gain);
    }

    Signal::from_parts(interleaved, 2, mono.sample_rate())
}

/// Select the analysis channel from a captured buffer.
///
/// A missing right channel falls back to channel 0. Stereo mode returns the
/// capture unchanged.
pub fn extract(captured: &Signal, mode: ChannelMode) -> Signal {
    let Some(index) = mode.channel_index() else {
        return captured.clone();
    };
    if captured.channels() == 1 {
        return captured.clone();
    }

    let channel = captured
        .channel(index)
        .or_else(|| captured.channel(0))
        .unwrap_or_default();

    Signal::from_parts(channel, 1, captured.sample_rate())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Signal {
        Signal::mono(vec![0.1, 0.2, 0.3, 0.4], 48000).unwrap()
    }

    #[test]
    fn pan_left_mutes_right_channel() {
        let stereo = pan(&ramp(), ChannelMode::Left);
        assert_eq!(stereo.channels(), 2);
        assert_eq!(stereo.channel(0).unwrap(), vec![0.1, 0.2, 0.3, 0.4]);
        assert!(stereo.channel(1).unwrap().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn pan_right_mutes_left_channel() {
        let stereo = pan(&ramp(), ChannelMode::Right);
        assert!(stereo.channel(0).unwrap().iter().all(|&s| s == 0.0));
        assert_eq!(stereo.channel(1).unwrap(), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn pan_stereo_feeds_both_channels() {
        let stereo = pan(&ramp(), ChannelMode::Stereo);
        assert_eq!(stereo.channel(0), stereo.channel(1));
    }

    #[test]
    fn extract_right_from_mono_falls_back_to_channel_zero() {
        let mono = ramp();
        let out = extract(&mono, ChannelMode::Right);
        assert_eq!(out.samples(), mono.samples());
    }

    #[test]
    fn extract_stereo_passes_through() {
        let stereo = pan(&ramp(), ChannelMode::Left);
        let out = extract(&stereo, ChannelMode::Stereo);
        assert_eq!(out, stereo);
    }

    #[test]
    fn extract_right_from_three_channels() {
        let captured = Signal::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 48000).unwrap();
        let out = extract(&captured, ChannelMode::Right);
        assert_eq!(out.samples(), &[2.0, 5.0]);
    }

    #[test]
    fn channel_mode_parses_aliases() {
        assert_eq!("center".parse::<ChannelMode>(), Ok(ChannelMode::Stereo));
        assert_eq!("R".parse::<ChannelMode>(), Ok(ChannelMode::Right));
        assert!("surround".parse::<ChannelMode>().is_err());
    }

    #[test]
    fn channel_mode_display_roundtrips() {
        for mode in [ChannelMode::Left, ChannelMode::Right, ChannelMode::Stereo] {
            assert_eq!(mode.to_string().parse::<ChannelMode>(), Ok(mode));
        }
    }
}
