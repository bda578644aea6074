//! Versioned channel tables. The order of each schema's slice is the column
//! order the model was trained with.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    BlinkRate,
    LeftEyeOpenness,
    RightEyeOpenness,
    EyeAsymmetry,
    PupilDilation,
    BrowTension,
    JawTension,
    LipTension,
    CheekTension,
    MicroSmile,
    MicroFrown,
    MicroSurprise,
    HeadYaw,
    HeadPitch,
    HeadRoll,
    HeadStability,
    FacialSymmetry,
    SkinTone,
    BreathingRate,
    MouthOpenness,
    GameClicks,
    GameAccuracy,
    GameReaction,
    GameMistakes,
}

/// (source key, raw default, divisor, normalized min, normalized max)
type ChannelDef = (&'static str, f32, f32, f32, f32);

impl Channel {
    fn def(self) -> ChannelDef {
        use Channel::*;
        match self {
            BlinkRate => ("blinkRate", 15.0, 30.0, 0.0, 2.0),
            LeftEyeOpenness => ("leftEyeOpenness", 0.3, 1.0, 0.0, 1.0),
            RightEyeOpenness => ("rightEyeOpenness", 0.3, 1.0, 0.0, 1.0),
            EyeAsymmetry => ("eyeAsymmetry", 0.0, 1.0, 0.0, 1.0),
            PupilDilation => ("pupilDilation", 0.3, 1.0, 0.0, 1.0),
            BrowTension => ("browTension", 0.0, 1.0, 0.0, 1.0),
            JawTension => ("jawTension", 0.0, 1.0, 0.0, 1.0),
            LipTension => ("lipTension", 0.0, 1.0, 0.0, 1.0),
            CheekTension => ("cheekTension", 0.0, 1.0, 0.0, 1.0),
            MicroSmile => ("microSmile", 0.0, 1.0, 0.0, 1.0),
            MicroFrown => ("microFrown", 0.0, 1.0, 0.0, 1.0),
            MicroSurprise => ("microSurprise", 0.0, 1.0, 0.0, 1.0),
            // degrees
            HeadYaw => ("headYaw", 0.0, 100.0, -1.0, 1.0),
            HeadPitch => ("headPitch", 0.0, 100.0, -1.0, 1.0),
            HeadRoll => ("headRoll", 0.0, 180.0, -1.0, 1.0),
            HeadStability => ("headStability", 0.0, 20.0, 0.0, 2.0),
            FacialSymmetry => ("facialSymmetry", 1.0, 1.0, 0.0, 1.0),
            SkinTone => ("skinTone", 0.5, 1.0, 0.0, 1.0),
            BreathingRate => ("breathingRate", 16.0, 30.0, 0.0, 2.0),
            MouthOpenness => ("mouthOpenness", 0.0, 1.0, 0.0, 1.0),
            GameClicks => ("gameClicks", 0.0, 100.0, 0.0, 5.0),
            GameAccuracy => ("gameAccuracy", 0.0, 1.0, 0.0, 1.0),
            // milliseconds
            GameReaction => ("gameReaction", 0.0, 2000.0, 0.0, 5.0),
            GameMistakes => ("gameMistakes", 0.0, 20.0, 0.0, 5.0),
        }
    }

    /// Key in the raw metrics record
    pub fn key(self) -> &'static str {
        self.def().0
    }

    /// Neutral value substituted when the source omits the channel
    pub fn default_raw(self) -> f32 {
        self.def().1
    }

    pub fn scale(self) -> f32 {
        self.def().2
    }

    pub fn range(self) -> (f32, f32) {
        let (_, _, _, lo, hi) = self.def();
        (lo, hi)
    }

    /// Raw source value → clamped normalized value. Non-finite input falls back
    /// to the default.
    pub fn normalize(self, raw: f64) -> f32 {
        let raw = if raw.is_finite() {
            raw as f32
        } else {
            self.default_raw()
        };
        let (lo, hi) = self.range();
        (raw / self.scale()).clamp(lo, hi)
    }
}

const COMPACT: [Channel; 6] = [
    Channel::BlinkRate,
    Channel::LeftEyeOpenness,
    Channel::RightEyeOpenness,
    Channel::BrowTension,
    Channel::JawTension,
    Channel::HeadStability,
];

const ENHANCED: [Channel; 24] = [
    Channel::BlinkRate,
    Channel::LeftEyeOpenness,
    Channel::RightEyeOpenness,
    Channel::EyeAsymmetry,
    Channel::PupilDilation,
    Channel::BrowTension,
    Channel::JawTension,
    Channel::LipTension,
    Channel::CheekTension,
    Channel::MicroSmile,
    Channel::MicroFrown,
    Channel::MicroSurprise,
    Channel::HeadYaw,
    Channel::HeadPitch,
    Channel::HeadRoll,
    Channel::HeadStability,
    Channel::FacialSymmetry,
    Channel::SkinTone,
    Channel::BreathingRate,
    Channel::MouthOpenness,
    Channel::GameClicks,
    Channel::GameAccuracy,
    Channel::GameReaction,
    Channel::GameMistakes,
];

/// Closed set of channel layouts a model can be trained against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSchema {
    /// Six facial channels used by the lightweight model
    Compact,
    /// Full facial, head-pose and game-performance layout
    Enhanced,
}

impl FeatureSchema {
    pub fn channels(self) -> &'static [Channel] {
        match self {
            FeatureSchema::Compact => &COMPACT,
            FeatureSchema::Enhanced => &ENHANCED,
        }
    }

    pub fn arity(self) -> usize {
        self.channels().len()
    }

    pub fn position(self, channel: Channel) -> Option<usize> {
        self.channels().iter().position(|c| *c == channel)
    }
}
