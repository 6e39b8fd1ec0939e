//! Prebuilt voices offered for spoken replies

use serde::Serialize;

pub const DEFAULT_VOICE: &str = "Zephyr";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Voice {
    pub name: &'static str,
    pub description: &'static str,
    pub gender: &'static str,
}

pub const VOICES: &[Voice] = &[
    Voice {
        name: "Zephyr",
        description: "Warm and friendly",
        gender: "neutral",
    },
    Voice {
        name: "Puck",
        description: "Energetic and bright",
        gender: "neutral",
    },
    Voice {
        name: "Charon",
        description: "Deep and authoritative",
        gender: "neutral",
    },
    Voice {
        name: "Kore",
        description: "Gentle and calm",
        gender: "neutral",
    },
    Voice {
        name: "Fenrir",
        description: "Strong and clear",
        gender: "neutral",
    },
    Voice {
        name: "Aoede",
        description: "Melodic and soothing",
        gender: "neutral",
    },
];

/// Look up a voice by name, ignoring case
pub fn find_voice(name: &str) -> Option<&'static Voice> {
    VOICES.iter().find(|v| v.name.eq_ignore_ascii_case(name))
}
