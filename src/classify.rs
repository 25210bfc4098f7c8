//! Pure mapping from raw backend labels to display metadata.
//!
//! The classification backend reports YAMNet display names (for example
//! "Smoke detector, smoke alarm"). Alerting UI wants a short name, a
//! category for color/priority, and an icon reference. Matching is by
//! case-insensitive keyword lookup with an unknown fallback; no I/O, no
//! state.

use serde::Serialize;

/// Alert category of a detected sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCategory {
    Emergency,
    Household,
    Nature,
    Music,
    Speech,
    Vehicle,
    Unknown,
}

impl SoundCategory {
    /// Accent color used by alerting UI
    pub fn color(&self) -> &'static str {
        match self {
            SoundCategory::Emergency => "#FF4444",
            SoundCategory::Household => "#FF8800",
            SoundCategory::Nature => "#44AA44",
            SoundCategory::Music => "#8844FF",
            SoundCategory::Speech => "#4488FF",
            SoundCategory::Vehicle => "#FF4488",
            SoundCategory::Unknown => "#888888",
        }
    }

    /// Emergency sounds warrant an interrupting alert
    pub fn is_emergency(&self) -> bool {
        matches!(self, SoundCategory::Emergency)
    }
}

/// Display metadata for one detected sound
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoundInfo {
    pub display_name: &'static str,
    pub category: SoundCategory,
    /// Asset reference for the alert animation/icon
    pub icon: &'static str,
}

/// Keyword table: first row whose keyword appears in the lowercased label
/// wins, so more specific entries come before broader ones.
const SOUND_TABLE: &[(&str, SoundInfo)] = &[
    (
        "siren",
        SoundInfo {
            display_name: "Siren",
            category: SoundCategory::Emergency,
            icon: "siren",
        },
    ),
    (
        "smoke",
        SoundInfo {
            display_name: "Smoke Alarm",
            category: SoundCategory::Emergency,
            icon: "smoke-alarm",
        },
    ),
    (
        "fire alarm",
        SoundInfo {
            display_name: "Fire Alarm",
            category: SoundCategory::Emergency,
            icon: "fire-alarm",
        },
    ),
    (
        "alarm",
        SoundInfo {
            display_name: "Alarm",
            category: SoundCategory::Emergency,
            icon: "alarm",
        },
    ),
    (
        "car horn",
        SoundInfo {
            display_name: "Car Horn",
            category: SoundCategory::Vehicle,
            icon: "car-horn",
        },
    ),
    (
        "honk",
        SoundInfo {
            display_name: "Car Horn",
            category: SoundCategory::Vehicle,
            icon: "car-horn",
        },
    ),
    (
        "vehicle",
        SoundInfo {
            display_name: "Vehicle",
            category: SoundCategory::Vehicle,
            icon: "vehicle",
        },
    ),
    (
        "doorbell",
        SoundInfo {
            display_name: "Doorbell",
            category: SoundCategory::Household,
            icon: "doorbell",
        },
    ),
    (
        "knock",
        SoundInfo {
            display_name: "Knocking",
            category: SoundCategory::Household,
            icon: "knock",
        },
    ),
    (
        "telephone",
        SoundInfo {
            display_name: "Phone Ringing",
            category: SoundCategory::Household,
            icon: "phone",
        },
    ),
    (
        "microwave",
        SoundInfo {
            display_name: "Microwave",
            category: SoundCategory::Household,
            icon: "microwave",
        },
    ),
    (
        "vacuum",
        SoundInfo {
            display_name: "Vacuum Cleaner",
            category: SoundCategory::Household,
            icon: "vacuum",
        },
    ),
    (
        "dog",
        SoundInfo {
            display_name: "Dog Barking",
            category: SoundCategory::Nature,
            icon: "dog",
        },
    ),
    (
        "cat",
        SoundInfo {
            display_name: "Cat",
            category: SoundCategory::Nature,
            icon: "cat",
        },
    ),
    (
        "bird",
        SoundInfo {
            display_name: "Bird",
            category: SoundCategory::Nature,
            icon: "bird",
        },
    ),
    (
        "thunder",
        SoundInfo {
            display_name: "Thunder",
            category: SoundCategory::Nature,
            icon: "thunder",
        },
    ),
    (
        "water",
        SoundInfo {
            display_name: "Running Water",
            category: SoundCategory::Household,
            icon: "water",
        },
    ),
    (
        "music",
        SoundInfo {
            display_name: "Music",
            category: SoundCategory::Music,
            icon: "music",
        },
    ),
    (
        "singing",
        SoundInfo {
            display_name: "Singing",
            category: SoundCategory::Music,
            icon: "music",
        },
    ),
    (
        "speech",
        SoundInfo {
            display_name: "Speech",
            category: SoundCategory::Speech,
            icon: "speech",
        },
    ),
    (
        "shout",
        SoundInfo {
            display_name: "Shouting",
            category: SoundCategory::Speech,
            icon: "shout",
        },
    ),
    (
        "baby",
        SoundInfo {
            display_name: "Baby Crying",
            category: SoundCategory::Household,
            icon: "baby",
        },
    ),
];

const UNKNOWN_SOUND: SoundInfo = SoundInfo {
    display_name: "Unknown Sound",
    category: SoundCategory::Unknown,
    icon: "unknown",
};

/// Map a raw backend label to display metadata
pub fn classify_label(label: &str) -> SoundInfo {
    let lower = label.to_lowercase();
    SOUND_TABLE
        .iter()
        .find(|(keyword, _)| lower.contains(*keyword))
        .map(|(_, info)| info.clone())
        .unwrap_or(UNKNOWN_SOUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn siren_maps_to_emergency() {
        let info = classify_label("Police car (siren)");
        assert_eq!(info.category, SoundCategory::Emergency);
        assert_eq!(info.display_name, "Siren");
        assert!(info.category.is_emergency());
    }

    #[test]
    fn smoke_alarm_beats_generic_alarm() {
        let info = classify_label("Smoke detector, smoke alarm");
        assert_eq!(info.display_name, "Smoke Alarm");
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify_label("DOORBELL").display_name, "Doorbell");
    }

    #[test]
    fn unmatched_label_falls_back_to_unknown() {
        let info = classify_label("Didgeridoo");
        assert_eq!(info.category, SoundCategory::Unknown);
        assert_eq!(info.display_name, "Unknown Sound");
        assert!(!info.category.is_emergency());
    }

    #[test]
    fn every_category_has_a_color() {
        for category in [
            SoundCategory::Emergency,
            SoundCategory::Household,
            SoundCategory::Nature,
            SoundCategory::Music,
            SoundCategory::Speech,
            SoundCategory::Vehicle,
            SoundCategory::Unknown,
        ] {
            assert!(category.color().starts_with('#'));
        }
    }
}
