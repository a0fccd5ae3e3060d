use clap::ValueEnum;

/// Vehicles a child can pick. Each one drives to its own riddle destination.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, ValueEnum, strum_macros::Display)]
pub enum Car {
    Ambulance,
    Bus,
    Mixer,
    Tank,
    PoliceCar,
    FireEngine,
}

impl Car {
    /// Grid order on the setup screen
    pub const ALL: [Car; 6] = [
        Car::Ambulance,
        Car::Bus,
        Car::Mixer,
        Car::Tank,
        Car::PoliceCar,
        Car::FireEngine,
    ];

    /// Stable id persisted under `selected_car`
    pub fn id(self) -> i64 {
        match self {
            Car::Ambulance => 0,
            Car::Bus => 1,
            Car::Mixer => 2,
            Car::Tank => 3,
            Car::PoliceCar => 4,
            Car::FireEngine => 5,
        }
    }

    pub fn from_id(id: i64) -> Option<Car> {
        Car::ALL.into_iter().find(|car| car.id() == id)
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Car::Ambulance => "🚑",
            Car::Bus => "🚌",
            Car::Mixer => "🚛",
            Car::Tank => "🚚",
            Car::PoliceCar => "🚓",
            Car::FireEngine => "🚒",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Car::Ambulance => "きゅうきゅうしゃ",
            Car::Bus => "バス",
            Car::Mixer => "ミキサーしゃ",
            Car::Tank => "タンクローリー",
            Car::PoliceCar => "パトカー",
            Car::FireEngine => "しょうぼうしゃ",
        }
    }

    pub fn destination(self) -> Destination {
        match self {
            Car::Bus => Destination {
                label: "なぞなぞえき",
                glyph: "🚉",
            },
            Car::Tank => Destination {
                label: "なぞなぞスタンド",
                glyph: "⛽",
            },
            Car::Ambulance => Destination {
                label: "なぞなぞびょういん",
                glyph: "🏥",
            },
            Car::Mixer => Destination {
                label: "なぞなぞこうじげんば",
                glyph: "🏗",
            },
            Car::PoliceCar => Destination {
                label: "なぞなぞこうばん",
                glyph: "🏤",
            },
            Car::FireEngine => Destination {
                label: "なぞなぞやま",
                glyph: "⛰",
            },
        }
    }
}

/// Where a car is heading
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Destination {
    pub label: &'static str,
    pub glyph: &'static str,
}
