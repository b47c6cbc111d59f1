use serde::{Deserialize, Serialize};

use crate::constants::{FRONT_MAX_LAYER, MIDDLE_MAX_LAYER, TOP_FRONT_MAX_LAYER};

pub type SeatId = i64;

/// Left/right grouping within a layer, separated by an aisle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parse a stored side. Anything other than left/right means "no side".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Structural category of a seat. Governs proximity matching and location bands.
/// Unknown strings deserialize as `Regular`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum SeatType {
    RegularTop,
    PerpendicularFront,
    RegularBottom,
    #[default]
    Regular,
    Perpendicular,
}

impl SeatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegularTop => "regular_top",
            Self::PerpendicularFront => "perpendicular_front",
            Self::RegularBottom => "regular_bottom",
            Self::Regular => "regular",
            Self::Perpendicular => "perpendicular",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "regular_top" => Self::RegularTop,
            "perpendicular_front" => Self::PerpendicularFront,
            "regular_bottom" => Self::RegularBottom,
            "perpendicular" | "perpendicular_back" => Self::Perpendicular,
            _ => Self::Regular,
        }
    }
}

impl From<String> for SeatType {
    fn from(s: String) -> Self {
        Self::from_str_lossy(&s)
    }
}

/// Coarse front/middle/back section of the venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Front,
    Middle,
    Back,
}

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Middle => "middle",
            Self::Back => "back",
        }
    }
}

/// A seat record as supplied by the catalog. Read-only to this crate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    pub id: SeatId,
    pub layer: i64,
    #[serde(default)]
    pub side: Option<Side>,
    pub position: i64,
    #[serde(default)]
    pub seat_type: SeatType,
    pub price: f64,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub has_ac: bool,
    #[serde(default = "default_view_quality")]
    pub view_quality: u8,
    /// Historical-figure association, if the seat has one.
    #[serde(default, alias = "famous_occupant")]
    pub famous_note: Option<String>,
}

fn default_available() -> bool {
    true
}

fn default_view_quality() -> u8 {
    5
}

impl Seat {
    pub fn is_famous(&self) -> bool {
        self.famous_note.is_some()
    }

    /// Derived front/middle/back band.
    pub fn band(&self) -> Band {
        match self.seat_type {
            SeatType::PerpendicularFront => Band::Front,
            SeatType::RegularTop if self.layer <= TOP_FRONT_MAX_LAYER => Band::Front,
            SeatType::RegularTop => Band::Middle,
            SeatType::RegularBottom => Band::Back,
            SeatType::Regular | SeatType::Perpendicular => {
                if self.layer <= FRONT_MAX_LAYER {
                    Band::Front
                } else if self.layer <= MIDDLE_MAX_LAYER {
                    Band::Middle
                } else {
                    Band::Back
                }
            }
        }
    }

    /// Human-readable label, e.g. "Seat #12 - Layer 3, left, Position 4".
    pub fn label(&self) -> String {
        match self.side {
            Some(side) => format!(
                "Seat #{} - Layer {}, {}, Position {}",
                self.id,
                self.layer,
                side.as_str(),
                self.position
            ),
            None => format!(
                "Seat #{} - Layer {}, Position {}",
                self.id, self.layer, self.position
            ),
        }
    }
}

/// A booking record, used only to resolve customers for proximity search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub customer_name: String,
    pub email: String,
    pub seat_id: SeatId,
    pub price: f64,
}
