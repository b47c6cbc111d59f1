//! Catalog snapshot and its JSON exchange format.
//!
//! A snapshot is what every request scores against: all seats plus the
//! bookings used for customer lookup. `reference_venue` builds the default
//! 250-seat layout with its climate, view and history attributes.

use serde::{Deserialize, Serialize};

use crate::constants::{CENTER_POSITIONS, SEATS_PER_ROW};
use crate::seat::{Booking, Seat, SeatId, SeatType, Side};

pub const CATALOG_VERSION: u32 = 1;

fn current_version() -> u32 {
    CATALOG_VERSION
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default = "current_version")]
    pub version: u32,
    pub seats: Vec<Seat>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

impl Catalog {
    pub fn new(seats: Vec<Seat>, bookings: Vec<Booking>) -> Self {
        Self {
            version: CATALOG_VERSION,
            seats,
            bookings,
        }
    }

    pub fn seat(&self, id: SeatId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == id)
    }

    pub fn available_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_available).count()
    }
}

pub fn import_json(json: &str) -> Result<Catalog, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn export_json(catalog: &Catalog) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(catalog)
}

/// Seats at (layer, side, position) with a recorded historical occupant.
const FAMOUS_SEATS: &[(i64, Option<Side>, i64, &str)] = &[
    (6, None, 5, "A Nobel Prize laureate sat here during the 2019 ceremony"),
    (6, None, 6, "A world-renowned conductor occupied this seat for opening night"),
    (7, None, 1, "The venue's founder preferred this seat for important performances"),
    (7, None, 8, "An Olympic gold medalist watched the finals from here"),
    (8, None, 4, "A famous film director was known to choose this location"),
    (1, Some(Side::Left), 3, "A bestselling author sat here during the literary festival"),
    (1, Some(Side::Right), 7, "The mayor attended the inaugural event in this seat"),
    (2, Some(Side::Left), 5, "A tech entrepreneur regularly attends from this location"),
    (2, Some(Side::Right), 2, "A celebrated artist chose this seat for the gallery opening"),
    (3, Some(Side::Left), 9, "A renowned architect frequented this spot"),
    (11, Some(Side::Left), 4, "A legendary performer watched from this seat"),
    (11, Some(Side::Right), 6, "The venue's founding patron sat here for 40 years"),
    (12, Some(Side::Left), 1, "An inspiring educator who mentored thousands occupied this seat"),
];

fn layer_price(layer: i64) -> f64 {
    match layer {
        1 | 15 => 600.0,
        2 | 14 => 550.0,
        3 | 13 | 6 => 500.0,
        4 | 12 => 450.0,
        5 | 7 | 11 => 400.0,
        8 => 300.0,
        9 => 200.0,
        _ => 150.0,
    }
}

fn layout_has_ac(seat_type: SeatType, layer: i64, position: i64) -> bool {
    match seat_type {
        SeatType::PerpendicularFront => true,
        SeatType::RegularTop => layer <= 3 || (layer == 4 && position <= 5),
        SeatType::RegularBottom => layer >= 12,
        SeatType::Regular | SeatType::Perpendicular => false,
    }
}

fn layout_view_quality(seat_type: SeatType, layer: i64, position: i64) -> u8 {
    let centered = (CENTER_POSITIONS.0..=CENTER_POSITIONS.1).contains(&position);
    let quality = match seat_type {
        SeatType::PerpendicularFront => match layer {
            6 => 10,
            7 => 9,
            8 => 8,
            _ => 7,
        },
        SeatType::RegularTop => 8 - (layer - 1) + i64::from(centered),
        SeatType::RegularBottom => 7 - (layer - 11) + i64::from(centered),
        SeatType::Regular | SeatType::Perpendicular => 5,
    };
    quality.clamp(1, 10) as u8
}

fn famous_note(layer: i64, side: Option<Side>, position: i64) -> Option<String> {
    FAMOUS_SEATS
        .iter()
        .find(|(l, s, p, _)| *l == layer && *s == side && *p == position)
        .map(|(_, _, _, note)| note.to_string())
}

/// The default venue: regular_top layers 1-5 and regular_bottom layers
/// 11-15 split left/right, perpendicular_front layers 6-10 without sides,
/// ten positions each. Ids are assigned in layout order from 1.
pub fn reference_venue() -> Vec<Seat> {
    let mut blocks: Vec<(SeatType, i64, Option<Side>)> = Vec::new();
    for layer in 1..=5 {
        for side in [Side::Left, Side::Right] {
            blocks.push((SeatType::RegularTop, layer, Some(side)));
        }
    }
    for layer in 6..=10 {
        blocks.push((SeatType::PerpendicularFront, layer, None));
    }
    for layer in 11..=15 {
        for side in [Side::Left, Side::Right] {
            blocks.push((SeatType::RegularBottom, layer, Some(side)));
        }
    }

    let mut seats = Vec::with_capacity(blocks.len() * SEATS_PER_ROW as usize);
    for (seat_type, layer, side) in blocks {
        for position in 1..=SEATS_PER_ROW {
            seats.push(Seat {
                id: seats.len() as SeatId + 1,
                layer,
                side,
                position,
                seat_type,
                price: layer_price(layer),
                is_available: true,
                has_ac: layout_has_ac(seat_type, layer, position),
                view_quality: layout_view_quality(seat_type, layer, position),
                famous_note: famous_note(layer, side, position),
            });
        }
    }
    seats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seat::Band;

    #[test]
    fn test_reference_venue_shape() {
        let seats = reference_venue();
        assert_eq!(seats.len(), 250);
        assert_eq!(seats.first().unwrap().id, 1);
        assert_eq!(seats.last().unwrap().id, 250);
        let count = |t: SeatType| seats.iter().filter(|s| s.seat_type == t).count();
        assert_eq!(count(SeatType::RegularTop), 100);
        assert_eq!(count(SeatType::PerpendicularFront), 50);
        assert_eq!(count(SeatType::RegularBottom), 100);
        assert_eq!(seats.iter().filter(|s| s.is_famous()).count(), FAMOUS_SEATS.len());
    }

    #[test]
    fn test_reference_venue_attributes() {
        let seats = reference_venue();
        let find = |layer: i64, side: Option<Side>, position: i64| {
            seats
                .iter()
                .find(|s| s.layer == layer && s.side == side && s.position == position)
                .unwrap()
        };

        let front_row = find(6, None, 5);
        assert_eq!(front_row.view_quality, 10);
        assert!(front_row.has_ac);
        assert!(front_row.is_famous());
        assert_eq!(front_row.price, 500.0);
        assert_eq!(front_row.band(), Band::Front);

        let top_center = find(1, Some(Side::Left), 5);
        assert_eq!(top_center.view_quality, 9);
        assert_eq!(top_center.price, 600.0);

        assert!(find(4, Some(Side::Right), 5).has_ac);
        assert!(!find(4, Some(Side::Right), 6).has_ac);
        assert!(!find(11, Some(Side::Left), 1).has_ac);
        assert!(find(12, Some(Side::Left), 1).has_ac);
        assert_eq!(find(15, Some(Side::Right), 1).view_quality, 3);
        assert_eq!(find(10, None, 1).price, 150.0);
    }

    #[test]
    fn test_json_exchange() {
        let catalog = Catalog::new(reference_venue(), Vec::new());
        let json = export_json(&catalog).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back, catalog);
    }

    #[test]
    fn test_import_defaults_version_and_bookings() {
        let catalog = import_json(r#"{"seats":[{"id":1,"layer":1,"position":1,"price":99.5}]}"#)
            .unwrap();
        assert_eq!(catalog.version, CATALOG_VERSION);
        assert!(catalog.bookings.is_empty());
        assert_eq!(catalog.available_count(), 1);
        assert!(catalog.seat(1).is_some());
    }

    #[test]
    fn test_import_unknown_seat_type_loads_as_regular() {
        let catalog = import_json(
            r#"{"seats":[
                {"id":1,"layer":1,"position":1,"price":120.0,"seat_type":"balcony"},
                {"id":2,"layer":1,"position":2,"price":120.0,"seat_type":"perpendicular_back"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(catalog.seat(1).unwrap().seat_type, SeatType::Regular);
        assert_eq!(catalog.seat(2).unwrap().seat_type, SeatType::Perpendicular);
    }
}
