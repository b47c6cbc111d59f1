//! Proximity search around a reference seat, optionally resolved from a
//! customer's booking.

use serde::{Deserialize, Serialize};

use crate::seat::{Booking, Seat, SeatId};

/// An available seat near the reference, with its Manhattan distance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NearbySeat {
    #[serde(flatten)]
    pub seat: Seat,
    pub distance: i64,
}

/// Grid distance between two seats: |Δlayer| + |Δposition|.
pub fn distance(a: &Seat, b: &Seat) -> i64 {
    (a.layer - b.layer).abs() + (a.position - b.position).abs()
}

/// Available seats of the same type (and side, when the reference has one)
/// within `max_distance` on both axes, closest first, ties broken by id.
pub fn find_nearby(
    reference: &Seat,
    seats: &[Seat],
    max_distance: i64,
    limit: usize,
) -> Vec<NearbySeat> {
    let mut nearby: Vec<NearbySeat> = seats
        .iter()
        .filter(|s| s.is_available && s.id != reference.id)
        .filter(|s| s.seat_type == reference.seat_type)
        .filter(|s| reference.side.is_none() || s.side == reference.side)
        .filter(|s| {
            (s.layer - reference.layer).abs() <= max_distance
                && (s.position - reference.position).abs() <= max_distance
        })
        .map(|s| NearbySeat {
            seat: s.clone(),
            distance: distance(reference, s),
        })
        .collect();

    nearby.sort_by(|a, b| {
        a.distance
            .cmp(&b.distance)
            .then_with(|| a.seat.id.cmp(&b.seat.id))
    });
    nearby.truncate(limit);
    nearby
}

/// Result of looking a customer up by name.
#[derive(Clone, Debug, PartialEq)]
pub enum CustomerMatch {
    NotFound,
    Unique(Booking),
    /// More than one booking matched; the caller must pick one.
    Ambiguous(Vec<Booking>),
}

/// Case-insensitive substring match against booking customer names.
pub fn resolve_customer(name: &str, bookings: &[Booking]) -> CustomerMatch {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return CustomerMatch::NotFound;
    }
    let mut matches: Vec<Booking> = bookings
        .iter()
        .filter(|b| b.customer_name.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    matches.sort_by_key(|b| b.id);

    match matches.len() {
        0 => CustomerMatch::NotFound,
        1 => CustomerMatch::Unique(matches.remove(0)),
        _ => CustomerMatch::Ambiguous(matches),
    }
}

/// Outcome of a customer-based proximity query.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NearbyOutcome {
    CustomerNotFound,
    /// Several bookings matched and none was selected.
    Ambiguous { matches: Vec<Booking> },
    /// The booking exists but its seat is not in the catalog.
    SeatMissing { booking: Booking },
    Found {
        booking: Booking,
        reference: Seat,
        nearby: Vec<NearbySeat>,
    },
}

/// Resolve `name` to a booking and search around its seat. When the name is
/// ambiguous, `booking_id` selects one of the matches.
pub fn seats_near_customer(
    name: &str,
    booking_id: Option<i64>,
    bookings: &[Booking],
    seats: &[Seat],
    max_distance: i64,
    limit: usize,
) -> NearbyOutcome {
    let booking = match (resolve_customer(name, bookings), booking_id) {
        (CustomerMatch::NotFound, _) => return NearbyOutcome::CustomerNotFound,
        (CustomerMatch::Unique(b), _) => b,
        (CustomerMatch::Ambiguous(all), Some(id)) => {
            match all.iter().find(|b| b.id == id) {
                Some(b) => b.clone(),
                None => return NearbyOutcome::Ambiguous { matches: all },
            }
        }
        (CustomerMatch::Ambiguous(all), None) => {
            return NearbyOutcome::Ambiguous { matches: all };
        }
    };

    match find_seat(seats, booking.seat_id) {
        Some(reference) => NearbyOutcome::Found {
            nearby: find_nearby(reference, seats, max_distance, limit),
            reference: reference.clone(),
            booking,
        },
        None => NearbyOutcome::SeatMissing { booking },
    }
}

pub fn find_seat(seats: &[Seat], id: SeatId) -> Option<&Seat> {
    seats.iter().find(|s| s.id == id)
}
