use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};

use seat_core::{Booking, Catalog, Seat, SeatId, SeatType, Side, reference_venue};

use crate::error::{Result, StoreError};
use crate::schema;

const SEAT_COLUMNS: &str =
    "id, layer, side, position, price, is_available, seat_type, has_ac, view_quality, famous_note";

pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let result = stmt.query_row([key], |row| row.get(0)).optional()?;
        Ok(result)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Seats ---

    pub fn seat_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM seats", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn available_count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM seats WHERE is_available = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn load_seats(&self) -> Result<Vec<Seat>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SEAT_COLUMNS} FROM seats ORDER BY id"))?;
        let seats = stmt
            .query_map([], seat_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(seats)
    }

    pub fn get_seat(&self, id: SeatId) -> Result<Option<Seat>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SEAT_COLUMNS} FROM seats WHERE id = ?1"))?;
        Ok(stmt.query_row([id], seat_from_row).optional()?)
    }

    /// Insert a seat. A positive `seat.id` is kept, otherwise SQLite assigns one.
    pub fn insert_seat(&self, seat: &Seat) -> Result<SeatId> {
        insert_seat_on(&self.conn, seat)
    }

    /// Populate the reference venue. No-op when seats already exist.
    pub fn seed_default_venue(&self) -> Result<usize> {
        if self.seat_count()? > 0 {
            return Ok(0);
        }
        let seats = reference_venue();
        let tx = self.conn.unchecked_transaction()?;
        for seat in &seats {
            insert_seat_on(&tx, seat)?;
        }
        tx.commit()?;
        tracing::info!("seeded reference venue with {} seats", seats.len());
        Ok(seats.len())
    }

    // --- Bookings ---

    pub fn load_bookings(&self) -> Result<Vec<Booking>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.user_name, b.user_email, b.seat_id, COALESCE(b.price, s.price, 0)
             FROM bookings b LEFT JOIN seats s ON s.id = b.seat_id
             ORDER BY b.id",
        )?;
        let bookings = stmt
            .query_map([], |row| {
                Ok(Booking {
                    id: row.get(0)?,
                    customer_name: row.get(1)?,
                    email: row.get(2)?,
                    seat_id: row.get(3)?,
                    price: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(bookings)
    }

    /// Book an available seat for a customer at its current price and mark it taken.
    pub fn record_booking(&self, customer_name: &str, email: &str, seat_id: SeatId) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        let seat: Option<(bool, f64)> = tx
            .query_row(
                "SELECT is_available, price FROM seats WHERE id = ?1",
                [seat_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let price = match seat {
            None => return Err(StoreError::UnknownSeat(seat_id)),
            Some((false, _)) => return Err(StoreError::SeatTaken(seat_id)),
            Some((true, price)) => price,
        };
        tx.execute(
            "INSERT INTO bookings (seat_id, user_name, user_email, price) VALUES (?1, ?2, ?3, ?4)",
            params![seat_id, customer_name, email, price],
        )?;
        let booking_id = tx.last_insert_rowid();
        tx.execute("UPDATE seats SET is_available = 0 WHERE id = ?1", [seat_id])?;
        tx.commit()?;
        Ok(booking_id)
    }

    // --- Whole catalog ---

    /// Snapshot of every seat and booking.
    pub fn load_catalog(&self) -> Result<Catalog> {
        Ok(Catalog::new(self.load_seats()?, self.load_bookings()?))
    }

    /// Replace all seats and bookings with `catalog`.
    pub fn replace_catalog(&self, catalog: &Catalog) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch("DELETE FROM bookings; DELETE FROM seats;")?;
        for seat in &catalog.seats {
            insert_seat_on(&tx, seat)?;
        }
        for booking in &catalog.bookings {
            tx.execute(
                "INSERT INTO bookings (id, seat_id, user_name, user_email, price)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    booking.id,
                    booking.seat_id,
                    booking.customer_name,
                    booking.email,
                    booking.price
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn insert_seat_on(conn: &Connection, seat: &Seat) -> Result<SeatId> {
    let id = (seat.id > 0).then_some(seat.id);
    conn.execute(
        "INSERT INTO seats (id, layer, side, position, price, is_available, seat_type, has_ac, view_quality, famous_note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            id,
            seat.layer,
            seat.side.map(|s| s.as_str()),
            seat.position,
            seat.price,
            seat.is_available,
            seat.seat_type.as_str(),
            seat.has_ac,
            seat.view_quality,
            seat.famous_note,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn seat_from_row(row: &Row<'_>) -> rusqlite::Result<Seat> {
    let side: Option<String> = row.get(2)?;
    let seat_type: String = row.get(6)?;
    let view_quality: i64 = row.get(8)?;
    Ok(Seat {
        id: row.get(0)?,
        layer: row.get(1)?,
        side: side.as_deref().and_then(Side::parse),
        position: row.get(3)?,
        price: row.get(4)?,
        is_available: row.get(5)?,
        seat_type: SeatType::from_str_lossy(&seat_type),
        has_ac: row.get(7)?,
        view_quality: view_quality.clamp(0, 10) as u8,
        famous_note: row.get(9)?,
    })
}
