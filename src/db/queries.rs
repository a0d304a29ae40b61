use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingScope, BookingStatus, LifecycleEvent, Service, ServiceType, User, Worker,
};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, customer_id, service, scheduled_date, scheduled_time, area, address, status, assigned_worker, notes, version, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            booking.id,
            booking.customer_id,
            booking.service,
            booking.scheduled_date.format(DATE_FMT).to_string(),
            booking.scheduled_time.format(TIME_FMT).to_string(),
            booking.area,
            booking.address,
            booking.status.as_str(),
            booking.assigned_worker,
            booking.notes,
            booking.version,
            booking.created_at.format(DATETIME_FMT).to_string(),
            booking.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

const BOOKING_COLUMNS: &str = "id, customer_id, service, scheduled_date, scheduled_time, area, address, status, assigned_worker, notes, version, created_at, updated_at";

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_bookings_for_customer(
    conn: &Connection,
    customer_id: &str,
    scope: Option<BookingScope>,
) -> anyhow::Result<Vec<Booking>> {
    let status_clause = match scope {
        Some(scope) => {
            let quoted: Vec<String> = scope
                .statuses()
                .iter()
                .map(|s| format!("'{}'", s.as_str()))
                .collect();
            format!("AND status IN ({})", quoted.join(", "))
        }
        None => String::new(),
    };

    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE customer_id = ?1 {status_clause} ORDER BY created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![customer_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Admin listing. `worker_name` is resolved through a LEFT JOIN so a
/// booking whose worker was deleted still lists, with no name.
pub fn list_all_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<(Booking, Option<String>)>> {
    let select = "SELECT b.id, b.customer_id, b.service, b.scheduled_date, b.scheduled_time, b.area, b.address, b.status, b.assigned_worker, b.notes, b.version, b.created_at, b.updated_at, w.name \
         FROM bookings b LEFT JOIN workers w ON b.assigned_worker = w.id";

    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!("{select} WHERE b.status = ?1 ORDER BY b.created_at DESC LIMIT ?2"),
            vec![
                Box::new(status.as_str().to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            format!("{select} ORDER BY b.created_at DESC LIMIT ?1"),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        let worker_name: Option<String> = row.get(13)?;
        Ok((parse_booking_row(row), worker_name))
    })?;

    let mut bookings = vec![];
    for row in rows {
        let (booking, worker_name) = row?;
        bookings.push((booking?, worker_name));
    }
    Ok(bookings)
}

/// Version-guarded write: applies the new status (and optionally worker and
/// notes) only if the row still carries the version the caller read.
/// Returns false when the guard missed, which the engine resolves to
/// either `Conflict` or `NotFound` by re-reading.
pub fn transition_booking(
    conn: &Connection,
    id: &str,
    expected_version: i64,
    new_status: BookingStatus,
    assigned_worker: Option<&str>,
    notes: Option<&str>,
) -> anyhow::Result<bool> {
    let now = Utc::now().naive_utc().format(DATETIME_FMT).to_string();
    let count = conn.execute(
        "UPDATE bookings
         SET status = ?1,
             assigned_worker = COALESCE(?2, assigned_worker),
             notes = COALESCE(?3, notes),
             version = version + 1,
             updated_at = ?4
         WHERE id = ?5 AND version = ?6",
        params![new_status.as_str(), assigned_worker, notes, now, id, expected_version],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let customer_id: String = row.get(1)?;
    let service: String = row.get(2)?;
    let scheduled_date_str: String = row.get(3)?;
    let scheduled_time_str: String = row.get(4)?;
    let area: String = row.get(5)?;
    let address: String = row.get(6)?;
    let status_str: String = row.get(7)?;
    let assigned_worker: Option<String> = row.get(8)?;
    let notes: Option<String> = row.get(9)?;
    let version: i64 = row.get(10)?;
    let created_at_str: String = row.get(11)?;
    let updated_at_str: String = row.get(12)?;

    let scheduled_date = NaiveDate::parse_from_str(&scheduled_date_str, DATE_FMT)
        .unwrap_or_else(|_| Utc::now().date_naive());
    let scheduled_time = NaiveTime::parse_from_str(&scheduled_time_str, TIME_FMT)
        .unwrap_or_else(|_| Utc::now().time());
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, DATETIME_FMT)
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, DATETIME_FMT)
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Booking {
        id,
        customer_id,
        service,
        scheduled_date,
        scheduled_time,
        area,
        address,
        status: BookingStatus::parse(&status_str),
        assigned_worker,
        notes,
        version,
        created_at,
        updated_at,
    })
}

// ── Workers ──

pub fn create_worker(conn: &Connection, worker: &Worker) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO workers (id, name, specialty, rating, bio, location, phone, languages, age, skills, police_verified, resident_pass, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            worker.id,
            worker.name,
            worker.specialty,
            worker.rating,
            worker.bio,
            worker.location,
            worker.phone,
            serde_json::to_string(&worker.languages)?,
            worker.age,
            serde_json::to_string(&worker.skills)?,
            worker.police_verified as i32,
            worker.resident_pass as i32,
            worker.created_at,
        ],
    )?;
    Ok(())
}

const WORKER_COLUMNS: &str = "id, name, specialty, rating, bio, location, phone, languages, age, skills, police_verified, resident_pass, created_at";

pub fn get_worker(conn: &Connection, id: &str) -> anyhow::Result<Option<Worker>> {
    let result = conn.query_row(
        &format!("SELECT {WORKER_COLUMNS} FROM workers WHERE id = ?1"),
        params![id],
        |row| Ok(parse_worker_row(row)),
    );

    match result {
        Ok(worker) => Ok(Some(worker?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_workers(conn: &Connection) -> anyhow::Result<Vec<Worker>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORKER_COLUMNS} FROM workers ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map([], |row| Ok(parse_worker_row(row)))?;

    let mut workers = vec![];
    for row in rows {
        workers.push(row??);
    }
    Ok(workers)
}

pub fn delete_worker(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM workers WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_worker_row(row: &rusqlite::Row) -> anyhow::Result<Worker> {
    let languages_json: String = row.get(7)?;
    let skills_json: String = row.get(9)?;

    Ok(Worker {
        id: row.get(0)?,
        name: row.get(1)?,
        specialty: row.get(2)?,
        rating: row.get(3)?,
        bio: row.get(4)?,
        location: row.get(5)?,
        phone: row.get(6)?,
        languages: serde_json::from_str(&languages_json).unwrap_or_default(),
        age: row.get(8)?,
        skills: serde_json::from_str(&skills_json).unwrap_or_default(),
        police_verified: row.get::<_, i32>(10)? != 0,
        resident_pass: row.get::<_, i32>(11)? != 0,
        created_at: row.get(12)?,
    })
}

// ── Services ──

pub fn list_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let mut stmt =
        conn.prepare("SELECT id, name, description, service_type, icon FROM services ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        let service_type: String = row.get(3)?;
        Ok(Service {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            service_type: ServiceType::parse(&service_type),
            icon: row.get(4)?,
        })
    })?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

pub fn get_service_by_name(conn: &Connection, name: &str) -> anyhow::Result<Option<Service>> {
    let result = conn.query_row(
        "SELECT id, name, description, service_type, icon FROM services WHERE name = ?1",
        params![name],
        |row| {
            let service_type: String = row.get(3)?;
            Ok(Service {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                service_type: ServiceType::parse(&service_type),
                icon: row.get(4)?,
            })
        },
    );

    match result {
        Ok(service) => Ok(Some(service)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Users ──

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, phone, address, role, api_token, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.name,
            user.email,
            user.phone,
            user.address,
            user.role.as_str(),
            user.api_token,
            user.created_at,
        ],
    )?;
    Ok(())
}

const USER_COLUMNS: &str = "id, name, email, phone, address, role, api_token, created_at";

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    user_query(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        id,
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    user_query(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        email,
    )
}

pub fn get_user_by_token(conn: &Connection, token: &str) -> anyhow::Result<Option<User>> {
    user_query(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE api_token = ?1"),
        token,
    )
}

fn user_query(conn: &Connection, sql: &str, key: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(sql, params![key], |row| {
        let role: String = row.get(5)?;
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            address: row.get(4)?,
            role: crate::models::Role::parse(&role),
            api_token: row.get(6)?,
            created_at: row.get(7)?,
        })
    });

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Lifecycle events ──

pub fn insert_event(
    conn: &Connection,
    kind: &str,
    booking_id: &str,
    payload: &serde_json::Value,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO events (kind, booking_id, payload) VALUES (?1, ?2, ?3)",
        params![kind, booking_id, serde_json::to_string(payload)?],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_events_since(conn: &Connection, since_id: i64) -> anyhow::Result<Vec<LifecycleEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, booking_id, payload, created_at FROM events WHERE id > ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![since_id], |row| Ok(parse_event_row(row)))?;

    let mut events = vec![];
    for row in rows {
        events.push(row??);
    }
    Ok(events)
}

pub fn get_events_for_booking(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<Vec<LifecycleEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, booking_id, payload, created_at FROM events WHERE booking_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], |row| Ok(parse_event_row(row)))?;

    let mut events = vec![];
    for row in rows {
        events.push(row??);
    }
    Ok(events)
}

fn parse_event_row(row: &rusqlite::Row) -> anyhow::Result<LifecycleEvent> {
    let payload_json: String = row.get(3)?;
    Ok(LifecycleEvent {
        id: row.get(0)?,
        kind: row.get(1)?,
        booking_id: row.get(2)?,
        payload: serde_json::from_str(&payload_json).unwrap_or(serde_json::json!({})),
        created_at: row.get(4)?,
    })
}

// ── Dashboard stats ──

pub struct DashboardStats {
    pub pending_count: i64,
    pub confirmed_count: i64,
    pub in_progress_count: i64,
    pub completed_count: i64,
    pub cancelled_count: i64,
    pub workers_count: i64,
}

pub fn get_dashboard_stats(conn: &Connection) -> anyhow::Result<DashboardStats> {
    let count_status = |status: BookingStatus| -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM bookings WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )
        .unwrap_or(0)
    };

    let workers_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM workers", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(DashboardStats {
        pending_count: count_status(BookingStatus::Pending),
        confirmed_count: count_status(BookingStatus::Confirmed),
        in_progress_count: count_status(BookingStatus::InProgress),
        completed_count: count_status(BookingStatus::Completed),
        cancelled_count: count_status(BookingStatus::Cancelled),
        workers_count,
    })
}
