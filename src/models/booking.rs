use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A customer's request for a home service, tracked through its status
/// lifecycle. `assigned_worker` is a weak reference into the worker
/// registry: it is only ever non-null while the booking is in progress or
/// completed, and deleting the worker does not touch the booking row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    pub service: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub area: String,
    pub address: String,
    pub status: BookingStatus,
    pub assigned_worker: Option<String>,
    pub notes: Option<String>,
    pub version: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "confirmed" => BookingStatus::Confirmed,
            "in_progress" => BookingStatus::InProgress,
            "completed" => BookingStatus::Completed,
            "cancelled" => BookingStatus::Cancelled,
            _ => BookingStatus::Pending,
        }
    }

    /// Terminal states have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// The legal-transition table. Defined once here so every lifecycle
    /// operation consults the same rule.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (InProgress, Completed)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query-surface categories: upcoming bookings are still moving through the
/// lifecycle, past bookings have reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingScope {
    Upcoming,
    Past,
}

impl BookingScope {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(BookingScope::Upcoming),
            "past" => Some(BookingScope::Past),
            _ => None,
        }
    }

    pub fn statuses(&self) -> &'static [BookingStatus] {
        match self {
            BookingScope::Upcoming => &[
                BookingStatus::Pending,
                BookingStatus::Confirmed,
                BookingStatus::InProgress,
            ],
            BookingScope::Past => &[BookingStatus::Completed, BookingStatus::Cancelled],
        }
    }
}
