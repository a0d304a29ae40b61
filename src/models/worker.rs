use serde::{Deserialize, Serialize};

pub const RATING_MIN: f64 = 0.0;
pub const RATING_MAX: f64 = 5.0;
pub const RATING_DEFAULT: f64 = 5.0;

/// A service-provider profile in the worker registry. Workers carry no
/// lifecycle state; existence in the registry is what makes them eligible
/// for assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub rating: f64,
    pub bio: String,
    pub location: String,
    pub phone: String,
    pub languages: Vec<String>,
    pub age: Option<i64>,
    pub skills: Vec<String>,
    pub police_verified: bool,
    pub resident_pass: bool,
    pub created_at: String,
}

/// Clamp a submitted rating into the sane range, defaulting when absent or
/// not a finite number.
pub fn normalize_rating(rating: Option<f64>) -> f64 {
    match rating {
        Some(r) if r.is_finite() => r.clamp(RATING_MIN, RATING_MAX),
        _ => RATING_DEFAULT,
    }
}
