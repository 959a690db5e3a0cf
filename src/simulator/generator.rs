//! Synthetic worker-change event generator
//!
//! Produces HR-style "worker changed" documents: a random worker, a random
//! field, and plausible old/new values for that field.

use chrono::{DateTime, Days, Duration, Months, SecondsFormat, Utc};
use rand::Rng;
use serde_json::{json, Value};

use crate::event::NewEvent;

use super::config::{sanitize_ratio, DEFAULT_CANNED_RATIO};

/// Operation tags the generator emits
pub const OPERATIONS: &[&str] = &["insert", "update", "delete"];

/// Worker ids used for generated events
pub const WORKER_IDS: &[&str] = &["TS87652", "TS12345", "TS54321", "TS98765", "TS24680", "TS13579"];

/// Worker fields that can change
pub const FIELDS: &[&str] = &[
    "JobTitle",
    "Department",
    "WorkLocation",
    "Salary",
    "Manager",
    "EmploymentStatus",
    "WorkSchedule",
    "Benefits",
    "PerformanceRating",
];

const INITIATORS: &[&str] = &["admin", "hr_manager", "system", "self_service"];

const JOB_TITLES: &[&str] = &[
    "Software Engineer",
    "Senior Software Engineer",
    "Tech Lead",
    "Engineering Manager",
    "Product Manager",
    "QA Engineer",
    "DevOps Engineer",
];
const DEPARTMENTS: &[&str] = &[
    "Engineering",
    "Product",
    "Marketing",
    "Sales",
    "HR",
    "Finance",
    "Research & Development",
    "Customer Support",
];
const LOCATIONS: &[&str] = &[
    "Remote",
    "Onsite",
    "Hybrid",
    "New York",
    "San Francisco",
    "London",
    "Tokyo",
    "Berlin",
];
const MANAGERS: &[&str] = &[
    "Alice Smith",
    "Bob Johnson",
    "Carol Williams",
    "David Brown",
    "Emma Davis",
    "Frank Miller",
];
const STATUSES: &[&str] = &[
    "Full-time",
    "Part-time",
    "Contract",
    "Temporary",
    "Probation",
    "Permanent",
];
const SCHEDULES: &[&str] = &[
    "9-5",
    "Flexible",
    "4-day week",
    "Night shift",
    "Weekend",
    "Rotating",
];
const BENEFITS: &[&str] = &[
    "Standard",
    "Premium",
    "Basic",
    "Executive",
    "Custom",
    "International",
];
const RATINGS: &[&str] = &[
    "Exceeds Expectations",
    "Meets Expectations",
    "Needs Improvement",
    "Outstanding",
    "Satisfactory",
];

fn pick<R: Rng + ?Sized>(rng: &mut R, items: &[&'static str]) -> &'static str {
    items[rng.gen_range(0..items.len())]
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Plausible old and new values for a worker field
pub fn field_values<R: Rng + ?Sized>(rng: &mut R, field: &str) -> (String, String) {
    let choices = match field {
        "JobTitle" => JOB_TITLES,
        "Department" => DEPARTMENTS,
        "WorkLocation" => LOCATIONS,
        "Manager" => MANAGERS,
        "EmploymentStatus" => STATUSES,
        "WorkSchedule" => SCHEDULES,
        "Benefits" => BENEFITS,
        "PerformanceRating" => RATINGS,
        "Salary" => {
            let old = 50_000 + rng.gen_range(0..100_000);
            let new = old + rng.gen_range(0..20_000);
            return (format!("${}", old), format!("${}", new));
        }
        _ => return ("Previous Value".into(), "New Value".into()),
    };

    (pick(rng, choices).into(), pick(rng, choices).into())
}

/// Canned worker-change documents replayed by the simulator
pub fn canned_worker_events() -> Vec<Value> {
    vec![
        json!({
            "EventID": "CE123456789",
            "WorkerID": "TS87652",
            "EventType": "Update",
            "EffectiveDate": "2025-04-01",
            "ChangeDetails": {
                "Field": "JobTitle",
                "OldValue": "Software Engineer",
                "NewValue": "Senior Software Engineer"
            },
            "Metadata": {"InitiatedBy": "admin", "Timestamp": "2025-03-12T15:30:00Z"}
        }),
        json!({
            "EventID": "CE987654321",
            "WorkerID": "TS87652",
            "EventType": "Update",
            "EffectiveDate": "2025-05-15",
            "ChangeDetails": {
                "Field": "Department",
                "OldValue": "Development",
                "NewValue": "Research & Development"
            },
            "Metadata": {"InitiatedBy": "hr_manager", "Timestamp": "2025-03-15T09:45:00Z"}
        }),
        json!({
            "EventID": "CE192837465",
            "WorkerID": "TS87652",
            "EventType": "Update",
            "EffectiveDate": "2025-06-01",
            "ChangeDetails": {
                "Field": "WorkLocation",
                "OldValue": "Remote",
                "NewValue": "Onsite"
            },
            "Metadata": {"InitiatedBy": "system", "Timestamp": "2025-03-20T11:20:00Z"}
        }),
    ]
}

/// Events the log is seeded with at startup, relative to `now`
pub fn seed_events(now: DateTime<Utc>) -> Vec<NewEvent> {
    let day_ago = now - Duration::hours(24);
    let half_day_ago = now - Duration::hours(12);
    let six_hours_ago = now - Duration::hours(6);

    vec![
        NewEvent::new(
            "insert",
            json!({
                "name": "Alice",
                "email": "alice@example.com",
                "role": "admin",
                "created": rfc3339(day_ago)
            }),
        )
        .at(day_ago),
        NewEvent::new(
            "insert",
            json!({
                "name": "Bob",
                "email": "bob@example.com",
                "role": "user",
                "created": rfc3339(half_day_ago)
            }),
        )
        .at(half_day_ago),
        NewEvent::new(
            "update",
            json!({
                "name": "Alice",
                "email": "alice.new@example.com",
                "role": "admin",
                "created": rfc3339(day_ago),
                "modified": rfc3339(six_hours_ago)
            }),
        )
        .at(six_hours_ago),
    ]
}

/// Generator of random worker-change events
pub struct WorkerEventGenerator {
    canned: Vec<Value>,
    canned_ratio: f64,
}

impl WorkerEventGenerator {
    /// Create a generator replaying canned events with probability `canned_ratio`
    pub fn new(canned_ratio: f64) -> Self {
        Self {
            canned: canned_worker_events(),
            canned_ratio: sanitize_ratio(canned_ratio),
        }
    }

    /// Produce the next event, stamped with `now`
    pub fn next_event<R: Rng + ?Sized>(&self, rng: &mut R, now: DateTime<Utc>) -> NewEvent {
        let operation = pick(rng, OPERATIONS);

        let worker_event = if !self.canned.is_empty() && rng.gen_bool(self.canned_ratio) {
            self.canned[rng.gen_range(0..self.canned.len())].clone()
        } else {
            self.fresh_worker_event(rng, now)
        };

        NewEvent::new(operation, json!({ "WorkerChangeEvent": worker_event })).at(now)
    }

    fn fresh_worker_event<R: Rng + ?Sized>(&self, rng: &mut R, now: DateTime<Utc>) -> Value {
        let field = pick(rng, FIELDS);
        let (old_value, new_value) = field_values(rng, field);

        let today = now.date_naive();
        let effective = today
            .checked_add_months(Months::new(rng.gen_range(0..6)))
            .and_then(|d| d.checked_add_days(Days::new(rng.gen_range(0..30))))
            .unwrap_or(today);

        json!({
            "EventID": format!("CE{}", rng.gen_range(0..1_000_000)),
            "WorkerID": pick(rng, WORKER_IDS),
            "EventType": "Update",
            "EffectiveDate": effective.format("%Y-%m-%d").to_string(),
            "ChangeDetails": {
                "Field": field,
                "OldValue": old_value,
                "NewValue": new_value
            },
            "Metadata": {
                "InitiatedBy": pick(rng, INITIATORS),
                "Timestamp": rfc3339(now)
            }
        })
    }
}

impl Default for WorkerEventGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CANNED_RATIO)
    }
}

/// Worker id of a generated event, for logging
pub fn worker_id(event: &NewEvent) -> Option<&str> {
    event
        .payload
        .get("WorkerChangeEvent")
        .and_then(|w| w.get("WorkerID"))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_seed_events() {
        let now = Utc::now();
        let seeds = seed_events(now);

        assert_eq!(seeds.len(), 3);
        assert_eq!(seeds[0].operation_type, "insert");
        assert_eq!(seeds[0].payload["name"], "Alice");
        assert_eq!(seeds[1].payload["name"], "Bob");
        assert_eq!(seeds[2].operation_type, "update");
        assert_eq!(seeds[2].payload["email"], "alice.new@example.com");

        // Oldest first
        assert!(seeds[0].timestamp < seeds[1].timestamp);
        assert!(seeds[1].timestamp < seeds[2].timestamp);
    }

    #[test]
    fn test_generated_events_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        let generator = WorkerEventGenerator::new(0.5);
        let now = Utc::now();

        for _ in 0..200 {
            let event = generator.next_event(&mut rng, now);
            assert!(OPERATIONS.contains(&event.operation_type.as_str()));
            assert_eq!(event.timestamp, Some(now));

            let worker = worker_id(&event).unwrap();
            assert!(worker.starts_with("TS"));

            let details = &event.payload["WorkerChangeEvent"]["ChangeDetails"];
            assert!(details["Field"].is_string());
            assert!(event.clone().into_parts().is_ok());
        }
    }

    #[test]
    fn test_fresh_only() {
        let mut rng = StdRng::seed_from_u64(1);
        let generator = WorkerEventGenerator::new(0.0);
        let now = Utc::now();

        for _ in 0..50 {
            let event = generator.next_event(&mut rng, now);
            let id = event.payload["WorkerChangeEvent"]["EventID"].as_str().unwrap();
            assert!(!["CE123456789", "CE987654321", "CE192837465"].contains(&id));
        }
    }

    #[test]
    fn test_canned_only() {
        let mut rng = StdRng::seed_from_u64(2);
        let generator = WorkerEventGenerator::new(1.0);

        let event = generator.next_event(&mut rng, Utc::now());
        assert_eq!(worker_id(&event), Some("TS87652"));
        assert_eq!(event.payload["WorkerChangeEvent"]["EventType"], "Update");
    }

    #[test]
    fn test_nan_ratio_does_not_panic() {
        let mut rng = StdRng::seed_from_u64(5);
        let generator = WorkerEventGenerator::new(f64::NAN);

        for _ in 0..20 {
            let event = generator.next_event(&mut rng, Utc::now());
            assert!(worker_id(&event).is_some());
        }
    }

    #[test]
    fn test_salary_values() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let (old, new) = field_values(&mut rng, "Salary");
            let old: u32 = old.trim_start_matches('$').parse().unwrap();
            let new: u32 = new.trim_start_matches('$').parse().unwrap();
            assert!((50_000..150_000).contains(&old));
            assert!(new >= old);
        }
    }

    #[test]
    fn test_unknown_field_values() {
        let mut rng = StdRng::seed_from_u64(4);
        let (old, new) = field_values(&mut rng, "Shoe size");
        assert_eq!(old, "Previous Value");
        assert_eq!(new, "New Value");
    }
}
