use serde_json::Value;

use crate::error::PlanError;
use crate::models::{FitnessLevel, Measurement, UserProfile, UserStats};

/// Turns a document-store record into a `UserProfile`.
///
/// Accepts the bare record or the `{collection, data, document_id, success}`
/// envelope the store lookup returns. Only `fitnessLevel` is required; every
/// other field falls back to an empty value.
pub fn translate(raw: &Value) -> Result<UserProfile, PlanError> {
    let user = match raw.get("data") {
        Some(data) if data.is_object() => data,
        _ => raw,
    };

    if !user.is_object() {
        return Err(PlanError::validation("$", "profile document must be a JSON object"));
    }

    let fitness_level = match user.get("fitnessLevel") {
        None | Some(Value::Null) => {
            return Err(PlanError::validation("fitnessLevel", "field is required"));
        }
        Some(value) => value
            .as_str()
            .and_then(FitnessLevel::parse)
            .ok_or_else(|| {
                PlanError::validation(
                    "fitnessLevel",
                    format!(
                        "expected one of beginner, intermediate, advanced; got {}",
                        value
                    ),
                )
            })?,
    };

    let display_name = non_empty(string_field(user, "fullName"))
        .unwrap_or_else(|| string_field(user, "displayName"));

    let stats = user.get("stats").unwrap_or(&Value::Null);

    Ok(UserProfile {
        display_name,
        date_of_birth: string_field(user, "dateOfBirth"),
        gender: string_field(user, "gender"),
        fitness_level,
        activity_level: string_field(user, "activityLevel"),
        height: measurement(user.get("height")),
        weight: measurement(user.get("weight")),
        goals: string_list(user.get("goals")),
        equipment: string_list(user.get("equipment")),
        location: string_field(user, "location"),
        units: user
            .get("preferences")
            .map(|prefs| string_field(prefs, "units"))
            .unwrap_or_default(),
        stats: UserStats {
            total_workouts: count(stats.get("totalWorkouts")),
            current_streak: count(stats.get("currentStreak")),
            longest_streak: count(stats.get("longestStreak")),
            total_time: count(stats.get("totalTime")),
            total_volume: count(stats.get("totalVolume")),
        },
    })
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn string_field(obj: &Value, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Stats are counters: negatives and junk clamp to zero.
fn count(value: Option<&Value>) -> u64 {
    match number(value) {
        Some(n) if n.is_finite() && n > 0.0 => n.round() as u64,
        _ => 0,
    }
}

fn measurement(value: Option<&Value>) -> Measurement {
    let Some(obj) = value else {
        return Measurement::default();
    };
    Measurement {
        value: number(obj.get("value")).filter(|v| v.is_finite()).unwrap_or(0.0),
        unit: string_field(obj, "unit"),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        Some(Value::String(single)) if !single.is_empty() => vec![single.clone()],
        _ => Vec::new(),
    }
}
