use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// --- Canonical user profile ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl FitnessLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "beginner" => Some(FitnessLevel::Beginner),
            "intermediate" => Some(FitnessLevel::Intermediate),
            "advanced" => Some(FitnessLevel::Advanced),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FitnessLevel::Beginner => "beginner",
            FitnessLevel::Intermediate => "intermediate",
            FitnessLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for FitnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_workouts: u64,
    pub current_streak: u64,
    pub longest_streak: u64,
    /// Minutes.
    pub total_time: u64,
    pub total_volume: u64,
}

/// Validated profile built by `profile::translate`. Downstream code never
/// looks at the raw document again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub display_name: String,
    /// ISO-8601 when the store has one, otherwise passed through untouched.
    pub date_of_birth: String,
    pub gender: String,
    pub fitness_level: FitnessLevel,
    pub activity_level: String,
    pub height: Measurement,
    pub weight: Measurement,
    pub goals: Vec<String>,
    pub equipment: Vec<String>,
    pub location: String,
    pub units: String,
    pub stats: UserStats,
}

// --- Generated workout plan ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlan {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default = "unset_timestamp", deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ai_feedback_cycle: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub plan_validity_period: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sessions_completed: i32,
    #[serde(default = "unset_timestamp", deserialize_with = "lenient_timestamp")]
    pub plan_start_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_new_plan_suggestion: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_plan: Option<SuggestedPlan>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sessions: Vec<WorkoutSession>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedPlan {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub improvements: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comparison: PlanComparison,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sessions: Vec<WorkoutSession>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanComparison {
    #[serde(default, deserialize_with = "null_as_default")]
    pub current: PlanDetails,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggested: PlanDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDetails {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sessions: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub difficulty: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub focus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub note: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sets: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reps: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub weight: WeightInfo,
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub exercise_type: ExerciseType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit: String,
}

/// Known exercise kinds; anything else the model invents is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExerciseType {
    Weight,
    Bodyweight,
    Cardio,
    Other(String),
}

impl Default for ExerciseType {
    fn default() -> Self {
        ExerciseType::Other(String::new())
    }
}

impl From<String> for ExerciseType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "weight" => ExerciseType::Weight,
            "bodyweight" => ExerciseType::Bodyweight,
            "cardio" => ExerciseType::Cardio,
            _ => ExerciseType::Other(raw),
        }
    }
}

impl From<ExerciseType> for String {
    fn from(kind: ExerciseType) -> Self {
        match kind {
            ExerciseType::Weight => "weight".to_string(),
            ExerciseType::Bodyweight => "bodyweight".to_string(),
            ExerciseType::Cardio => "cardio".to_string(),
            ExerciseType::Other(raw) => raw,
        }
    }
}

// --- Timestamp helpers ---

pub fn unset_timestamp() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Epoch and year-1 ("zero time" from other serializers) both mean "not provided".
pub fn is_unset_timestamp(ts: &DateTime<Utc>) -> bool {
    ts.timestamp() == 0 || ts.year() <= 1
}

/// Models write `null` for fields they have nothing to say about.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(unset_timestamp());
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(unset_timestamp());
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(serde::de::Error::custom(format!(
        "invalid timestamp '{}'",
        trimmed
    )))
}
