use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::PlanError;
use crate::models::{is_unset_timestamp, WorkoutPlan, WorkoutSession};

/// Decodes the provider reply as a plan. The reply must be the JSON object
/// and nothing else; prose or markdown around it is rejected.
pub fn parse_plan(raw: &str) -> Result<WorkoutPlan, PlanError> {
    parse_plan_at(raw, Utc::now())
}

fn parse_plan_at(raw: &str, now: DateTime<Utc>) -> Result<WorkoutPlan, PlanError> {
    let mut plan: WorkoutPlan =
        serde_json::from_str(raw.trim()).map_err(|e| PlanError::parse(e.to_string(), raw))?;

    if is_unset_timestamp(&plan.created_at) {
        plan.created_at = now;
    }
    if is_unset_timestamp(&plan.plan_start_date) {
        plan.plan_start_date = now;
    }

    validate_plan(&plan)?;
    Ok(plan)
}

/// Structural checks decoding alone does not give us.
pub fn validate_plan(plan: &WorkoutPlan) -> Result<(), PlanError> {
    if plan.sessions.is_empty() {
        return Err(PlanError::validation("sessions", "plan must contain at least one session"));
    }
    validate_sessions("sessions", &plan.sessions)?;

    if let Some(suggested) = &plan.suggested_plan {
        validate_sessions("suggestedPlan.sessions", &suggested.sessions)?;
    }
    Ok(())
}

fn validate_sessions(prefix: &str, sessions: &[WorkoutSession]) -> Result<(), PlanError> {
    for (i, session) in sessions.iter().enumerate() {
        if session.exercises.is_empty() {
            warn!("Session {}[{}] ({:?}) has no exercises", prefix, i, session.name);
        }

        for (j, exercise) in session.exercises.iter().enumerate() {
            let path = format!("{}[{}].exercises[{}]", prefix, i, j);
            if exercise.sets < 1 {
                return Err(PlanError::validation(
                    format!("{}.sets", path),
                    format!("sets must be at least 1, got {}", exercise.sets),
                ));
            }
            if exercise.reps < 1 {
                return Err(PlanError::validation(
                    format!("{}.reps", path),
                    format!("reps must be at least 1, got {}", exercise.reps),
                ));
            }
            let weight = exercise.weight.value;
            if !weight.is_finite() || weight < 0.0 {
                return Err(PlanError::validation(
                    format!("{}.weight.value", path),
                    format!("weight must be a non-negative number, got {}", weight),
                ));
            }
        }
    }
    Ok(())
}
