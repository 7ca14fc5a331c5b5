use crate::models::UserProfile;

/// Trainer persona and output contract sent as the system message.
pub const SYSTEM_INSTRUCTION: &str = "You are a world-class fitness trainer, certified personal trainer, and exercise physiologist with 20+ years of experience. You have trained Olympic athletes, bodybuilders, and everyday people. You specialize in creating scientifically-backed, personalized workout plans that deliver results.
Your expertise includes:
- Exercise physiology and biomechanics
- Progressive overload and periodization
- Injury prevention and rehabilitation
- Nutrition and recovery optimization
- Sports psychology and motivation

Your task is to generate comprehensive, personalized workout plans in JSON format only. Always return valid JSON that matches the exact structure requested. Never include any text outside the JSON object.
Core principles you must follow:
- Evidence-based exercise selection
- Progressive overload for continuous improvement
- Proper exercise form and safety first
- Balanced muscle group targeting
- Appropriate rest periods and recovery
- Realistic weight recommendations based on fitness level
- Mix of compound and isolation exercises
- Consider user's available equipment and specific goals
- Periodization and variation for long-term success";

/// Values substituted into the user template, already rendered, in template order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub fitness_level: String,
    pub activity_level: String,
    pub height: String,
    pub weight: String,
    pub goals: String,
    pub equipment: String,
    pub location: String,
    pub units: String,
    pub total_workouts: u64,
    pub current_streak: u64,
    pub longest_streak: u64,
    pub total_time: u64,
    pub total_volume: u64,
}

impl PromptContext {
    pub fn from_profile(profile: &UserProfile) -> Self {
        PromptContext {
            name: profile.display_name.clone(),
            date_of_birth: profile.date_of_birth.clone(),
            gender: profile.gender.clone(),
            fitness_level: profile.fitness_level.to_string(),
            activity_level: profile.activity_level.clone(),
            height: format!("{:.1} {}", profile.height.value, profile.height.unit)
                .trim_end()
                .to_string(),
            weight: format!("{:.1} {}", profile.weight.value, profile.weight.unit)
                .trim_end()
                .to_string(),
            goals: render_list(&profile.goals),
            equipment: render_list(&profile.equipment),
            location: profile.location.clone(),
            units: profile.units.clone(),
            total_workouts: profile.stats.total_workouts,
            current_streak: profile.stats.current_streak,
            longest_streak: profile.stats.longest_streak,
            total_time: profile.stats.total_time,
            total_volume: profile.stats.total_volume,
        }
    }

    pub fn render(&self) -> String {
        format!(
            r#"Generate a world-class, personalized workout plan for the following user:
USER PROFILE:
- Name: {name}
- Date of Birth: {date_of_birth}
- Gender: {gender}
- Fitness Level: {fitness_level}
- Activity Level: {activity_level}
- Height: {height}
- Weight: {weight}
- Goals: {goals}
- Available Equipment: {equipment}
- Location: {location}
- Units: {units}

CURRENT STATS:
- Total Workouts: {total_workouts}
- Current Streak: {current_streak}
- Longest Streak: {longest_streak}
- Total Time: {total_time} minutes
- Total Volume: {total_volume}

WORKOUT PLAN REQUIREMENTS:

STRUCTURE:
- Create 3-4 workout sessions per week based on fitness level; the plan must contain at least 1 session
- Each session should have 4-8 exercises (depending on fitness level); never leave a session without exercises
- Include warm-up and cool-down recommendations in the session note
- Balance push/pull movements across the week
- Progressive overload with realistic weight increases

EXERCISE SELECTION:
- Start with compound movements (squats, deadlifts, bench press, overhead press, rows)
- Follow with isolation exercises (curls, extensions, raises, flyes)
- Include core work in most sessions (planks, crunches, leg raises)
- Add cardio/conditioning where appropriate
- Only use the available equipment listed in the profile above

REPS AND SETS GUIDELINES:
- Beginner: 3 sets x 12-15 reps (focus on form)
- Intermediate: 4 sets x 8-12 reps (hypertrophy focus)
- Advanced: 4-5 sets x 6-8 reps (strength) or 8-12 reps (hypertrophy)
- "sets" and "reps" must be whole numbers of at least 1; express timed work (planks, cardio) as reps of 1 with the duration in the session note

REST PERIODS:
- Compound movements: 2-3 minutes
- Isolation exercises: 60-90 seconds
- Supersets: 30-60 seconds between exercises

WEIGHT RECOMMENDATIONS:
- Beginner: Bodyweight or light weights, focus on form
- Intermediate: Moderate weights, 8-12 reps for hypertrophy
- Advanced: Heavier weights, 6-8 reps for strength, 8-12 for hypertrophy
- "weight.value" must be 0 or greater; use 0 with type "bodyweight" for bodyweight exercises
- Express weights in the user's preferred units from the profile above

SAFETY AND FORM:
- Always prioritize proper form over weight
- Include form cues and safety notes
- Consider user's experience level
- Provide progression guidelines

Please generate a comprehensive workout plan in the following JSON format:

{{
  "id": 1,
  "name": "Professional Plan Name (e.g., 'Intermediate Strength Builder', 'Beginner Full Body Foundation')",
  "description": "Detailed description explaining the plan's scientific approach, expected results, and methodology.",
  "createdAt": "2024-01-15T00:00:00.000Z",
  "aiFeedbackCycle": 12,
  "planValidityPeriod": 28,
  "sessionsCompleted": 0,
  "planStartDate": "2024-01-15T00:00:00.000Z",
  "hasNewPlanSuggestion": false,
  "sessions": [
    {{
      "id": "session_1",
      "name": "Descriptive Session Name (e.g., 'Upper Body Power', 'Lower Body Strength')",
      "note": "Focus areas, form cues, breathing patterns, tempo recommendations, safety considerations, and session goals.",
      "exercises": [
        {{
          "id": 1,
          "name": "Specific Exercise Name (e.g., 'Barbell Squat', 'Dumbbell Bench Press', 'Pull-up')",
          "sets": 3,
          "reps": 10,
          "weight": {{"value": 100, "unit": "LB"}},
          "type": "weight"
        }}
      ]
    }}
  ]
}}

FIELD TYPES:
- id: integer; name, description: string; createdAt, planStartDate: RFC 3339 timestamp string
- aiFeedbackCycle, planValidityPeriod: integer number of days; sessionsCompleted: integer
- hasNewPlanSuggestion: boolean
- sessions[].id, sessions[].name, sessions[].note: string
- exercises[].id, exercises[].sets, exercises[].reps: integer
- exercises[].weight: object with numeric "value" and string "unit"
- exercises[].type: one of "weight", "bodyweight", "cardio"

SPECIFIC INSTRUCTIONS FOR OPTIMAL RESULTS:

1. EQUIPMENT UTILIZATION: Use only the available equipment from the profile
2. GOAL FOCUS: Tailor every session to the goals from the profile
3. FITNESS LEVEL ADAPTATION: Adjust difficulty to the fitness level from the profile
4. WEIGHT UNITS: Use the units from the profile
5. EXERCISE VARIATIONS: Include specific exercise variations based on available equipment
6. REALISTIC WEIGHTS: Provide realistic weight recommendations based on the user's stats
7. PROGRESSION: Provide clear progression guidelines
8. BALANCE: Ensure balanced push/pull movements throughout the week
9. MOBILITY: Include mobility and flexibility work where appropriate
10. RECOVERY: Consider rest days and recovery between sessions

EXERCISE NAMING CONVENTIONS:
- Be specific: "Barbell Squat" not just "Squat"
- Include variations: "Dumbbell Bench Press", "Incline Barbell Press"
- Specify equipment: "Cable Row", "Lat Pulldown", "Smith Machine Squat"

Return only the JSON object, no additional text, no markdown code fences, no explanations."#,
            name = self.name,
            date_of_birth = self.date_of_birth,
            gender = self.gender,
            fitness_level = self.fitness_level,
            activity_level = self.activity_level,
            height = self.height,
            weight = self.weight,
            goals = self.goals,
            equipment = self.equipment,
            location = self.location,
            units = self.units,
            total_workouts = self.total_workouts,
            current_streak = self.current_streak,
            longest_streak = self.longest_streak,
            total_time = self.total_time,
            total_volume = self.total_volume,
        )
    }
}

/// Elements in their original order, unchanged.
fn render_list(items: &[String]) -> String {
    items.join(", ")
}

pub fn build_prompt(profile: &UserProfile) -> String {
    PromptContext::from_profile(profile).render()
}
