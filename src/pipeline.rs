use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::ai_client::LlmProvider;
use crate::error::{GenerationError, PlanError, Stage};
use crate::models::WorkoutPlan;
use crate::parser::parse_plan;
use crate::profile::translate;
use crate::prompts::{build_prompt, SYSTEM_INSTRUCTION};

/// Raw profile in, validated plan out. Holds nothing but the shared backend,
/// so one instance serves any number of concurrent requests.
#[derive(Clone)]
pub struct WorkoutPlanGenerator {
    provider: Arc<dyn LlmProvider>,
    debug_prompt: bool,
}

impl WorkoutPlanGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            debug_prompt: false,
        }
    }

    pub fn with_debug_prompt(mut self, enabled: bool) -> Self {
        self.debug_prompt = enabled;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn generate_workout_plan(
        &self,
        raw_profile: &Value,
    ) -> Result<WorkoutPlan, GenerationError> {
        let profile = translate(raw_profile).map_err(GenerationError::at(Stage::Translate))?;
        info!(
            "Generating {} workout plan for '{}' via {}",
            profile.fitness_level,
            profile.display_name,
            self.provider.name()
        );

        let prompt = build_prompt(&profile);
        // Unreachable with the current template.
        if prompt.trim().is_empty() {
            return Err(GenerationError::at(Stage::BuildPrompt)(PlanError::validation(
                "prompt",
                "rendered prompt is empty",
            )));
        }
        if self.debug_prompt {
            debug!("Prompt sent to {}:\n{}", self.provider.name(), prompt);
        }

        let raw_text = self
            .provider
            .generate(&prompt, SYSTEM_INSTRUCTION)
            .await
            .map_err(|e| {
                warn!("{} generation failed: {}", self.provider.name(), e);
                GenerationError::at(Stage::Generate)(e)
            })?;
        info!("Received {} bytes from {}", raw_text.len(), self.provider.name());

        let plan = parse_plan(&raw_text).map_err(|e| {
            warn!("Rejected {} reply: {}", self.provider.name(), e);
            GenerationError::at(Stage::Parse)(e)
        })?;

        info!(
            "Workout plan '{}' ready with {} sessions",
            plan.name,
            plan.sessions.len()
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays a fixed reply and records what it was asked.
    struct Scripted {
        reply: Result<String, fn() -> PlanError>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl Scripted {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(error: fn() -> PlanError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(error),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(&self, prompt: &str, system: &str) -> Result<String, PlanError> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), system.to_string()));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    const PLAN: &str = r#"{"id":3,"name":"Full Body Foundation","sessions":[{"id":"s1","name":"Day 1","note":"","exercises":[{"id":1,"name":"Goblet Squat","sets":3,"reps":12,"weight":{"value":10,"unit":"kg"},"type":"weight"}]}]}"#;

    fn profile() -> Value {
        json!({
            "fullName": "Sam Lee",
            "fitnessLevel": "beginner",
            "equipment": ["kettlebell"],
            "goals": ["general_fitness"]
        })
    }

    #[tokio::test]
    async fn runs_every_stage_in_order() {
        let provider = Scripted::ok(PLAN);
        let generator = WorkoutPlanGenerator::new(provider.clone());

        let plan = generator.generate_workout_plan(&profile()).await.unwrap();
        assert_eq!(plan.name, "Full Body Foundation");
        assert_eq!(plan.sessions[0].exercises[0].name, "Goblet Squat");

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].0.contains("- Name: Sam Lee"));
        assert_eq!(prompts[0].1, SYSTEM_INSTRUCTION);
    }

    #[tokio::test]
    async fn translate_failure_never_reaches_the_provider() {
        let provider = Scripted::ok(PLAN);
        let generator = WorkoutPlanGenerator::new(provider.clone());

        let err = generator
            .generate_workout_plan(&json!({"fitnessLevel": "expert"}))
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Translate);
        assert!(matches!(err.source, PlanError::Validation { .. }));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn provider_failure_is_tagged_with_generate_stage() {
        let provider = Scripted::failing(|| {
            PlanError::Config("OPEN_AI_API_KEY environment variable is not set".into())
        });
        let generator = WorkoutPlanGenerator::new(provider);

        let err = generator.generate_workout_plan(&profile()).await.unwrap_err();
        assert_eq!(err.stage, Stage::Generate);
        assert!(matches!(err.source, PlanError::Config(_)));
    }

    #[tokio::test]
    async fn bad_reply_is_tagged_with_parse_stage() {
        let generator = WorkoutPlanGenerator::new(Scripted::ok("Sure! Here is your plan: {...}"));
        let err = generator.generate_workout_plan(&profile()).await.unwrap_err();
        assert_eq!(err.stage, Stage::Parse);
        assert!(matches!(err.source, PlanError::Parse { .. }));

        let generator = WorkoutPlanGenerator::new(Scripted::ok(r#"{"id":1,"sessions":[]}"#));
        let err = generator.generate_workout_plan(&profile()).await.unwrap_err();
        assert_eq!(err.stage, Stage::Parse);
        assert!(matches!(err.source, PlanError::Validation { .. }));
    }
}
