use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::{is_unset_timestamp, WorkoutPlan};

/// Where generated plans go after the pipeline returns them.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Stores the plan under a fresh id and returns it with that id set.
    async fn save(&self, user_id: &str, plan: WorkoutPlan) -> WorkoutPlan;

    async fn get(&self, plan_id: i64) -> Option<WorkoutPlan>;

    /// Replaces an existing plan, keeping its id and any timestamps the new
    /// body leaves unset. `None` if there was nothing to replace.
    async fn update(&self, plan_id: i64, plan: WorkoutPlan) -> Option<WorkoutPlan>;

    async fn delete(&self, plan_id: i64) -> bool;

    async fn list_for_user(&self, user_id: &str) -> Vec<WorkoutPlan>;
}

struct StoredPlan {
    user_id: String,
    plan: WorkoutPlan,
}

#[derive(Default)]
struct Plans {
    next_id: i64,
    by_id: HashMap<i64, StoredPlan>,
}

/// Process-lifetime store; nothing survives a restart.
#[derive(Default)]
pub struct InMemoryPlanStore {
    inner: RwLock<Plans>,
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn save(&self, user_id: &str, mut plan: WorkoutPlan) -> WorkoutPlan {
        let mut plans = self.inner.write().await;
        plans.next_id += 1;
        plan.id = plans.next_id;
        plans.by_id.insert(
            plan.id,
            StoredPlan {
                user_id: user_id.to_string(),
                plan: plan.clone(),
            },
        );
        plan
    }

    async fn get(&self, plan_id: i64) -> Option<WorkoutPlan> {
        self.inner
            .read()
            .await
            .by_id
            .get(&plan_id)
            .map(|stored| stored.plan.clone())
    }

    async fn update(&self, plan_id: i64, mut plan: WorkoutPlan) -> Option<WorkoutPlan> {
        let mut plans = self.inner.write().await;
        let stored = plans.by_id.get_mut(&plan_id)?;
        plan.id = plan_id;
        if is_unset_timestamp(&plan.created_at) {
            plan.created_at = stored.plan.created_at;
        }
        if is_unset_timestamp(&plan.plan_start_date) {
            plan.plan_start_date = stored.plan.plan_start_date;
        }
        stored.plan = plan.clone();
        Some(plan)
    }

    async fn delete(&self, plan_id: i64) -> bool {
        self.inner.write().await.by_id.remove(&plan_id).is_some()
    }

    async fn list_for_user(&self, user_id: &str) -> Vec<WorkoutPlan> {
        let plans = self.inner.read().await;
        let mut owned: Vec<WorkoutPlan> = plans
            .by_id
            .values()
            .filter(|stored| stored.user_id == user_id)
            .map(|stored| stored.plan.clone())
            .collect();
        owned.sort_by_key(|plan| plan.id);
        owned
    }
}
