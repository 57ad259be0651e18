use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A hook at the latest stored version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    pub hook_group_id: String,
    pub hook_id: String,
    pub metadata: Value,
    /// Task template rendered each time the hook fires.
    pub task: Value,
    pub bindings: Value,
    pub schedule: Value,
    pub trigger_token: String,
    /// `{"result": "success", "taskId": ..}`, `{"result": "error", "error": ..}` or `{"result": "no-fire"}`.
    pub last_fire: Value,
    /// Task id reserved for the next scheduled fire, so scheduling stays idempotent.
    pub next_task_id: String,
    pub next_scheduled_date: DateTime<Utc>,
    pub trigger_schema: Value,
}

/// The public view of a hook. Secrets and scheduling state are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookDefinition {
    pub hook_id: String,
    pub hook_group_id: String,
    pub bindings: Value,
    pub metadata: Value,
    pub task: Value,
    pub schedule: Value,
    pub trigger_schema: Value,
}

impl Hook {
    pub fn definition(&self) -> HookDefinition {
        HookDefinition {
            hook_id: self.hook_id.clone(),
            hook_group_id: self.hook_group_id.clone(),
            bindings: self.bindings.clone(),
            metadata: self.metadata.clone(),
            task: self.task.clone(),
            schedule: self.schedule.clone(),
            trigger_schema: self.trigger_schema.clone(),
        }
    }
}

/// One recorded fire of a hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastFire {
    pub hook_group_id: String,
    pub hook_id: String,
    pub fired_by: String,
    pub task_id: String,
    pub task_create_time: DateTime<Utc>,
    pub result: String,
    pub error: String,
}

/// Message queue bound to a hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookQueue {
    pub hook_group_id: String,
    pub hook_id: String,
    pub queue_name: String,
    pub bindings: Value,
}
