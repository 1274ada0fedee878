use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TaskError;
use crate::tasks::{ExecutionContext, Task, TaskHandler, TaskType};

use super::{aggregation, complex, content, date_range, metadata, metrics, sentiment, validation};

/// Runs every journal task family.
///
/// This is the default handler of the pool and of the fallback executor, so
/// both paths compute with the same functions.
#[derive(Clone, Copy, Debug, Default)]
pub struct JournalHandler;

impl JournalHandler {
    pub fn new() -> Self {
        Self
    }
}

fn family<Req, Out>(
    task: &Task,
    ctx: &ExecutionContext,
    f: fn(&Req, &ExecutionContext) -> Result<Out, TaskError>,
) -> Result<Value, TaskError>
where
    Req: DeserializeOwned,
    Out: Serialize,
{
    let req = Req::deserialize(&task.payload)?;
    let out = f(&req, ctx)?;
    Ok(serde_json::to_value(out)?)
}

impl TaskHandler for JournalHandler {
    fn execute(&self, task: &Task, ctx: &ExecutionContext) -> Result<Value, TaskError> {
        match task.task_type {
            TaskType::DateRangeFilter => family(task, ctx, date_range::run),
            TaskType::ContentFilter => family(task, ctx, content::run),
            TaskType::MetadataFilter => family(task, ctx, metadata::run),
            TaskType::ComplexFilter => family(task, ctx, complex::run),
            TaskType::Validation => family(task, ctx, validation::run),
            TaskType::MetricsExtraction => family(task, ctx, metrics::run),
            TaskType::SentimentScoring => family(task, ctx, sentiment::run),
            TaskType::Aggregation => family(task, ctx, aggregation::run),
        }
    }
}
