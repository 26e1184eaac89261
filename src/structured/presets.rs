//! Built-in structured schemas and their typed counterparts.

use serde::{Deserialize, Serialize};

use super::shape::{FieldKind, ObjectSchema, TargetShape};

/// System prompt paired with the trip plan schema.
pub const TRIP_GUIDE_SYSTEM_PROMPT: &str = "You are an experienced travel guide. \
Plan trips day by day with concrete activities and where they take place. \
Keep each activity to one short sentence.";

/// System prompt paired with the structured answer schema.
pub const STRUCTURED_ANSWER_SYSTEM_PROMPT: &str = "You are a precise technical assistant. \
Answer the user's request by filling every field: a short topic, a one-paragraph summary, \
the key points, concrete steps, notable risks, and references the user can follow up on. \
Use empty lists rather than omitting a field.";

/// One day of a [`TripPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Day number, starting at 1.
    pub day: u32,
    /// What to do.
    pub activity: String,
    /// Where it happens.
    pub location: String,
}

/// Day-by-day trip plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPlan {
    /// Destination name.
    pub destination: String,
    /// Total number of days.
    pub total_days: u32,
    /// Daily plans in order.
    pub plans: Vec<Plan>,
}

/// General-purpose structured answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredAnswer {
    /// Short topic line.
    pub topic: String,
    /// One-paragraph summary.
    pub summary: String,
    /// Key points.
    pub key_points: Vec<String>,
    /// Concrete steps.
    pub steps: Vec<String>,
    /// Notable risks.
    pub risks: Vec<String>,
    /// References for follow-up.
    pub references: Vec<String>,
}

/// Schema of one [`Plan`].
#[must_use]
pub fn plan_schema() -> ObjectSchema {
    ObjectSchema::new("plan")
        .field("day", FieldKind::Integer)
        .field("activity", FieldKind::String)
        .field("location", FieldKind::String)
}

/// Schema of a [`TripPlan`].
#[must_use]
pub fn trip_plan_schema() -> ObjectSchema {
    ObjectSchema::new("trip_plan")
        .field("destination", FieldKind::String)
        .field("totalDays", FieldKind::Integer)
        .field("plans", FieldKind::ObjectList(plan_schema()))
}

/// Schema of a [`StructuredAnswer`].
#[must_use]
pub fn structured_answer_schema() -> ObjectSchema {
    ObjectSchema::new("structured_answer")
        .field("topic", FieldKind::String)
        .field("summary", FieldKind::String)
        .field("keyPoints", FieldKind::StringList)
        .field("steps", FieldKind::StringList)
        .field("risks", FieldKind::StringList)
        .field("references", FieldKind::StringList)
}

/// Shape for a single trip plan.
#[must_use]
pub fn trip_plan() -> TargetShape {
    TargetShape::Object(trip_plan_schema())
}

/// Shape for several complete trip plans.
#[must_use]
pub fn trip_plans() -> TargetShape {
    TargetShape::ListOf(trip_plan_schema())
}

/// Shape for a structured answer.
#[must_use]
pub fn structured_answer() -> TargetShape {
    TargetShape::Object(structured_answer_schema())
}
