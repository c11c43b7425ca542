// Sales-analytics pipeline
//
// Uploaded exports go through the reader, are normalized onto canonical
// columns, coerced into typed records, classified, matched to the agent
// roster and aggregated into result tables plus a sheet plan for the
// workbook writer.

pub mod aggregate;
pub mod cache;
pub mod calendar;
pub mod classify;
pub mod coerce;
pub mod error;
pub mod matcher;
pub mod pipeline;
pub mod planner;
pub mod records;
pub mod registry;
pub mod schema;

pub use calendar::{BusinessCalendar, Clock, FixedClock, SystemClock, WeekdayCalendar};
pub use classify::{CampaignKind, Channel, Classification, ProductClass};
pub use error::{ErrorKind, PipelineError, Stage, Warning};
pub use matcher::{match_agents, AgentRollup, MatchOptions, MatchOutput};
pub use pipeline::{AnalysisReport, AnalysisRequest, InputFile, Pipeline, Variant};
pub use records::{CallTimeRecord, ContractRecord, SalesRecord};
pub use registry::{AgentProfile, Roster, Team};
pub use schema::{normalize, InputKind, MissingRequired, NormalizedSheet};
