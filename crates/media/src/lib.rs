//! Size-constrained audio delivery pipeline.
//!
//! A request's audio is downloaded once, measured against the transport's
//! size budget, split into fixed-duration parts when it is too large, and
//! uploaded part by part in playback order. Every local file a request
//! creates is gone by the time [`RequestHandler::handle`] returns.

pub mod acquire;
pub mod delivery;
pub mod error;
pub mod gate;
pub mod handler;
pub mod pipeline;
pub mod planner;
pub mod segment;
pub mod source_url;
pub mod tools;

pub use {
    acquire::{AcquireRequest, AcquireTool, Acquirer},
    delivery::DeliveryManager,
    error::{Error, Result},
    gate::{Route, SizeGate},
    handler::{RequestHandler, RequestOutcome, RequestState},
    pipeline::PipelineConfig,
    planner::plan_segment_seconds,
    segment::{PartSet, SegmentTool, Segmenter},
    source_url::is_supported_url,
};
