//! Data models for ats-survey

pub mod participant;
pub mod response;

pub use participant::Demographics;
pub use response::{ClipRating, ResponseSubmission, SurveyResponse};
