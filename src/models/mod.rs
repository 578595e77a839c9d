pub mod link;

pub use link::{AnalyticsResponse, CreateLinkRequest, CreateLinkResponse, LinkRecord};
