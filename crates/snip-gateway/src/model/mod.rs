mod health;
mod url;

pub use health::HealthResponse;
pub use url::{
    BulkResultItem, BulkShortenRequest, BulkShortenResponse, ListItem, MessageResponse,
    ShortenRequest, ShortenResponse, StatsResponse,
};
