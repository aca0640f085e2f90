mod health;
mod url;

pub use health::health_handler;
pub use url::{
    bulk_shorten_handler, delete_handler, list_handler, redirect_handler, shorten_handler,
    stats_handler,
};
