mod app;
mod users;

pub use app::{add_routes, AppState};
