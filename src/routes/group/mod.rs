mod handler;
mod model;

pub use handler::{attach_location, create_group, get_group, join_group, list_groups};
