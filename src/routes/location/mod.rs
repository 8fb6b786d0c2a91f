mod handler;
mod model;

pub use handler::{
    add_photos, create_location, delete_location, get_location, list_locations, list_photos,
    search_nearby, update_location,
};
