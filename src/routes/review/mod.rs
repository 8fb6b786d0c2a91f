mod handler;

pub use handler::{add_review, list_reviews};
