//! One-shot and periodic post creation

mod controller;

pub use controller::PostController;
