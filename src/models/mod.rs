pub mod gemini;
pub mod image;
pub mod progress;
pub mod request;

pub use gemini::*;
pub use image::*;
pub use progress::*;
pub use request::*;
