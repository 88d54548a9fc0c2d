pub mod colors;
pub mod display;
pub mod renderer;

pub use colors::*;
pub use display::*;
pub use renderer::*;
