mod canvas;
mod renderer;

pub use renderer::Renderer;
