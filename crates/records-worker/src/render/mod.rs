pub mod html;

pub use html::{render_contract, RenderedDocument};
