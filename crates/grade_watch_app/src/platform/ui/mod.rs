pub mod notice;
pub mod render;
