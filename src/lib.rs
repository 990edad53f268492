pub mod annotate;
pub mod app;
pub mod export;
pub mod gui;
pub mod io;
pub mod render;
pub mod rotated_text;
pub mod tree;
