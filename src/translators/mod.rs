pub mod javascript;

pub use javascript::JavaScript;
