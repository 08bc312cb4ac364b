pub mod actions;
pub mod resolver;
