pub mod attributes;
pub mod link;
pub mod node;
pub mod shape;
