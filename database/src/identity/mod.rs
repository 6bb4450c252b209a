pub mod normalize;
pub mod resolver;
