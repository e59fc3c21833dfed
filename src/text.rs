pub(crate) mod normalize;
pub(crate) mod segment;
