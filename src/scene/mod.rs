pub(crate) mod markup;
pub(crate) mod model;
