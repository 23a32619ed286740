pub(crate) mod association;
pub(crate) mod drag_drop;
pub(crate) mod geometry;
pub(crate) mod masking;
pub(crate) mod session;
