pub(crate) mod bubble;
pub(crate) mod cpu;
pub(crate) mod text;
