//! Request handlers, grouped by resource

pub(crate) mod apu;
pub(crate) mod fans;
pub(crate) mod info;
