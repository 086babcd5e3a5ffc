//! Runtime facilities handed to extension modules.

pub mod context;
