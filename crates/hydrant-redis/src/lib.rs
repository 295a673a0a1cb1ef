mod fragment_store;

pub use fragment_store::*;
