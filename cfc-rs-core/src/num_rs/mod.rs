mod find_first;

pub use find_first::*;
