pub mod builders;
pub mod constants;
pub mod parsers;
