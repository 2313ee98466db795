pub mod cart_reader;
pub mod catalog_reader;
