pub mod generic_key;
pub mod int_comparator;
