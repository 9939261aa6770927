pub mod family_tree;
pub mod person;
