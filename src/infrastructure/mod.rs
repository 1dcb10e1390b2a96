pub mod factom;
pub mod persistence;
pub mod wallet;
