pub mod bigfield;
pub mod biggroup;
pub mod bool;
pub mod field;
pub mod witness;
