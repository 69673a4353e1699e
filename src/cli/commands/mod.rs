pub mod inspect;
pub mod reset;
pub mod train;
