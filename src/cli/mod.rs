pub mod args;
pub mod equalize;
pub mod inspect;
