pub mod fit;
pub mod inspect;
