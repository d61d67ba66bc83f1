pub mod cards;
pub mod export;
pub mod inspect;
pub mod media;
pub mod stats;
pub mod study;
