pub mod info;

pub use info::router;
