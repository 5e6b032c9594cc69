pub mod backends;
pub mod config;
pub mod id_card_reader;
pub mod models;
pub mod processing;
pub mod utils;

pub use config::ReaderConfig;
pub use id_card_reader::IdCardReader;
pub use utils::IdCardError;
