pub mod episodes;
pub mod settings;
pub mod shows;
