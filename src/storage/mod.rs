pub mod csv_writer;

pub use csv_writer::{write_groups, write_wave_data, OutputLayout};
