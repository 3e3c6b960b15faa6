pub mod image_io;
pub mod report;
pub mod ser;
pub mod ser_writer;

pub use image_io::{load_image, load_image_sequence, save_image, save_image_sequence};
pub use report::{read_report_json, write_report_json, write_shift_table};
pub use ser::{SerHeader, SerReader};
pub use ser_writer::{write_corrected_ser, SerWriter};
