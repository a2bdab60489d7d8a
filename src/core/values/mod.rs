pub mod value_coercer;

pub use value_coercer::{is_blank_cell, parse_excel_value};
