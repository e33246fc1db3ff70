pub mod cpu;
pub mod parser;
pub mod source;
