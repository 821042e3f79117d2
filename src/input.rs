pub mod parser;
pub mod readline;
