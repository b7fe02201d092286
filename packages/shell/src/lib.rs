pub mod ast;
pub mod error;
pub mod lexer;
pub mod mode;
pub mod parser;
pub mod serialize;
pub mod token;

pub use error::ParseError;
pub use mode::ParserMode;
