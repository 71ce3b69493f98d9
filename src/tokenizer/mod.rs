pub mod keyword;
pub mod scanner;
