mod common;
mod parser_properties_test;
