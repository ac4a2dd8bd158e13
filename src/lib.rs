pub mod app_state;
pub mod backend;
pub mod code_gen;
pub mod io_struct;
pub mod line_parser;
pub mod relay;
pub mod server;
pub mod sse;
pub mod upload;
