mod response;

pub use response::{exit_code_for_errors, print_errors};
