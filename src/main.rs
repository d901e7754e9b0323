//! policy-adapter CLI entry point
//!
//! Installs the log subscriber, delegates to `cli::run`, and on failure
//! reports the error as JSON on stdout and exits non-zero.

use policy_store_adapter::{cli, observability};

fn main() {
    observability::init_logging();

    if let Err(e) = cli::run() {
        if cli::write_error(e.code_str(), e.message()).is_err() {
            eprintln!("{}", e);
        }
        std::process::exit(1);
    }
}
