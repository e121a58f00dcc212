use std::process;

use clap::Parser;

mod flow;
mod interrupt;
mod render;


/// Self-updating launcher: keeps the core package current, then hands the
/// invocation over to it. Everything after the launcher's own flags belongs
/// to the core package and is forwarded untouched.
#[derive(Parser, Debug)]
#[command(name = "hoist")]
#[command(about = "Self-updating launcher for the hoist core package", long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Clear a held install lock before installing.
    #[arg(long)]
    force: bool,
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    match flow::run(&cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            render::report_error(&err);
            process::exit(1);
        }
    }
}
