use crate::app::cli::{help_text, parse_cli_verb, CliVerb};
use crate::app::command_support::{load_context, split_global_options};

pub mod chat;
pub mod graph;
pub mod servers;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let (options, args) = split_global_options(args)?;
    if args.is_empty() {
        return Ok(help_text());
    }

    let rest = &args[1..];
    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Help => Ok(help_text()),
        CliVerb::Validate => graph::cmd_validate(rest),
        CliVerb::Serve => servers::cmd_serve(&load_context(&options)?),
        CliVerb::Start => servers::cmd_start(&load_context(&options)?, rest),
        CliVerb::Stop => servers::cmd_stop(&load_context(&options)?, rest),
        CliVerb::Status => servers::cmd_status(&load_context(&options)?, rest),
        CliVerb::Launch => graph::cmd_launch(&load_context(&options)?, rest),
        CliVerb::Chat => chat::cmd_chat(&load_context(&options)?, rest),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}
