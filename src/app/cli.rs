#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Serve,
    Start,
    Stop,
    Status,
    Launch,
    Validate,
    Chat,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "serve" => CliVerb::Serve,
        "start" => CliVerb::Start,
        "stop" => CliVerb::Stop,
        "status" => CliVerb::Status,
        "launch" => CliVerb::Launch,
        "validate" => CliVerb::Validate,
        "chat" => CliVerb::Chat,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Usage: fusion [--config <path>] [--endpoint <url>] <command> [args]".to_string(),
        String::new(),
        "Commands:".to_string(),
        "  serve                                      Run the control endpoint until Ctrl-C"
            .to_string(),
        "  start <server-id> [--service kind=value]   Start (or reuse) a composite server"
            .to_string(),
        "  stop <server-id>                           Stop a composite server".to_string(),
        "  status <server-id>                         Show whether a server is running"
            .to_string(),
        "  launch <graph.yaml> <composite-id>         Validate a graph and start one composite"
            .to_string(),
        "  validate <graph.yaml> <composite-id>       Validate a graph without starting anything"
            .to_string(),
        "  chat <server-id> <message>                 Send one message to a running server"
            .to_string(),
        "  help                                       Show this help".to_string(),
    ]
}

pub fn help_text() -> String {
    cli_help_lines().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_command_parses_to_a_known_verb() {
        for line in cli_help_lines().iter().skip(3) {
            let verb = line.split_whitespace().next().expect("command name");
            assert_ne!(parse_cli_verb(verb), CliVerb::Unknown, "{verb}");
        }
    }
}
