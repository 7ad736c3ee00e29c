use crate::app::command_support::{parse_server_id, required_arg, CliContext};
use crate::control::run_control_server;
use crate::translator::ServiceConfig;

pub fn cmd_serve(context: &CliContext) -> Result<String, String> {
    let log = context.log().with_echo(true);
    println!(
        "listening on http://{}{}",
        context.settings.listen,
        crate::control::CONTROL_PATH
    );
    let terminated = run_control_server(&context.settings, log)?;
    Ok(format!("stopped\nterminated={terminated}"))
}

pub fn cmd_start(context: &CliContext, args: &[String]) -> Result<String, String> {
    let server_id = parse_server_id(required_arg(args, 0, "server-id")?)?;
    let services = parse_service_options(&args[1..])?;
    let url = context
        .client()
        .start(server_id.as_str(), &services)
        .map_err(|e| e.to_string())?;
    Ok(format!("started\nserver_id={server_id}\nurl={url}"))
}

pub fn cmd_stop(context: &CliContext, args: &[String]) -> Result<String, String> {
    let server_id = parse_server_id(required_arg(args, 0, "server-id")?)?;
    let success = context
        .client()
        .stop(server_id.as_str())
        .map_err(|e| e.to_string())?;
    Ok(format!("stopped\nserver_id={server_id}\nsuccess={success}"))
}

pub fn cmd_status(context: &CliContext, args: &[String]) -> Result<String, String> {
    let server_id = parse_server_id(required_arg(args, 0, "server-id")?)?;
    let status = context
        .client()
        .status(server_id.as_str())
        .map_err(|e| e.to_string())?;
    Ok(format!(
        "server_id={server_id}\nrunning={}\nurl={}",
        status.running,
        status.url.as_deref().unwrap_or("none")
    ))
}

pub fn parse_service_options(args: &[String]) -> Result<Vec<ServiceConfig>, String> {
    let mut services = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let raw = match arg.as_str() {
            "--service" => iter
                .next()
                .map(String::as_str)
                .ok_or_else(|| "`--service` requires kind=value".to_string())?,
            other => match other.strip_prefix("--service=") {
                Some(raw) => raw,
                None => return Err(format!("unexpected argument `{other}`")),
            },
        };
        services.push(ServiceConfig::parse_assignment(raw)?);
    }
    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_options_accept_both_spellings_in_order() {
        let args: Vec<String> = ["--service", "redis=redis://x", "--service=github=tok"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let services = parse_service_options(&args).expect("parse");
        assert_eq!(
            services,
            vec![
                ServiceConfig::new("redis", "redis://x"),
                ServiceConfig::new("github", "tok"),
            ]
        );
    }

    #[test]
    fn stray_arguments_are_rejected() {
        let args = vec!["redis=redis://x".to_string()];
        assert!(parse_service_options(&args).is_err());
    }
}
