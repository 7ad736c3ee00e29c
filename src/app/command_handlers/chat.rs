use crate::app::command_support::{parse_server_id, required_arg, CliContext};
use crate::chat::{ChatRelay, ChatSession};

pub fn cmd_chat(context: &CliContext, args: &[String]) -> Result<String, String> {
    if args.len() < 2 {
        return Err("usage: chat <server-id> <message>".to_string());
    }
    let server_id = parse_server_id(required_arg(args, 0, "server-id")?)?;
    let message = args[1..].join(" ");

    let status = context
        .client()
        .status(server_id.as_str())
        .map_err(|e| e.to_string())?;
    let url = match (status.running, status.url) {
        (true, Some(url)) => url,
        _ => return Err(format!("server `{server_id}` is not running")),
    };

    let relay = ChatRelay::with_timeout(url.clone(), context.chat_timeout());
    let mut session = ChatSession::new(server_id.as_str(), relay).with_log(context.log());
    let reply = session
        .send(&message)
        .map(|reply| reply.content.clone())
        .ok_or_else(|| "message must be non-empty".to_string())?;

    Ok(format!("server_id={server_id}\nurl={url}\n\n{reply}"))
}
