use crate::app::command_support::{required_arg, CliContext};
use crate::graph::{GraphDocument, GraphModel};
use crate::translator::translate_services;
use crate::workspace::Workspace;
use std::path::Path;

fn load_graph(path: &str) -> Result<GraphModel, String> {
    GraphDocument::from_path(Path::new(path))
        .and_then(GraphDocument::into_model)
        .map_err(|e| e.to_string())
}

pub fn cmd_validate(args: &[String]) -> Result<String, String> {
    let path = required_arg(args, 0, "graph.yaml")?;
    let composite = required_arg(args, 1, "composite-id")?;
    let graph = load_graph(path)?;
    let services = graph
        .validate_for_start(composite)
        .map_err(|e| e.to_string())?;
    let flag_set = translate_services(&services);

    let mut lines = vec![
        "valid".to_string(),
        format!("composite={composite}"),
        format!("services={}", services.len()),
    ];
    for flag in &flag_set.flags {
        lines.push(format!("flag=--{}", flag.kind.flag_name()));
    }
    for unknown in &flag_set.unknown {
        lines.push(format!("unknown_kind={}", unknown.name));
    }
    Ok(lines.join("\n"))
}

pub fn cmd_launch(context: &CliContext, args: &[String]) -> Result<String, String> {
    let path = required_arg(args, 0, "graph.yaml")?;
    let composite = required_arg(args, 1, "composite-id")?;
    let graph = load_graph(path)?;
    let mut workspace = Workspace::with_graph(graph, context.client(), context.log())
        .with_chat_timeout(context.chat_timeout());
    let url = workspace
        .start_composite(composite)
        .map_err(|e| e.to_string())?;
    Ok(format!("started\ncomposite={composite}\nurl={url}"))
}
