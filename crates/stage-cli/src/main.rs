//! `stage-info`: inspect saved scene documents in a directory.
//!
//! ```text
//! stage-info <dir> list
//! stage-info <dir> show <name>
//! stage-info <dir> lint <name>
//! ```
//!
//! Set `RUST_LOG=debug` to see loader and gateway logging.

use stage_core::{
    DirectoryGateway, LintSeverity, LoadError, NodeKind, PersistenceGateway, SavedDocument, SceneGraph, lint_document,
    load_document,
};
use stage_editor::outline;
use std::collections::HashSet;
use std::process::ExitCode;

const USAGE: &str = "usage: stage-info <dir> list | show <name> | lint <name>";

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (dir, command, name) = match args.as_slice() {
        [dir, command] => (dir, command.as_str(), None),
        [dir, command, name] => (dir, command.as_str(), Some(name.as_str())),
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    let gateway = DirectoryGateway::new(dir);
    let result = match (command, name) {
        ("list", None) => list(&gateway),
        ("show", Some(name)) => show(&gateway, name),
        ("lint", Some(name)) => lint(&gateway, name),
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn list(gateway: &DirectoryGateway) -> Result<ExitCode, LoadError> {
    for name in gateway.list()? {
        println!("{name}");
    }
    Ok(ExitCode::SUCCESS)
}

fn open(gateway: &DirectoryGateway, name: &str) -> Result<(SavedDocument, SceneGraph), LoadError> {
    let doc = gateway.read(name)?;
    let mut graph = SceneGraph::new();
    let report = load_document(&mut graph, &doc)?;
    for (node, parent) in &report.unresolved_parents {
        log::warn!("`{node}`: parent `{parent}` not found, loaded at top level");
    }
    for (declared, applied) in &report.renamed {
        log::info!("id `{declared}` loaded as `{applied}`");
    }
    Ok((doc, graph))
}

fn show(gateway: &DirectoryGateway, name: &str) -> Result<ExitCode, LoadError> {
    let (doc, graph) = open(gateway, name)?;
    println!(
        "{name}: version {}, {} node(s), {} light(s), {} material(s)",
        doc.version,
        doc.node_count(),
        doc.lights.len(),
        doc.materials.len()
    );
    for row in outline(&graph, &HashSet::new()) {
        let node = &graph.graph[row.node];
        let kind = match &node.kind {
            NodeKind::Primitive { shape, material, .. } => match material {
                Some(material) => format!("{} [{material}]", shape.as_str()),
                None => shape.as_str().to_string(),
            },
            NodeKind::LightProxy { .. } => match graph.light_of(row.node) {
                Some(light) => format!("{:?} light", light.kind),
                None => "light".to_string(),
            },
            NodeKind::TransformNode => "empty".to_string(),
            NodeKind::Root | NodeKind::PivotAnchor => continue,
        };
        let p = graph.world_position(row.node);
        println!(
            "{:indent$}{} ({kind}) at ({:.2}, {:.2}, {:.2})",
            "",
            node.id,
            p.x,
            p.y,
            p.z,
            indent = row.depth * 2
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn lint(gateway: &DirectoryGateway, name: &str) -> Result<ExitCode, LoadError> {
    let (_, graph) = open(gateway, name)?;
    let diags = lint_document(&graph);
    for d in &diags {
        let severity = match d.severity {
            LintSeverity::Error => "error",
            LintSeverity::Warning => "warning",
            LintSeverity::Info => "info",
        };
        match d.node_id {
            Some(id) => println!("{severity}[{}] `{id}`: {}", d.rule, d.message),
            None => println!("{severity}[{}]: {}", d.rule, d.message),
        }
    }
    if diags.iter().any(|d| d.severity == LintSeverity::Error) {
        Ok(ExitCode::FAILURE)
    } else {
        if diags.is_empty() {
            println!("{name}: clean");
        }
        Ok(ExitCode::SUCCESS)
    }
}
