//! Sandbox commands - create, list, remove and purge workspaces.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use agentcontrol_core::exit;
use agentcontrol_sandbox::{MetadataValue, SandboxDescriptor, SandboxManager, SandboxResult};
use serde_json::json;

use crate::app::App;
use crate::theme::Theme;

/// Create a sandbox and populate it from `<templates>/<kind>/` when that
/// template exists.
pub(crate) fn create_sandbox(
    app: &App,
    kind: Option<&str>,
    meta: &[String],
    json: bool,
) -> anyhow::Result<i32> {
    let project = app.project()?;
    let manager = SandboxManager::new(project);
    let kind = kind.unwrap_or(app.config().sandbox.default_kind.as_str());
    let metadata = meta
        .iter()
        .map(|entry| MetadataValue::parse_entry(entry))
        .collect::<SandboxResult<BTreeMap<_, _>>>()?;

    let descriptor = app.recorded(
        "sandbox.create",
        "sandbox",
        json!({ "path": project.root(), "kind": kind }),
        || Ok(provision(app, &manager, kind, metadata)?),
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(exit::SUCCESS);
    }

    println!(
        "{}",
        Theme::success(&format!("Created sandbox {}", descriptor.sandbox_id))
    );
    println!("  workspace: {}", descriptor.path.display());
    if !descriptor.metadata.is_empty() {
        println!("  metadata:");
        for (key, value) in &descriptor.metadata {
            println!("    {key}: {value}");
        }
    }
    println!(
        "{}",
        Theme::dimmed(&format!("next steps: cd {}", descriptor.path.display()))
    );
    Ok(exit::SUCCESS)
}

/// Create a sandbox of `kind` under `manager`.
pub(crate) fn provision(
    app: &App,
    manager: &SandboxManager,
    kind: &str,
    metadata: BTreeMap<String, MetadataValue>,
) -> SandboxResult<SandboxDescriptor> {
    let template = app.settings().template_dir.join(kind);
    let required = kind != app.config().sandbox.default_kind;
    manager.create(
        kind,
        |target| materialise(&template, target, required),
        metadata,
    )
}

fn materialise(template: &Path, target: &Path, required: bool) -> io::Result<()> {
    if template.is_dir() {
        return copy_tree(template, target);
    }
    if required {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("template {} not found", template.display()),
        ));
    }
    Ok(())
}

/// Copy the contents of `src` into the existing directory `dst`.
fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            std::fs::create_dir_all(&to)?;
            copy_tree(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

pub(crate) fn list_sandboxes(app: &App, json: bool) -> anyhow::Result<i32> {
    let project = app.project()?;
    let manager = SandboxManager::new(project);
    let sandboxes = app.recorded(
        "sandbox.list",
        "sandbox",
        json!({ "path": project.root() }),
        || Ok(manager.list()?),
    )?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "sandboxes": sandboxes }))?
        );
        return Ok(exit::SUCCESS);
    }

    if sandboxes.is_empty() {
        println!("{}", Theme::info("No sandboxes"));
        return Ok(exit::SUCCESS);
    }

    println!("{}", Theme::header("Sandboxes"));
    println!("  {:<24} {:<12} {:<8} CREATED", "ID", "KIND", "STATUS");
    println!("{}", Theme::separator());
    for sandbox in &sandboxes {
        println!(
            "  {:<24} {:<12} {:<8} {}",
            sandbox.sandbox_id,
            sandbox.kind,
            sandbox.status.to_string(),
            Theme::timestamp(&sandbox.created_at)
        );
    }
    println!(
        "\n{}",
        Theme::dimmed(&format!("{} sandbox(es)", sandboxes.len()))
    );
    Ok(exit::SUCCESS)
}

/// Remove one sandbox. An unknown id is reported, not treated as an error.
pub(crate) fn remove_sandbox(app: &App, id: &str, json: bool) -> anyhow::Result<i32> {
    let project = app.project()?;
    let manager = SandboxManager::new(project);
    let removed = app.recorded(
        "sandbox.remove",
        "sandbox",
        json!({ "path": project.root(), "sandbox_id": id }),
        || Ok(manager.remove(id)?),
    )?;

    if json {
        let status = if removed { "removed" } else { "not_found" };
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "status": status, "sandbox_id": id }))?
        );
    } else if removed {
        println!("{}", Theme::success(&format!("Removed sandbox {id}")));
    } else {
        println!("{}", Theme::warning(&format!("Nothing removed for sandbox {id}")));
    }
    Ok(exit::SUCCESS)
}

pub(crate) fn purge_sandboxes(app: &App, json: bool) -> anyhow::Result<i32> {
    let project = app.project()?;
    let manager = SandboxManager::new(project);
    let removed = app.recorded(
        "sandbox.purge",
        "sandbox",
        json!({ "path": project.root() }),
        || Ok(manager.purge_all()?),
    )?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "removed": removed }))?
        );
        return Ok(exit::SUCCESS);
    }

    if removed.is_empty() {
        println!("{}", Theme::info("No sandboxes to purge"));
    } else {
        for sandbox in &removed {
            println!("  {}", Theme::dimmed(&sandbox.sandbox_id));
        }
        println!(
            "{}",
            Theme::success(&format!("Purged {} sandbox(es)", removed.len()))
        );
    }
    Ok(exit::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_tree_copies_nested_files() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("docs")).unwrap();
        std::fs::write(src.path().join("README.md"), "root").unwrap();
        std::fs::write(src.path().join("docs/guide.md"), "guide").unwrap();

        copy_tree(src.path(), dst.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dst.path().join("docs/guide.md")).unwrap(),
            "guide"
        );
        assert!(dst.path().join("README.md").is_file());
    }

    #[test]
    fn test_missing_template_only_fails_when_required() {
        let target = tempfile::tempdir().unwrap();
        let absent = target.path().join("no-such-template");

        assert!(materialise(&absent, target.path(), false).is_ok());
        let err = materialise(&absent, target.path(), true).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
