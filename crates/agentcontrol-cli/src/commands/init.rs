//! Init command - create the project capsule.

use agentcontrol_core::{ProjectId, exit};

use crate::app::App;
use crate::theme::Theme;

/// Initialise `--path` (or the working directory) as a project.
pub(crate) fn run_init(app: &App) -> anyhow::Result<i32> {
    let project = ProjectId::init(app.start_dir())?;

    println!(
        "{}",
        Theme::success(&format!(
            "Initialized project at {}",
            project.root().display()
        ))
    );
    println!("  Capsule:  {}", project.capsule_dir().display());
    println!("  Manifest: {}", project.manifest_path().display());
    println!();
    println!(
        "{}",
        Theme::dimmed("Next: edit the manifest, then run `agentcall list`.")
    );
    Ok(exit::SUCCESS)
}
