use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use puttline::analysis::CannedGateway;
use puttline::capture::SimulatedCamera;
use puttline::config::PuttlineConfig;
use puttline::core::app::{App, Collaborators};
use puttline::core::script::Script;
use puttline::haptics::LogHaptics;
use puttline::orientation::ScriptedOrientation;
use puttline::render::image::{export_path, save_png};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = PuttlineConfig::load();
    let script = match std::env::args_os().nth(1) {
        Some(path) => Script::load(Path::new(&path))?,
        None => Script::default(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(run(config, script))
}

async fn run(config: PuttlineConfig, script: Script) -> anyhow::Result<()> {
    let camera = SimulatedCamera::new(script.camera.width, script.camera.height)
        .with_delay(Duration::from_millis(script.camera.delay_ms));
    camera.fail_start(script.camera.fail_start);
    camera.fail_next_captures(script.camera.fail_captures);

    let collaborators = Collaborators {
        camera: Arc::new(camera),
        orientation: Arc::new(ScriptedOrientation::new(
            script.orientation_granted,
            script.orientation.clone(),
        )),
        haptics: Arc::new(LogHaptics),
        gateway: Arc::new(CannedGateway::new(script.analysis.iter().cloned().map(Ok))),
    };

    let mut app = App::new(config, collaborators);
    script.run(&mut app).await?;
    report(&app)
}

fn report(app: &App) -> anyhow::Result<()> {
    let coordinator = app.coordinator();
    let view = coordinator.view();
    println!("Session ended in {}", coordinator.state().name());

    if let Some(analysis) = &view.analysis {
        let line = &analysis.response.putting_line;
        if analysis.fallback {
            println!("(analysis unreadable, showing general advice)");
        }
        println!("Line:       {}", line.direction);
        println!("Break:      {}", line.break_);
        println!("Confidence: {}", line.confidence);
        for (i, tip) in analysis.response.recommendations.iter().enumerate() {
            println!("  {}. {}", i + 1, tip);
        }
    }
    if let Some(err) = &view.analysis_error {
        println!("Analysis failed: {err}");
    }

    if let Some(image) = coordinator.annotated_image() {
        let Some(path) = export_path() else {
            log::warn!("No pictures directory, skipping export");
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        save_png(&image, &path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        println!("Saved {}", path.display());
    }
    Ok(())
}
