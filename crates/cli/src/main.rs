#![deny(unsafe_code)]
//! CLI binary for hello-triangle.
//!
//! Subcommands:
//! - `render <scene>` draws a scene with the software backend, writes PNG
//! - `list` prints available scenes
//! - `check <scene>` compiles and links the scene's shaders only

mod error;
mod logging;

use clap::{Args, Parser, Subcommand};
use error::CliError;
use hello_triangle_core::render::compile_program;
use hello_triangle_core::{Gpu, RenderError, Scene, ShaderSources, SoftwareGpu};
use hello_triangle_scenes::pixel::covered_pixels;
use hello_triangle_scenes::{render_software, SceneKind};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "hello-triangle", about = "Single-triangle draw chain CLI")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Log every step of the draw chain.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Replacement shader sources read from disk.
#[derive(Args)]
struct ShaderOverrides {
    /// Vertex shader source file to use instead of the built-in one.
    #[arg(long)]
    vertex: Option<PathBuf>,

    /// Fragment shader source file to use instead of the built-in one.
    #[arg(long)]
    fragment: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Draw a scene with the software backend and write a PNG snapshot.
    Render {
        /// Scene name (e.g. "colored").
        scene: String,

        /// Surface width in pixels.
        #[arg(short = 'W', long, default_value_t = 256)]
        width: usize,

        /// Surface height in pixels.
        #[arg(short = 'H', long, default_value_t = 256)]
        height: usize,

        /// Output file path.
        #[arg(short, long, default_value = "triangle.png")]
        output: PathBuf,

        /// Vertex data overrides as a JSON string.
        #[arg(long, default_value = "{}")]
        params: String,

        #[command(flatten)]
        shaders: ShaderOverrides,
    },
    /// List available scenes.
    List,
    /// Compile and link a scene's shaders without drawing.
    Check {
        /// Scene name (e.g. "solid").
        scene: String,

        #[command(flatten)]
        shaders: ShaderOverrides,
    },
}

fn read_source(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::Io(format!("{}: {e}", path.display())))
}

impl ShaderOverrides {
    fn apply(&self, sources: &mut ShaderSources) -> Result<(), CliError> {
        if let Some(path) = &self.vertex {
            sources.vertex = read_source(path)?;
        }
        if let Some(path) = &self.fragment {
            sources.fragment = read_source(path)?;
        }
        Ok(())
    }
}

fn load_scene(name: &str, params: &str, overrides: &ShaderOverrides) -> Result<Scene, CliError> {
    let params: serde_json::Value = serde_json::from_str(params)
        .map_err(|e| CliError::Input(format!("invalid --params JSON: {e}")))?;
    let mut scene = SceneKind::from_name(name)?.from_json(&params)?;
    overrides.apply(&mut scene.shaders)?;
    Ok(scene)
}

/// Compiles and links the scene's shaders, returning attribute slots by name.
fn check_sources(scene: &Scene) -> Result<Vec<(String, Option<u32>)>, CliError> {
    let mut gpu = SoftwareGpu::new(1, 1);
    let program = compile_program(&mut gpu, &scene.shaders).map_err(RenderError::from)?;
    let slots = scene
        .geometry
        .attributes()
        .iter()
        .map(|a| (a.name().to_string(), gpu.attribute_location(program, a.name())))
        .collect();
    gpu.delete_program(program);
    Ok(slots)
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::List => {
            let scenes: Vec<_> = SceneKind::list_scenes()
                .iter()
                .map(|name| SceneKind::from_name(name).map(SceneKind::info))
                .collect::<Result<_, _>>()?;
            if cli.json {
                let info = serde_json::json!({ "scenes": scenes });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Scenes:");
                for scene in scenes {
                    println!(
                        "  {:<8} {} [{}]",
                        scene.name,
                        scene.description,
                        scene.attributes.join(", ")
                    );
                }
            }
        }
        Command::Check { scene, shaders } => {
            let scene = load_scene(&scene, "{}", &shaders)?;
            let slots = check_sources(&scene)?;
            if cli.json {
                let attributes: serde_json::Map<_, _> = slots
                    .iter()
                    .map(|(name, slot)| (name.clone(), serde_json::json!(slot)))
                    .collect();
                let info = serde_json::json!({
                    "scene": scene.name,
                    "linked": true,
                    "attributes": attributes,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{}: shaders compile and link", scene.name);
                for (name, slot) in &slots {
                    match slot {
                        Some(slot) => println!("  {name} -> slot {slot}"),
                        None => println!("  {name} -> not found"),
                    }
                }
            }
        }
        Command::Render {
            scene,
            width,
            height,
            output,
            params,
            shaders,
        } => {
            let scene = load_scene(&scene, &params, &shaders)?;
            let framebuffer = render_software(&scene, width, height)?;
            hello_triangle_scenes::snapshot::write_png(&framebuffer, &output)?;

            let covered = covered_pixels(&framebuffer);
            if cli.json {
                let info = serde_json::json!({
                    "scene": scene.name,
                    "width": width,
                    "height": height,
                    "covered_pixels": covered,
                    "output": output.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "rendered {} ({width}x{height}, {covered} pixels covered) -> {}",
                    scene.name,
                    output.display()
                );
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        log::debug!("exiting with code {}", e.exit_code());
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
