//! Shader compilation and linking.
//!
//! Provides error types, source formatting for debugging, and functions
//! to compile individual shader stages and link them into programs on any
//! [`Gpu`]. Compile and link status are always checked; a failure is
//! returned with the backend's info log and the failed object is deleted.

use thiserror::Error;

use crate::gpu::{Gpu, ShaderStage};
use crate::scene::ShaderSources;

/// Errors that can occur during shader compilation or program linking.
#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    /// A shader stage failed to compile.
    #[error("shader compile error ({stage}):\n{log}")]
    CompileError {
        /// The shader stage that failed (e.g. "vertex", "fragment").
        stage: String,
        /// Line-numbered source followed by the compiler's info log.
        log: String,
    },
    /// A program failed to link.
    #[error("shader link error:\n{0}")]
    LinkError(String),
}

/// Formats a shader compilation error for human-readable debugging.
///
/// Prepends right-aligned line numbers to each line of `source`, then
/// appends the compiler's error `log`. This makes it easy to correlate
/// error messages (which reference line numbers) with the actual GLSL.
///
/// Both `source` and `log` may be empty; the function handles all
/// combinations gracefully.
pub fn format_shader_error(source: &str, log: &str) -> String {
    let source_lines: Vec<&str> = source.lines().collect();

    let width = source_lines.len().max(1).to_string().len();

    let numbered: String = source_lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}: {line}", i + 1, width = width))
        .collect::<Vec<_>>()
        .join("\n");

    match (numbered.is_empty(), log.is_empty()) {
        (true, true) => String::new(),
        (true, false) => log.to_string(),
        (false, true) => numbered,
        (false, false) => format!("{numbered}\n\n{log}"),
    }
}

/// Compiles a single shader stage.
///
/// # Errors
///
/// Returns `ShaderError::CompileError` if the shader object cannot be
/// created or the source fails to compile.
pub fn compile<G: Gpu>(gpu: &mut G, stage: ShaderStage, source: &str) -> Result<G::Shader, ShaderError> {
    let shader = gpu
        .create_shader(stage)
        .map_err(|log| ShaderError::CompileError {
            stage: stage.name().to_string(),
            log,
        })?;

    gpu.compile_shader(shader, source);

    if gpu.shader_compile_status(shader) {
        log::debug!("compiled {stage} shader");
        Ok(shader)
    } else {
        let info_log = gpu.shader_info_log(shader);
        gpu.delete_shader(shader);
        log::warn!("{stage} shader failed to compile: {info_log}");
        Err(ShaderError::CompileError {
            stage: stage.name().to_string(),
            log: format_shader_error(source, &info_log),
        })
    }
}

/// Links a vertex and fragment shader into a program.
///
/// Attaches both shaders, links, and detaches them afterward (the program
/// retains its own copies).
///
/// # Errors
///
/// Returns `ShaderError::LinkError` if linking fails.
pub fn link<G: Gpu>(
    gpu: &mut G,
    vertex: G::Shader,
    fragment: G::Shader,
) -> Result<G::Program, ShaderError> {
    let program = gpu.create_program().map_err(ShaderError::LinkError)?;

    gpu.attach_shader(program, vertex);
    gpu.attach_shader(program, fragment);
    gpu.link_program(program);

    gpu.detach_shader(program, vertex);
    gpu.detach_shader(program, fragment);

    if gpu.program_link_status(program) {
        log::debug!("linked program {program:?}");
        Ok(program)
    } else {
        let info_log = gpu.program_info_log(program);
        gpu.delete_program(program);
        log::warn!("program failed to link: {info_log}");
        Err(ShaderError::LinkError(info_log))
    }
}

/// Compiles vertex and fragment sources and links them into a program.
///
/// This is a convenience wrapper around [`compile`] and [`link`]. Shader
/// handles are deleted after linking regardless of success or failure.
///
/// # Errors
///
/// Returns `ShaderError::CompileError` if either shader fails to compile,
/// or `ShaderError::LinkError` if linking fails.
pub fn compile_program<G: Gpu>(gpu: &mut G, sources: &ShaderSources) -> Result<G::Program, ShaderError> {
    let vert = compile(gpu, ShaderStage::Vertex, &sources.vertex)?;
    let frag = match compile(gpu, ShaderStage::Fragment, &sources.fragment) {
        Ok(f) => f,
        Err(e) => {
            gpu.delete_shader(vert);
            return Err(e);
        }
    };

    let result = link(gpu, vert, frag);

    gpu.delete_shader(vert);
    gpu.delete_shader(frag);

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::SoftwareGpu;

    // --- format_shader_error tests ---

    #[test]
    fn format_shader_error_prepends_line_numbers() {
        let source = "#version 300 es\nvoid main() {\n}\n";
        let log = "ERROR: 0:2: syntax error";
        let formatted = format_shader_error(source, log);

        assert!(
            formatted.contains("1: #version 300 es"),
            "expected line 1 with content, got:\n{formatted}"
        );
        assert!(
            formatted.contains("2: void main() {"),
            "expected line 2 with content, got:\n{formatted}"
        );
        assert!(
            formatted.contains(log),
            "expected compiler log in output, got:\n{formatted}"
        );
    }

    #[test]
    fn format_shader_error_handles_empty_inputs() {
        assert_eq!(format_shader_error("", "some error"), "some error");
        assert_eq!(format_shader_error("void main() {}", ""), "1: void main() {}");
        assert!(format_shader_error("", "").is_empty());
    }

    #[test]
    fn format_shader_error_right_aligns_line_numbers() {
        let source = (1..=12)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let formatted = format_shader_error(&source, "err");
        let lines: Vec<&str> = formatted.lines().collect();

        assert!(lines[0].starts_with(" 1: "), "got: '{}'", lines[0]);
        assert!(lines[9].starts_with("10: "), "got: '{}'", lines[9]);
    }

    // --- compile / link against the software backend ---

    #[test]
    fn built_in_sources_compile_and_link() {
        let mut gpu = SoftwareGpu::new(4, 4);
        for sources in [ShaderSources::solid(), ShaderSources::colored()] {
            let program = compile_program(&mut gpu, &sources);
            assert!(program.is_ok(), "expected link success, got {program:?}");
        }
    }

    #[test]
    fn syntax_error_surfaces_stage_and_compiler_log() {
        let mut gpu = SoftwareGpu::new(4, 4);
        let source = "#version 300 es\nin vec3 position;\nvoid main() {\n    gl_Position = vec4(position, 1.0)\n}\n";
        let err = compile(&mut gpu, ShaderStage::Vertex, source).unwrap_err();
        match err {
            ShaderError::CompileError { stage, log } => {
                assert_eq!(stage, "vertex");
                assert!(log.contains("4:     gl_Position"), "missing numbered source in:\n{log}");
                assert!(log.contains("ERROR: 0:"), "missing compiler log in:\n{log}");
            }
            other => panic!("expected CompileError, got {other:?}"),
        }
    }

    #[test]
    fn failed_fragment_compile_releases_vertex_shader() {
        let mut gpu = SoftwareGpu::new(4, 4);
        let sources = ShaderSources::new(
            crate::scene::SOLID_VERTEX_SHADER,
            "void main() { frag_color = undefined_thing; }",
        );
        let err = compile_program(&mut gpu, &sources).unwrap_err();
        assert!(matches!(err, ShaderError::CompileError { ref stage, .. } if stage == "fragment"));
        assert_eq!(gpu.live_shader_count(), 0, "vertex shader leaked after failure");
    }

    #[test]
    fn unmatched_varying_fails_to_link() {
        let mut gpu = SoftwareGpu::new(4, 4);
        let sources = ShaderSources::new(
            crate::scene::SOLID_VERTEX_SHADER,
            crate::scene::COLORED_FRAGMENT_SHADER,
        );
        let err = compile_program(&mut gpu, &sources).unwrap_err();
        match err {
            ShaderError::LinkError(log) => {
                assert!(log.contains("v_color"), "expected varying name in:\n{log}");
            }
            other => panic!("expected LinkError, got {other:?}"),
        }
        assert_eq!(gpu.live_program_count(), 0, "failed program was not deleted");
        assert_eq!(gpu.live_shader_count(), 0, "shaders leaked after link failure");
    }

    // --- ShaderError Display tests ---

    #[test]
    fn shader_compile_error_display_includes_stage_and_log() {
        let err = ShaderError::CompileError {
            stage: "fragment".into(),
            log: "undeclared identifier".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("fragment"), "missing stage in: {msg}");
        assert!(msg.contains("undeclared identifier"), "missing log in: {msg}");
    }

    #[test]
    fn shader_error_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ShaderError>();
    }
}
