#![deny(unsafe_code)]
//! Browser entry points for hello-triangle.
//!
//! `draw` finds a `<canvas>` by CSS selector, creates a WebGL2 context on it,
//! wraps the context with `glow` and runs the draw chain for one scene. The
//! GL objects it creates live as long as the page.

use hello_triangle_core::error::RenderError;
use hello_triangle_core::scene::Scene;
use hello_triangle_scenes::SceneKind;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Selector used by [`start`].
pub const DEFAULT_SELECTOR: &str = "canvas";

/// Scene drawn by [`start`].
pub const DEFAULT_SCENE: &str = "colored";

/// Resolves a scene name coming from JavaScript.
pub fn resolve_scene(name: &str) -> Result<Scene, RenderError> {
    SceneKind::from_name(name).map(SceneKind::scene)
}

#[cfg(target_arch = "wasm32")]
mod canvas {
    use hello_triangle_core::render::{GpuContext, Surface};
    use wasm_bindgen::JsCast;
    use web_sys::{HtmlCanvasElement, WebGl2RenderingContext};

    /// A canvas element located by CSS selector.
    pub struct CanvasSurface {
        pub selector: String,
    }

    impl CanvasSurface {
        fn element(&self) -> Result<HtmlCanvasElement, String> {
            let document = web_sys::window()
                .and_then(|w| w.document())
                .ok_or("no document available")?;
            document
                .query_selector(&self.selector)
                .map_err(|e| format!("invalid selector: {e:?}"))?
                .ok_or("no element matches")?
                .dyn_into::<HtmlCanvasElement>()
                .map_err(|_| "element is not a <canvas>".to_string())
        }
    }

    impl Surface for CanvasSurface {
        type Gpu = GpuContext;

        fn describe(&self) -> String {
            format!("canvas '{}'", self.selector)
        }

        fn create_context(&self) -> Result<GpuContext, String> {
            let webgl2 = self
                .element()?
                .get_context("webgl2")
                .map_err(|e| format!("get_context failed: {e:?}"))?
                .ok_or("WebGL2 is not supported")?
                .dyn_into::<WebGl2RenderingContext>()
                .map_err(|_| "context is not WebGL2".to_string())?;
            GpuContext::new(glow::Context::from_webgl2_context(webgl2))
        }
    }
}

/// Draws the named scene into the canvas matching `selector`.
///
/// Errors surface to JavaScript as exceptions carrying the message.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn draw(selector: &str, scene: &str) -> Result<(), JsValue> {
    let scene = resolve_scene(scene).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let surface = canvas::CanvasSurface {
        selector: selector.to_string(),
    };
    let pipeline = hello_triangle_core::render::render(&surface, &scene)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    log::info!("drew '{}' at stage {:?}", scene.name, pipeline.stage());
    // The program and buffers stay alive with the context.
    drop(pipeline.into_gpu());
    Ok(())
}

/// Draws the default scene into the first canvas on load.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    draw(DEFAULT_SELECTOR, DEFAULT_SCENE)
}
