//! Ping-pong feedback renderer
//!
//! Two offscreen targets at the source resolution:
//! - `current` is drawn each frame by the feedback shader from the source texture (`tex0`)
//!   and the previous frame (`fb0`).
//! - `previous` receives a copy of `current` after it is presented.
//!
//! The preview window only presents `current`, stretched to the window size.

use anyhow::anyhow;
use feedbackcam_engine::Displacement;
use glow::HasContext;

// Fullscreen triangle vertex shader
pub const VERT_SRC: &str = r#"#version 330 core
out vec2 v_uv;
void main() {
    vec2 pos;
    if (gl_VertexID == 0) pos = vec2(-1.0, -1.0);
    else if (gl_VertexID == 1) pos = vec2( 3.0, -1.0);
    else pos = vec2(-1.0,  3.0);
    v_uv = pos * 0.5 + 0.5;
    gl_Position = vec4(pos, 0.0, 1.0);
}"#;

#[derive(Debug)]
pub struct RenderTarget {
    pub fbo: glow::NativeFramebuffer,
    pub tex: glow::NativeTexture,
    pub w: i32,
    pub h: i32,
}

unsafe fn create_texture(gl: &glow::Context, w: i32, h: i32) -> anyhow::Result<glow::NativeTexture> {
    let tex = gl.create_texture().map_err(|e| anyhow!("create_texture: {e}"))?;
    gl.bind_texture(glow::TEXTURE_2D, Some(tex));
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
    gl.tex_image_2d(
        glow::TEXTURE_2D,
        0,
        glow::RGBA as i32,
        w,
        h,
        0,
        glow::RGBA,
        glow::UNSIGNED_BYTE,
        glow::PixelUnpackData::Slice(None),
    );
    gl.bind_texture(glow::TEXTURE_2D, None);
    Ok(tex)
}

/// Allocate a color-only FBO and clear it to opaque black.
pub unsafe fn create_render_target(gl: &glow::Context, w: i32, h: i32) -> anyhow::Result<RenderTarget> {
    let tex = create_texture(gl, w, h)?;

    let fbo = gl.create_framebuffer().map_err(|e| anyhow!("create_framebuffer: {e}"))?;
    gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
    gl.framebuffer_texture_2d(
        glow::FRAMEBUFFER,
        glow::COLOR_ATTACHMENT0,
        glow::TEXTURE_2D,
        Some(tex),
        0,
    );

    let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
    if status != glow::FRAMEBUFFER_COMPLETE {
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        gl.delete_framebuffer(fbo);
        gl.delete_texture(tex);
        return Err(anyhow!("FBO incomplete: 0x{:x}", status));
    }

    // Freshly allocated texture memory holds whatever the driver left there.
    gl.viewport(0, 0, w, h);
    gl.clear_color(0.0, 0.0, 0.0, 1.0);
    gl.clear(glow::COLOR_BUFFER_BIT);
    gl.bind_framebuffer(glow::FRAMEBUFFER, None);

    Ok(RenderTarget { fbo, tex, w, h })
}

unsafe fn delete_render_target(gl: &glow::Context, rt: &RenderTarget) {
    gl.delete_framebuffer(rt.fbo);
    gl.delete_texture(rt.tex);
}

pub unsafe fn try_compile_program(gl: &glow::Context, vert_src: &str, frag_src: &str) -> anyhow::Result<glow::NativeProgram> {
    let vs = gl.create_shader(glow::VERTEX_SHADER).map_err(|e| anyhow!("create vertex shader: {e}"))?;
    gl.shader_source(vs, vert_src);
    gl.compile_shader(vs);
    if !gl.get_shader_compile_status(vs) {
        let log = gl.get_shader_info_log(vs);
        gl.delete_shader(vs);
        return Err(anyhow!("Vertex shader compile error:\n{log}"));
    }

    let fs = gl.create_shader(glow::FRAGMENT_SHADER).map_err(|e| anyhow!("create fragment shader: {e}"))?;
    gl.shader_source(fs, frag_src);
    gl.compile_shader(fs);
    if !gl.get_shader_compile_status(fs) {
        let log = gl.get_shader_info_log(fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
        return Err(anyhow!("Fragment shader compile error:\n{log}"));
    }

    let program = gl.create_program().map_err(|e| anyhow!("create program: {e}"))?;
    gl.attach_shader(program, vs);
    gl.attach_shader(program, fs);
    gl.link_program(program);

    let linked = gl.get_program_link_status(program);
    let link_log = if linked { String::new() } else { gl.get_program_info_log(program) };

    gl.detach_shader(program, vs);
    gl.detach_shader(program, fs);
    gl.delete_shader(vs);
    gl.delete_shader(fs);

    if !linked {
        gl.delete_program(program);
        return Err(anyhow!("Program link error:\n{link_log}"));
    }

    Ok(program)
}

// Uniforms the shader optimized away have no location; skip them silently.
unsafe fn set_f32(gl: &glow::Context, prog: glow::NativeProgram, name: &str, v: f32) {
    if let Some(loc) = gl.get_uniform_location(prog, name) {
        gl.uniform_1_f32(Some(&loc), v);
    }
}

unsafe fn set_i32(gl: &glow::Context, prog: glow::NativeProgram, name: &str, v: i32) {
    if let Some(loc) = gl.get_uniform_location(prog, name) {
        gl.uniform_1_i32(Some(&loc), v);
    }
}

unsafe fn set_vec2(gl: &glow::Context, prog: glow::NativeProgram, name: &str, x: f32, y: f32) {
    if let Some(loc) = gl.get_uniform_location(prog, name) {
        gl.uniform_2_f32(Some(&loc), x, y);
    }
}

pub struct FeedbackRenderer {
    feedback: glow::NativeProgram,
    present: glow::NativeProgram,
    vao: glow::NativeVertexArray,
    source_tex: glow::NativeTexture,
    current: RenderTarget,
    previous: RenderTarget,
}

impl FeedbackRenderer {
    /// Build programs and buffers for a `w`×`h` feedback loop.
    pub unsafe fn new(gl: &glow::Context, w: i32, h: i32, feedback_src: &str, present_src: &str) -> anyhow::Result<Self> {
        let feedback = try_compile_program(gl, VERT_SRC, feedback_src)?;
        let present = try_compile_program(gl, VERT_SRC, present_src)?;
        let vao = gl.create_vertex_array().map_err(|e| anyhow!("create_vertex_array: {e}"))?;
        let source_tex = create_texture(gl, w, h)?;
        let current = create_render_target(gl, w, h)?;
        let previous = create_render_target(gl, w, h)?;

        Ok(Self {
            feedback,
            present,
            vao,
            source_tex,
            current,
            previous,
        })
    }

    pub fn size(&self) -> (i32, i32) {
        (self.current.w, self.current.h)
    }

    /// Upload one tightly packed RGBA8 frame. Frames of the wrong size are dropped.
    pub unsafe fn upload_source(&self, gl: &glow::Context, rgba: &[u8]) -> bool {
        let (w, h) = self.size();
        if rgba.len() != (w as usize) * (h as usize) * 4 {
            return false;
        }
        gl.bind_texture(glow::TEXTURE_2D, Some(self.source_tex));
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        gl.tex_sub_image_2d(
            glow::TEXTURE_2D,
            0,
            0,
            0,
            w,
            h,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            glow::PixelUnpackData::Slice(Some(rgba)),
        );
        gl.bind_texture(glow::TEXTURE_2D, None);
        true
    }

    /// Feedback pass: source + previous frame → `current`.
    pub unsafe fn draw_feedback(&self, gl: &glow::Context, disp: Displacement, t: f32) {
        let (w, h) = self.size();
        let prog = self.feedback;

        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.current.fbo));
        gl.viewport(0, 0, w, h);
        gl.clear_color(0.0, 0.0, 0.0, 1.0);
        gl.clear(glow::COLOR_BUFFER_BIT);

        gl.use_program(Some(prog));
        gl.bind_vertex_array(Some(self.vao));

        gl.active_texture(glow::TEXTURE0);
        gl.bind_texture(glow::TEXTURE_2D, Some(self.source_tex));
        set_i32(gl, prog, "tex0", 0);

        gl.active_texture(glow::TEXTURE1);
        gl.bind_texture(glow::TEXTURE_2D, Some(self.previous.tex));
        set_i32(gl, prog, "fb0", 1);

        set_f32(gl, prog, "fb0_xdisplace", disp.x);
        set_f32(gl, prog, "fb0_ydisplace", disp.y);
        set_vec2(gl, prog, "u_resolution", w as f32, h as f32);
        set_f32(gl, prog, "u_time", t);

        gl.draw_arrays(glow::TRIANGLES, 0, 3);

        gl.bind_texture(glow::TEXTURE_2D, None);
        gl.active_texture(glow::TEXTURE0);
        gl.bind_texture(glow::TEXTURE_2D, None);
        gl.bind_vertex_array(None);
        gl.use_program(None);
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
    }

    /// Draw `current` into the default framebuffer, stretched to the window.
    pub unsafe fn present(&self, gl: &glow::Context, win_w: i32, win_h: i32) {
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        gl.viewport(0, 0, win_w, win_h);
        gl.clear_color(0.0, 0.0, 0.0, 1.0);
        gl.clear(glow::COLOR_BUFFER_BIT);

        gl.use_program(Some(self.present));
        gl.bind_vertex_array(Some(self.vao));
        gl.active_texture(glow::TEXTURE0);
        gl.bind_texture(glow::TEXTURE_2D, Some(self.current.tex));
        set_i32(gl, self.present, "u_tex", 0);
        set_vec2(gl, self.present, "u_resolution", win_w as f32, win_h as f32);

        gl.draw_arrays(glow::TRIANGLES, 0, 3);

        gl.bind_texture(glow::TEXTURE_2D, None);
        gl.bind_vertex_array(None);
        gl.use_program(None);
    }

    /// Ping-pong copy: `current` → `previous`, read by the next feedback pass.
    pub unsafe fn copy_back(&self, gl: &glow::Context) {
        let (w, h) = self.size();
        gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(self.current.fbo));
        gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(self.previous.fbo));
        gl.blit_framebuffer(0, 0, w, h, 0, 0, w, h, glow::COLOR_BUFFER_BIT, glow::NEAREST);
        gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
        gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
    }

    /// Swap in a recompiled feedback program, deleting the old one.
    pub unsafe fn replace_feedback(&mut self, gl: &glow::Context, prog: glow::NativeProgram) {
        gl.delete_program(self.feedback);
        self.feedback = prog;
    }

    pub unsafe fn replace_present(&mut self, gl: &glow::Context, prog: glow::NativeProgram) {
        gl.delete_program(self.present);
        self.present = prog;
    }

    pub unsafe fn destroy(self, gl: &glow::Context) {
        gl.delete_program(self.feedback);
        gl.delete_program(self.present);
        gl.delete_vertex_array(self.vao);
        gl.delete_texture(self.source_tex);
        delete_render_target(gl, &self.current);
        delete_render_target(gl, &self.previous);
    }
}
