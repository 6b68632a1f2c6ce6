use anyhow::{anyhow, Context};
use glow::HasContext;

use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, NotCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::DisplayBuilder;

use raw_window_handle::HasRawWindowHandle;

use std::ffi::CString;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};

use feedbackcam_engine::assets::{read_to_string, AssetsRoot};
use feedbackcam_engine::config::{load_config, ConfigMode};
use feedbackcam_engine::{DisplaceBias, ParameterMapper, SharedMapper};

mod frame_clock;
mod hotreload;
mod input;
mod logging;
mod midi_in;
mod render;
mod source;
mod validate;

use frame_clock::{FrameClock, Throttle};
use hotreload::{same_file, ShaderWatch};
use input::{action_for_key, KeyAction};
use render::{try_compile_program, FeedbackRenderer, VERT_SRC};
use source::{FrameSource, TestPattern};

const LOG_FILE_ENV: &str = "FEEDBACKCAM_LOG_FILE";
const WINDOW_TITLE: &str = "feedbackcam";

const USAGE: &str = "usage: feedbackcam [--log-file <path>] [--strict] [--list-ports]

  --log-file <path>  append every log line to <path> (or set FEEDBACKCAM_LOG_FILE)
  --strict           reject unknown config fields and unsupported versions
  --list-ports       print MIDI input ports and exit";

#[derive(Debug, Default, PartialEq)]
struct Args {
    log_file: Option<PathBuf>,
    strict: bool,
    list_ports: bool,
    help: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Args> {
    let mut out = Args::default();
    let mut it = args.into_iter();
    while let Some(a) = it.next() {
        match a.as_str() {
            "--log-file" => {
                let p = it.next().ok_or_else(|| anyhow!("--log-file needs a path"))?;
                out.log_file = Some(PathBuf::from(p));
            }
            "--strict" => out.strict = true,
            "--list-ports" => out.list_ports = true,
            "-h" | "--help" => out.help = true,
            other => return Err(anyhow!("unknown argument '{other}'\n{USAGE}")),
        }
    }
    Ok(out)
}

fn log_file_from_env(args: &Args) -> Option<PathBuf> {
    if args.log_file.is_some() {
        return args.log_file.clone();
    }
    std::env::var(LOG_FILE_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
}

/// First `assets/` found searching upward from each start dir, in order.
fn discover_assets_from(starts: &[&Path]) -> anyhow::Result<AssetsRoot> {
    let mut last_err = None;
    for start in starts {
        match AssetsRoot::discover(start) {
            Ok(root) => return Ok(root),
            Err(e) => last_err = Some(e),
        }
    }
    match last_err {
        Some(e) => Err(e.into()),
        None => Err(anyhow!("no directories to search for assets")),
    }
}

// The manifest dir wins; the working directory covers a binary copied elsewhere.
fn discover_assets() -> anyhow::Result<AssetsRoot> {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    match std::env::current_dir() {
        Ok(cwd) => discover_assets_from(&[manifest, cwd.as_path()]),
        Err(_) => discover_assets_from(&[manifest]),
    }
}

fn main() {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{USAGE}");
        return;
    }

    let run_id = logging::init(log_file_from_env(&args));
    logi!("INIT", "run_id={run_id}");

    if let Err(e) = run(args) {
        loge!("INIT", "{e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if args.list_ports {
        let ports = midi_in::list_ports()?;
        if ports.is_empty() {
            println!("no MIDI input ports");
        }
        for (i, name) in ports.iter().enumerate() {
            println!("{i}: {name}");
        }
        return Ok(());
    }

    let assets = discover_assets()?;
    logi!("INIT", "assets base: {}", assets.path().display());

    let mode = if args.strict { ConfigMode::Strict } else { ConfigMode::Lenient };
    let loaded = load_config(&assets, mode)?;
    if loaded.from_file {
        logi!("CONFIG", "loaded {} ({mode:?})", loaded.path.display());
    } else {
        logi!("CONFIG", "{} not found, using defaults", loaded.path.display());
    }
    validate::emit_issues("CONFIG", &loaded.issues);
    validate::emit_summary("CONFIG", "config.json", &loaded.issues);

    let cfg = loaded.config;
    let rcfg = cfg.render.clone();

    let frag_path = assets.resolve(&rcfg.frag);
    let present_frag_path = assets.resolve(&rcfg.present_frag);
    logi!("INIT", "feedback shader: {}", frag_path.display());
    logi!("INIT", "present shader: {}", present_frag_path.display());

    let frag_src = read_to_string(&frag_path)?;
    let present_frag_src = read_to_string(&present_frag_path)?;

    let mapper = SharedMapper::new(ParameterMapper::from_config(&cfg.midi));
    logi!(
        "MIDI",
        "queue capacity={} unipolar cc={} bipolar cc={}",
        cfg.midi.capacity(),
        cfg.midi.unipolar_cc,
        cfg.midi.bipolar_cc
    );

    // A missing controller is not fatal; the keyboard still drives the bias.
    let mut midi = match midi_in::connect(&cfg.midi, mapper.clone()) {
        Ok(Some(m)) => {
            logi!("MIDI", "listening on '{}'", m.port_name());
            Some(m)
        }
        Ok(None) => None,
        Err(e) => {
            logw!("MIDI", "{e:#}; continuing without MIDI");
            None
        }
    };

    let mut watch_dirs: Vec<&Path> = Vec::new();
    for p in [&frag_path, &present_frag_path] {
        if let Some(dir) = p.parent() {
            if !watch_dirs.contains(&dir) {
                watch_dirs.push(dir);
            }
        }
    }
    let shader_watch = match ShaderWatch::new(&watch_dirs) {
        Ok(w) => {
            for d in &watch_dirs {
                logi!("WATCH", "watching {}", d.display());
            }
            Some(w)
        }
        Err(e) => {
            logw!("WATCH", "shader hot-reload disabled: {e}");
            None
        }
    };

    let mut bias = DisplaceBias::from_config(&cfg.keys);
    let mut source = TestPattern::new(rcfg.width, rcfg.height);
    let (src_w, src_h) = source.size();

    let event_loop = EventLoop::new().context("EventLoop::new failed")?;
    let window_builder = winit::window::WindowBuilder::new()
        .with_title(WINDOW_TITLE)
        .with_inner_size(PhysicalSize::new(rcfg.window_width, rcfg.window_height));

    let template = ConfigTemplateBuilder::new().with_alpha_size(8).with_depth_size(0);
    let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));

    let (window, gl_config) = display_builder
        .build(&event_loop, template, |configs| {
            configs
                .reduce(|a, b| if a.num_samples() > b.num_samples() { a } else { b })
                .expect("display offered no GL configs")
        })
        .map_err(|e| anyhow!("failed to build display: {e}"))?;

    let window = window.ok_or_else(|| anyhow!("no window created"))?;
    if rcfg.hide_cursor {
        window.set_cursor_visible(false);
    }

    let raw_window_handle = window.raw_window_handle();
    let gl_display = gl_config.display();

    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .build(Some(raw_window_handle));

    let not_current_gl_context: NotCurrentContext = unsafe {
        gl_display
            .create_context(&gl_config, &context_attributes)
            .context("create_context failed")?
    };

    let size = window.inner_size();
    let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_window_handle,
        NonZeroU32::new(size.width).unwrap_or(NonZeroU32::MIN),
        NonZeroU32::new(size.height).unwrap_or(NonZeroU32::MIN),
    );

    let gl_surface = unsafe {
        gl_display
            .create_window_surface(&gl_config, &attrs)
            .context("create_window_surface failed")?
    };

    let gl_context = not_current_gl_context
        .make_current(&gl_surface)
        .context("make_current failed")?;

    let interval = if rcfg.vsync { SwapInterval::Wait(NonZeroU32::MIN) } else { SwapInterval::DontWait };
    if let Err(e) = gl_surface.set_swap_interval(&gl_context, interval) {
        logw!("RENDER", "set_swap_interval failed: {e}");
    }

    let gl = unsafe {
        glow::Context::from_loader_function(|s| match CString::new(s) {
            Ok(name) => gl_display.get_proc_address(&name) as *const _,
            Err(_) => std::ptr::null(),
        })
    };

    let mut clock = FrameClock::new(rcfg.fps);
    let mut title_update = Throttle::new(Duration::from_secs(1));
    let mut renderer = Some(unsafe {
        FeedbackRenderer::new(&gl, src_w as i32, src_h as i32, &frag_src, &present_frag_src)?
    });
    logi!(
        "RENDER",
        "feedback {}x{} → window {}x{} @ {} fps (vsync={})",
        src_w,
        src_h,
        size.width,
        size.height,
        clock.fps(),
        rcfg.vsync
    );

    let start = Instant::now();

    event_loop
        .run(move |event, target| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => target.exit(),

                WindowEvent::KeyboardInput { event, .. } => {
                    if !event.state.is_pressed() {
                        return;
                    }
                    match action_for_key(&event.logical_key) {
                        Some(KeyAction::Nudge(n)) => {
                            bias.nudge(n);
                            if !event.repeat {
                                logi!("INPUT", "{n:?} → bias x={:.4} y={:.4}", bias.x_bias, bias.y_bias);
                            }
                        }
                        Some(KeyAction::Quit) => target.exit(),
                        None => {}
                    }
                }

                WindowEvent::Resized(new_size) => {
                    gl_surface.resize(
                        &gl_context,
                        NonZeroU32::new(new_size.width).unwrap_or(NonZeroU32::MIN),
                        NonZeroU32::new(new_size.height).unwrap_or(NonZeroU32::MIN),
                    );
                }

                WindowEvent::RedrawRequested => {
                    let Some(r) = renderer.as_mut() else { return };

                    if let Some(w) = &shader_watch {
                        for changed in w.drain() {
                            if same_file(&changed, &frag_path) {
                                reload_program(&gl, &frag_path, |prog| unsafe { r.replace_feedback(&gl, prog) });
                            } else if same_file(&changed, &present_frag_path) {
                                reload_program(&gl, &present_frag_path, |prog| unsafe { r.replace_present(&gl, prog) });
                            }
                        }
                    }

                    let t = start.elapsed().as_secs_f32();
                    if let Some(frame) = source.next_frame(t) {
                        if !unsafe { r.upload_source(&gl, frame) } {
                            logw!("RENDER", "dropped source frame of {} bytes", frame.len());
                        }
                    }

                    let params = mapper.drain_and_apply();
                    let disp = bias.displacement(&params);

                    let size = window.inner_size();
                    unsafe {
                        r.draw_feedback(&gl, disp, t);
                        r.present(&gl, size.width as i32, size.height as i32);
                        r.copy_back(&gl);
                    }

                    if let Err(e) = gl_surface.swap_buffers(&gl_context) {
                        loge!("RENDER", "swap_buffers failed: {e}");
                        target.exit();
                    }

                    if rcfg.show_fps && title_update.ready(Instant::now()) {
                        window.set_title(&format!("{WINDOW_TITLE} fps={:.1}", clock.average_fps()));
                    }
                }

                _ => {}
            },

            Event::AboutToWait => {
                if clock.tick(Instant::now()) {
                    window.request_redraw();
                }
                target.set_control_flow(ControlFlow::WaitUntil(clock.next_deadline()));
            }

            Event::LoopExiting => {
                if let Some(m) = midi.take() {
                    m.close();
                }
                if let Some(r) = renderer.take() {
                    unsafe { r.destroy(&gl) };
                }
                let s = mapper.state();
                logi!(
                    "INIT",
                    "exit: unipolar={:.4} bipolar={:.4} bias x={:.4} y={:.4} frames={}",
                    s.unipolar,
                    s.bipolar,
                    bias.x_bias,
                    bias.y_bias,
                    clock.frame_count()
                );
                let evicted = mapper.evicted();
                if evicted > 0 {
                    logi!("MIDI", "{evicted} events dropped by the queue bound");
                }
            }

            _ => {}
        })
        .context("event loop failed")?;

    Ok(())
}

/// Recompile one shader from disk. On failure the current program stays bound.
fn reload_program(gl: &glow::Context, path: &Path, install: impl FnOnce(glow::NativeProgram)) {
    let src = match read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            logw!("WATCH", "{e}");
            return;
        }
    };
    match unsafe { try_compile_program(gl, VERT_SRC, &src) } {
        Ok(prog) => {
            install(prog);
            logi!("WATCH", "reloaded {}", path.display());
        }
        Err(e) => loge!("WATCH", "{} failed to compile, keeping previous program:\n{e}", path.display()),
    }
}
