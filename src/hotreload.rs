//! Shader hot-reload watcher
//!
//! We watch the shader **directory** (not individual files) because editors often save
//! with write temp → rename → delete old. The watcher only sends paths to the render
//! thread; recompiling stays on the thread that owns the GL context.

use crossbeam_channel::{unbounded, Receiver};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct ShaderWatch {
    _watcher: RecommendedWatcher,
    rx: Receiver<PathBuf>,
}

impl ShaderWatch {
    pub fn new(dirs: &[&Path]) -> anyhow::Result<Self> {
        let (tx, rx) = unbounded::<PathBuf>();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                let Ok(ev) = res else { return };
                if !matches!(ev.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                for p in ev.paths {
                    if is_shader(&p) {
                        let _ = tx.send(p);
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_millis(250)),
        )?;

        for dir in dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }

        Ok(Self { _watcher: watcher, rx })
    }

    /// All shader paths changed since the last call, deduplicated.
    pub fn drain(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = Vec::new();
        while let Ok(p) = self.rx.try_recv() {
            if !out.contains(&p) {
                out.push(p);
            }
        }
        out
    }
}

pub fn is_shader(p: &Path) -> bool {
    matches!(p.extension().and_then(|s| s.to_str()), Some("frag") | Some("vert"))
}

/// Compare a watcher path against a configured shader path, tolerating symlinks and
/// relative components.
pub fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(x), Ok(y)) => x == y,
        // deleted mid-save; fall back to the file name
        _ => a.file_name().is_some() && a.file_name() == b.file_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_shader_sources_count() {
        assert!(is_shader(Path::new("assets/shaders/feedback.frag")));
        assert!(is_shader(Path::new("x.vert")));
        assert!(!is_shader(Path::new("assets/config.json")));
        assert!(!is_shader(Path::new("feedback.frag~")));
    }

    #[test]
    fn same_file_resolves_relative_paths() {
        let dir = std::env::temp_dir().join(format!("feedbackcam-watch-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("shaders")).unwrap();
        let f = dir.join("shaders").join("a.frag");
        std::fs::write(&f, "void main() {}").unwrap();

        let dotted = dir.join("shaders").join(".").join("a.frag");
        assert!(same_file(&f, &dotted));
        assert!(!same_file(&f, &dir.join("shaders").join("b.frag")));
    }
}
