use std::fs;

use anyhow::{anyhow, Context, Result};
use dotmatrix::CenterAxes;
use preset::{Axis, PresetColor, PresetFile};
use renderer::{RendererConfig, SessionRequest};
use tracing::debug;

use crate::cli::EffectArgs;

pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (1280, 720);
pub const DEFAULT_STILL_SIZE: (u32, u32) = (640, 360);
/// Frame-rate ceiling used when neither the command line nor the preset sets
/// one.
pub const DEFAULT_FPS: f32 = 60.0;

/// Loads the base preset named by `args` and folds the command-line
/// overrides into it. The merged preset is validated again.
pub fn resolve_preset(args: &EffectArgs) -> Result<PresetFile> {
    let mut preset = load_base(args)?;
    apply_overrides(&mut preset, args);
    preset
        .validate()
        .context("preset is invalid after applying command-line overrides")?;
    Ok(preset)
}

fn load_base(args: &EffectArgs) -> Result<PresetFile> {
    if let Some(path) = args.preset.as_ref() {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read preset {}", path.display()))?;
        let preset = PresetFile::from_toml_str(&contents)
            .with_context(|| format!("failed to load preset {}", path.display()))?;
        debug!(path = %path.display(), "loaded preset file");
        return Ok(preset);
    }

    let name = args.builtin.as_deref().unwrap_or("default");
    preset::builtin(name).ok_or_else(|| anyhow!("unknown built-in preset '{name}'"))
}

fn apply_overrides(preset: &mut PresetFile, args: &EffectArgs) {
    let effect = &mut preset.effect;
    if !args.colors.is_empty() {
        effect.colors = args.colors.iter().copied().map(PresetColor).collect();
    }
    if let Some(cell_size) = args.cell_size {
        effect.cell_size = cell_size;
    }
    if let Some(dot_size) = args.dot_size {
        effect.dot_size = dot_size;
    }
    if let Some(speed) = args.animation_speed {
        effect.animation_speed = speed;
    }
    if args.reverse {
        effect.reverse = true;
    }
    if args.no_gradient {
        effect.show_gradient = false;
    }
    if let Some(center) = args.center {
        effect.center = center_axes(center);
    }
    if args.vignette {
        preset.overlay.vignette = true;
    }
    if args.top_fade {
        preset.overlay.top_fade = true;
    }
    if args.size.is_some() {
        preset.window.size = args.size;
    }
}

fn center_axes(center: CenterAxes) -> Vec<Axis> {
    [(center.x, Axis::X), (center.y, Axis::Y)]
        .into_iter()
        .filter_map(|(enabled, axis)| enabled.then_some(axis))
        .collect()
}

pub fn session_request(preset: &PresetFile) -> SessionRequest {
    SessionRequest::new(preset.render_config()).with_overlay(preset.overlay())
}

pub fn renderer_config(preset: &PresetFile, fps: Option<f32>) -> RendererConfig {
    RendererConfig {
        surface_size: preset.window.size.unwrap_or(DEFAULT_WINDOW_SIZE),
        target_fps: Some(fps.or(preset.window.fps).unwrap_or(DEFAULT_FPS))
            .filter(|fps| *fps > 0.0),
        session: session_request(preset),
        ..RendererConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotmatrix::ColorRgb;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn defaults_to_builtin_default() {
        let preset = resolve_preset(&EffectArgs::default()).unwrap();
        assert_eq!(preset, PresetFile::default());
    }

    #[test]
    fn overrides_replace_preset_values() {
        let args = EffectArgs {
            builtin: Some("swap-backdrop".into()),
            colors: vec![ColorRgb::new(255, 0, 0)],
            dot_size: Some(4.0),
            reverse: true,
            no_gradient: true,
            center: Some(CenterAxes { x: false, y: true }),
            size: Some((800, 600)),
            ..EffectArgs::default()
        };
        let preset = resolve_preset(&args).unwrap();
        assert_eq!(preset.effect.colors, vec![PresetColor(ColorRgb::new(255, 0, 0))]);
        assert_eq!(preset.effect.dot_size, 4.0);
        assert_eq!(preset.effect.animation_speed, 3.0);
        assert!(preset.effect.reverse);
        assert!(!preset.effect.show_gradient);
        assert_eq!(preset.effect.center, vec![Axis::Y]);
        assert!(preset.overlay.vignette);
        assert_eq!(preset.window.size, Some((800, 600)));
    }

    #[test]
    fn rejects_overrides_that_break_the_preset() {
        let args = EffectArgs {
            colors: vec![ColorRgb::WHITE; 4],
            ..EffectArgs::default()
        };
        assert!(resolve_preset(&args).is_err());

        let args = EffectArgs {
            cell_size: Some(0.0),
            ..EffectArgs::default()
        };
        assert!(resolve_preset(&args).is_err());
    }

    #[test]
    fn loads_preset_file_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calm.toml");
        fs::write(
            &path,
            "version = 1\n[effect]\ncolors = [\"#112233\"]\ncell_size = 24.0\n[window]\nfps = 30.0\n",
        )
        .unwrap();

        let args = EffectArgs {
            preset: Some(path),
            ..EffectArgs::default()
        };
        let preset = resolve_preset(&args).unwrap();
        assert_eq!(preset.effect.cell_size, 24.0);

        let config = renderer_config(&preset, None);
        assert_eq!(config.target_fps, Some(30.0));
        assert_eq!(config.surface_size, DEFAULT_WINDOW_SIZE);
        assert_eq!(config.session.config.colors, vec![ColorRgb::new(0x11, 0x22, 0x33)]);
    }

    #[test]
    fn missing_preset_file_is_an_error() {
        let args = EffectArgs {
            preset: Some(PathBuf::from("/nonexistent/revealfx/preset.toml")),
            ..EffectArgs::default()
        };
        assert!(resolve_preset(&args).is_err());
    }

    #[test]
    fn zero_fps_means_uncapped() {
        let preset = PresetFile::default();
        assert_eq!(renderer_config(&preset, Some(0.0)).target_fps, None);
        assert_eq!(renderer_config(&preset, Some(24.0)).target_fps, Some(24.0));
    }

    #[test]
    fn frame_rate_defaults_to_sixty() {
        let preset = PresetFile::default();
        assert_eq!(renderer_config(&preset, None).target_fps, Some(DEFAULT_FPS));

        let mut uncapped = PresetFile::default();
        uncapped.window.fps = Some(0.0);
        assert_eq!(renderer_config(&uncapped, None).target_fps, None);
        assert_eq!(renderer_config(&uncapped, Some(30.0)).target_fps, Some(30.0));
    }

    #[test]
    fn session_request_carries_overlay() {
        let preset = preset::builtin("swap-backdrop").unwrap();
        let request = session_request(&preset);
        assert!(request.overlay.vignette);
        assert!(request.overlay.top_fade);
        assert!(request.overlay.bottom_fade);
    }
}
