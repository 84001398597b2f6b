//! CLI subcommand handlers.

use anyhow::Context;
use std::fmt::Write as _;
use std::path::Path;

use modelspec_core::config::{user_config_path, workspace_config_path};
use modelspec_core::{
    DescriptorStore, ModelDescriptor, NodeSpecification, OutputFormat, SpecConfig, Transformation,
};

use crate::Commands;
use crate::ConfigAction;

/// Handle a CLI subcommand.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    config: &SpecConfig,
) -> anyhow::Result<()> {
    let store = DescriptorStore::new(config.clone());
    match command {
        Commands::Inspect { path } => {
            let descriptor = store
                .read_path(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            print!("{}", inspect_report(&store, &descriptor));
            Ok(())
        }
        Commands::Validate { path } => {
            let report = validate(&store, &path)?;
            println!("{}", report);
            Ok(())
        }
        Commands::Convert {
            path,
            to,
            out,
            format,
        } => {
            let target = to.unwrap_or_else(|| config.default_format_version.clone());
            let format = resolve_format(format.as_deref(), out.as_deref(), config)?;
            let text = convert(&store, &path, &target, format)?;
            match out {
                Some(out) => {
                    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&out, text)
                        .with_context(|| format!("Failed to write {}", out.display()))?;
                    tracing::info!(
                        path = %out.display(),
                        version = %target,
                        "converted descriptor"
                    );
                }
                None => print!("{}", text),
            }
            Ok(())
        }
        Commands::Versions => {
            print!("{}", versions_report(&store));
            Ok(())
        }
        Commands::Config { action } => handle_config(action, workspace, config),
    }
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config: &SpecConfig,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let toml_str = toml::to_string_pretty(&SpecConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
            Ok(())
        }
        ConfigAction::Path => {
            match user_config_path() {
                Some(path) => println!("user:      {}", path.display()),
                None => println!("user:      <no home directory>"),
            }
            println!("workspace: {}", workspace_config_path(workspace).display());
            Ok(())
        }
    }
}

fn resolve_format(
    requested: Option<&str>,
    out: Option<&Path>,
    config: &SpecConfig,
) -> anyhow::Result<OutputFormat> {
    if let Some(requested) = requested {
        return requested
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e));
    }
    Ok(out
        .and_then(OutputFormat::from_path)
        .unwrap_or(config.output_format))
}

/// Read `path`, retarget it to `target` and render it.
fn convert(
    store: &DescriptorStore,
    path: &Path,
    target: &str,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let mut descriptor = store
        .read_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let from = descriptor.format_version().to_string();
    let doc = store
        .registry()
        .encode_as(&mut descriptor, target)
        .with_context(|| format!("Failed to encode as format_version {}", target))?;
    tracing::debug!(from = %from, to = target, "retargeted descriptor");
    let text = match format {
        OutputFormat::Yaml => modelspec_core::document::to_yaml_string(&doc)?,
        OutputFormat::Json => {
            let mut json = modelspec_core::document::to_json_string(&doc)?;
            json.push('\n');
            json
        }
    };
    Ok(text)
}

/// Decode, re-encode and decode again; the descriptor must survive unchanged.
fn validate(store: &DescriptorStore, path: &Path) -> anyhow::Result<String> {
    let descriptor = store
        .read_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = store
        .registry()
        .encode_for(&descriptor)
        .context("Failed to re-encode descriptor")?;
    let again = store
        .registry()
        .decode_any(&doc)
        .context("Failed to decode re-encoded descriptor")?;
    if again != descriptor {
        anyhow::bail!(
            "{}: descriptor changes when written back as format_version {}",
            path.display(),
            descriptor.format_version()
        );
    }
    Ok(format!(
        "{}: ok (format_version {})",
        path.display(),
        descriptor.format_version()
    ))
}

fn versions_report(store: &DescriptorStore) -> String {
    let mut out = String::new();
    for info in store.registry().generations() {
        let _ = writeln!(
            out,
            "generation {}  format_version {}",
            info.generation, info.canonical_version
        );
    }
    out
}

fn steps_summary(steps: Option<&[Transformation]>) -> String {
    match steps {
        None | Some([]) => "-".to_string(),
        Some(steps) => steps
            .iter()
            .map(|s| match s.mode() {
                Some(mode) => format!("{}({})", s.kind(), mode),
                None => s.kind().to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn shape_of(values: Option<&[i64]>) -> String {
    values
        .map(|v| format!("{:?}", v))
        .unwrap_or_else(|| "-".to_string())
}

fn inspect_report(store: &DescriptorStore, d: &ModelDescriptor) -> String {
    let generation = store
        .registry()
        .codec_for_version(d.format_version())
        .map(|c| c.generation().to_string())
        .unwrap_or_else(|| "?".to_string());

    let mut out = String::new();
    let _ = writeln!(out, "name:           {}", d.name().unwrap_or("-"));
    let _ = writeln!(
        out,
        "format_version: {} (generation {})",
        d.format_version(),
        generation
    );
    if let Some(description) = d.description() {
        let _ = writeln!(out, "description:    {}", description);
    }
    if let Some(authors) = d.authors() {
        let names: Vec<&str> = authors.iter().map(|a| a.name.as_str()).collect();
        let _ = writeln!(out, "authors:        {}", names.join(", "));
    }
    if let Some(tags) = d.tags().filter(|t| !t.is_empty()) {
        let _ = writeln!(out, "tags:           {}", tags.join(", "));
    }
    if let Some(license) = d.license() {
        let _ = writeln!(out, "license:        {}", license);
    }

    for input in d.inputs().unwrap_or_default() {
        let _ = writeln!(
            out,
            "input  {}  axes={} min={} step={} pre={}",
            input.name(),
            input.axes().unwrap_or("-"),
            shape_of(input.shape_min()),
            shape_of(input.shape_step()),
            steps_summary(input.preprocessing()),
        );
    }
    for output in d.outputs().unwrap_or_default() {
        let _ = writeln!(
            out,
            "output {}  axes={} ref={} post={}",
            output.name(),
            output.axes().unwrap_or("-"),
            output.shape_reference_input().unwrap_or("-"),
            steps_summary(output.postprocessing()),
        );
    }
    if let Some(weights) = d.weights() {
        for (format, entry) in weights {
            let _ = writeln!(
                out,
                "weights {}  source={}",
                format,
                entry.source.as_deref().unwrap_or("-")
            );
        }
    }
    out
}
